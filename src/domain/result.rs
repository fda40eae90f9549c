//! Result type alias for Meridian
//!
//! This module provides a convenient Result type alias that uses
//! MeridianError as the error type.

use super::errors::MeridianError;

/// Result type alias for Meridian operations
///
/// Defaults to [`MeridianError`]; layers with a narrower error taxonomy
/// override the second parameter.
///
/// # Examples
///
/// ```
/// use meridian::domain::result::Result;
/// use meridian::domain::errors::MeridianError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(MeridianError::Configuration("Invalid input".to_string()))
/// }
/// ```
pub type Result<T, E = MeridianError> = std::result::Result<T, E>;

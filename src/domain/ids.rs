//! Domain identifier types with validation
//!
//! This module provides newtype wrappers for pipeline identifiers.
//! Each type ensures type safety and validates basic format constraints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Legacy source-system identifier newtype wrapper
///
/// The stable external identifier a record carries in the legacy system.
/// Combined with the configured identifier system URI it forms the
/// conditional-upsert key, so it must never be empty.
///
/// # Examples
///
/// ```
/// use meridian::domain::ids::LegacyId;
/// use std::str::FromStr;
///
/// let id = LegacyId::from_str("PAT-001").unwrap();
/// assert_eq!(id.as_str(), "PAT-001");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LegacyId(String);

impl LegacyId {
    /// Creates a new LegacyId from a string
    ///
    /// Returns `Err` when the identifier is empty or whitespace-only.
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Legacy identifier cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for LegacyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LegacyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for LegacyId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

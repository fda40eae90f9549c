//! Domain models and types for Meridian.
//!
//! This module contains the core domain models, types, and business rules.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`LegacyId`])
//! - **Canonical models** ([`CanonicalPatient`], [`RawRecord`], [`Gender`])
//! - **Error types** ([`MeridianError`], [`FhirError`], [`MappingError`], [`QueryBuildError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Meridian uses the newtype pattern for identifiers so a legacy identifier
//! can never be confused with a server-assigned resource id:
//!
//! ```rust
//! use meridian::domain::LegacyId;
//!
//! # fn example() -> Result<(), String> {
//! let legacy_id = LegacyId::new("PAT-001")?;
//! assert_eq!(legacy_id.as_str(), "PAT-001");
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod ids;
pub mod patient;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{FhirError, MappingError, MeridianError, QueryBuildError};
pub use ids::LegacyId;
pub use patient::{CanonicalPatient, Gender, ProvenanceTag, RawRecord};
pub use result::Result;

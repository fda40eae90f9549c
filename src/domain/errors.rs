//! Domain error types
//!
//! This module defines the error hierarchy for Meridian. All errors are
//! domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Meridian error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum MeridianError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Record mapping errors
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// FHIR server interaction errors
    #[error("FHIR error: {0}")]
    Fhir(#[from] FhirError),

    /// Query descriptor construction errors
    #[error("Query build error: {0}")]
    QueryBuild(#[from] QueryBuildError),

    /// A chunk exhausted its transport retries; the run aborts but all
    /// outcomes received before the failing chunk are preserved
    #[error("Fatal batch error at chunk {chunk_index}: {message}")]
    FatalBatch { chunk_index: usize, message: String },

    /// Malformed or out-of-contract server response
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Tabular source errors (open/parse) - fatal at configuration time
    #[error("Source error: {0}")]
    Source(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Record-level mapping errors
///
/// These never abort a pipeline run; the offending record is skipped,
/// the error is logged, and the run continues.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MappingError {
    /// A required column is absent or empty
    #[error("Required field '{field}' is missing or empty")]
    MissingRequired { field: String },

    /// The birth date is not a valid `YYYY-MM-DD` calendar date
    #[error("Invalid birth date '{value}': expected YYYY-MM-DD")]
    InvalidBirthDate { value: String },

    /// A legacy identifier appears more than once in one input set.
    /// Submitting two conditional upserts for the same identifier in one
    /// bundle is ambiguous server-side, so the later occurrence is rejected
    /// before submission.
    #[error("Duplicate legacy identifier '{id}' within one batch")]
    DuplicateIdentifier { id: String },
}

/// FHIR transport and server errors
///
/// Errors that occur when talking to the FHIR server. These don't expose
/// the underlying HTTP client types.
#[derive(Debug, Error)]
pub enum FhirError {
    /// Failed to reach the FHIR server
    #[error("Failed to connect to FHIR server: {0}")]
    ConnectionFailed(String),

    /// Request timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx) - never retried
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Response body could not be interpreted
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

impl FhirError {
    /// Whether the request that produced this error is safe to retry.
    ///
    /// Every submitted operation is a conditional upsert, so transport-level
    /// failures (connect, timeout, 5xx) can be retried verbatim without
    /// deduplication. 4xx business failures and malformed responses are not
    /// retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FhirError::ConnectionFailed(_) | FhirError::Timeout(_) | FhirError::ServerError { .. }
        )
    }
}

/// Query descriptor construction errors
///
/// These fail fast, before any network call is made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryBuildError {
    /// The base resource type is empty
    #[error("Resource type cannot be empty")]
    EmptyResourceType,

    /// A filter path is empty
    #[error("Filter path cannot be empty")]
    EmptyFilterPath,

    /// A filter value is empty
    #[error("Filter value cannot be empty for path '{path}'")]
    EmptyFilterValue { path: String },

    /// An include declaration has an empty source type or reference path
    #[error("Include declaration cannot have empty parts: '{declaration}'")]
    EmptyIncludePath { declaration: String },

    /// The result-count limit is zero
    #[error("Result limit must be greater than zero")]
    ZeroLimit,
}

// Conversion from std::io::Error
impl From<std::io::Error> for MeridianError {
    fn from(err: std::io::Error) -> Self {
        MeridianError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for MeridianError {
    fn from(err: serde_json::Error) -> Self {
        MeridianError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for MeridianError {
    fn from(err: toml::de::Error) -> Self {
        MeridianError::Configuration(format!("TOML parse error: {err}"))
    }
}

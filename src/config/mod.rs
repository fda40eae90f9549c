//! Configuration management for Meridian.
//!
//! This module provides TOML-based configuration loading, parsing, and
//! validation.
//!
//! # Overview
//!
//! Meridian uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `MERIDIAN_*` environment variable overrides
//! - Default values for optional settings
//! - Comprehensive validation
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use meridian::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("meridian.toml")?;
//!
//! println!("FHIR server: {}", config.fhir.base_url);
//! println!("Chunk size: {}", config.load.chunk_size);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [fhir]
//! base_url = "https://hapi.fhir.org/baseR4"
//! token = "${MERIDIAN_FHIR_TOKEN}"
//!
//! [source]
//! path = "data/legacy_patients.csv"
//!
//! [mapping]
//! identifier_system = "http://example.org/legacy-ids"
//! decorate_names = true
//!
//! [load]
//! chunk_size = 100
//! bundle_type = "transaction"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, Environment, FhirConfig, LoadConfig, LoggingConfig, MappingConfig,
    MeridianConfig, ProvenanceTagConfig, RetryConfig, SourceConfig, VerificationConfig,
};
pub use secret::{SecretString, SecretValue};

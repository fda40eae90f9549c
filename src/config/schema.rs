//! Configuration schema types
//!
//! This module defines the configuration structure that maps to the
//! `meridian.toml` file. Every section validates itself; the pipeline never
//! reads ambient global state, all knobs are threaded through constructors.

use crate::config::SecretString;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

/// Main Meridian configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeridianConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// FHIR server configuration
    pub fhir: FhirConfig,

    /// Tabular source configuration
    pub source: SourceConfig,

    /// Record mapping configuration
    #[serde(default)]
    pub mapping: MappingConfig,

    /// Batch load configuration
    #[serde(default)]
    pub load: LoadConfig,

    /// Post-load verification configuration
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MeridianConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.fhir.validate(&self.environment)?;
        self.source.validate()?;
        self.mapping.validate()?;
        self.load.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Retry configuration for transport-level failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// FHIR server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FhirConfig {
    /// Base URL of the FHIR server, e.g. `https://hapi.fhir.org/baseR4`
    pub base_url: String,

    /// Opaque bearer credential. When absent the pipeline proceeds
    /// unauthenticated; this is a deliberate configuration mode for open
    /// endpoints, not a silent failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<SecretString>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,

    /// TLS certificate verification enabled
    ///
    /// Disabling TLS verification exposes the application to
    /// man-in-the-middle attacks and is rejected in production environments.
    #[serde(default = "default_true")]
    pub tls_verify: bool,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

impl FhirConfig {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("fhir.base_url cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("fhir.base_url must start with http:// or https://".to_string());
        }

        if let Some(token) = &self.token {
            if token.expose_secret().is_empty() {
                return Err("fhir.token cannot be empty when present; omit it for unauthenticated access".to_string());
            }
        }

        if self.timeout_seconds == 0 {
            return Err("fhir.timeout_seconds must be greater than zero".to_string());
        }

        if *environment == Environment::Production && !self.tls_verify {
            return Err(
                "TLS certificate verification cannot be disabled in production environments. \
                 Set 'tls_verify = true' or run with 'environment = \"development\"'."
                    .to_string(),
            );
        }

        Ok(())
    }
}

/// Tabular source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the legacy CSV file
    pub path: String,
}

impl SourceConfig {
    fn validate(&self) -> Result<(), String> {
        if self.path.is_empty() {
            return Err("source.path cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Provenance tag configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceTagConfig {
    /// Code system URI
    #[serde(default = "default_tag_system")]
    pub system: String,
    /// Tag code
    #[serde(default = "default_tag_code")]
    pub code: String,
    /// Display text
    #[serde(default = "default_tag_display")]
    pub display: String,
}

impl Default for ProvenanceTagConfig {
    fn default() -> Self {
        Self {
            system: default_tag_system(),
            code: default_tag_code(),
            display: default_tag_display(),
        }
    }
}

/// Record mapping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Identifier system URI for the conditional-upsert key
    #[serde(default = "default_identifier_system")]
    pub identifier_system: String,

    /// When enabled, name parts get disambiguation suffixes so verification
    /// runs cannot collide with pre-existing production data
    #[serde(default)]
    pub decorate_names: bool,

    /// Optional profile declaration for mapped resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Provenance tag attached to every mapped resource
    #[serde(default)]
    pub provenance_tag: ProvenanceTagConfig,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            identifier_system: default_identifier_system(),
            decorate_names: false,
            profile: None,
            provenance_tag: ProvenanceTagConfig::default(),
        }
    }
}

impl MappingConfig {
    fn validate(&self) -> Result<(), String> {
        if self.identifier_system.is_empty() {
            return Err("mapping.identifier_system cannot be empty".to_string());
        }
        if self.provenance_tag.code.is_empty() {
            return Err("mapping.provenance_tag.code cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Batch load configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Maximum operations per submitted bundle chunk (1-500)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Bundle type: "transaction" (atomic per chunk for protocol-level
    /// failures) or "batch" (per-entry independence)
    #[serde(default = "default_bundle_type")]
    pub bundle_type: String,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            bundle_type: default_bundle_type(),
        }
    }
}

impl LoadConfig {
    fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 || self.chunk_size > 500 {
            return Err(format!(
                "load.chunk_size must be between 1 and 500, got {}",
                self.chunk_size
            ));
        }
        let valid_types = ["transaction", "batch"];
        if !valid_types.contains(&self.bundle_type.as_str()) {
            return Err(format!(
                "Invalid load.bundle_type '{}'. Must be one of: {}",
                self.bundle_type,
                valid_types.join(", ")
            ));
        }
        Ok(())
    }
}

/// Post-load verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Run the automated verification query after a load
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable rolling file logging in addition to console output
    #[serde(default)]
    pub file_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_log_path")]
    pub file_path: String,

    /// Rotation policy: daily or hourly
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_enabled: false,
            file_path: default_log_path(),
            rotation: default_rotation(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.rotation.as_str()) {
            return Err(format!(
                "Invalid logging.rotation '{}'. Must be one of: {}",
                self.rotation,
                valid_rotations.join(", ")
            ));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_connect_timeout_seconds() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

// Defaults mirror the v3-ObservationValue SUBSET tag conventionally used to
// mark test data.
fn default_tag_system() -> String {
    "http://terminology.hl7.org/CodeSystem/v3-ObservationValue".to_string()
}

fn default_tag_code() -> String {
    "SUBSET".to_string()
}

fn default_tag_display() -> String {
    "Test Data".to_string()
}

fn default_identifier_system() -> String {
    "http://example.org/legacy-ids".to_string()
}

fn default_chunk_size() -> usize {
    100
}

fn default_bundle_type() -> String {
    "transaction".to_string()
}

fn default_log_path() -> String {
    "logs".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

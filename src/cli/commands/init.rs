//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "meridian.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Meridian configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Point source.path at your legacy CSV export");
                println!("  3. For authenticated servers, create a .env file and set MERIDIAN_FHIR_TOKEN");
                println!("  4. Validate configuration: meridian validate-config");
                println!("  5. Preview the batch: meridian load --dry-run");
                println!("  6. Run the load: meridian load");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Meridian Configuration File
# Legacy Clinical Records to FHIR ETL Tool

environment = "development"

[application]
log_level = "info"

[fhir]
base_url = "https://hapi.fhir.org/baseR4"

[source]
path = "legacy_patients.csv"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Meridian Configuration File
# Legacy Clinical Records to FHIR ETL Tool

# Runtime environment: development, staging, or production.
# Production refuses to run with TLS verification disabled.
environment = "development"

[application]
# Log level: trace, debug, info, warn, error
log_level = "info"

[fhir]
# Base URL of the target FHIR R4 server
base_url = "https://hapi.fhir.org/baseR4"

# Bearer token for authenticated servers. Prefer the environment variable
# over writing the credential into this file:
#   MERIDIAN_FHIR_TOKEN=...
# token = "${FHIR_TOKEN}"

# Request timeout in seconds
timeout_seconds = 30
connect_timeout_seconds = 10

# TLS certificate verification (required in production)
tls_verify = true

[fhir.retry]
# Transport-level failures are retried with exponential backoff.
# Retrying is always safe: every operation is a conditional upsert.
max_retries = 3
initial_delay_ms = 500
max_delay_ms = 10000
backoff_multiplier = 2.0

[source]
# Path to the legacy CSV export. Headers are matched case-insensitively
# and separator-insensitively, so FirstName and first_name both work.
path = "legacy_patients.csv"

[mapping]
# Identifier system URI. Together with the legacy id this forms the
# conditional-upsert key, so reruns update instead of duplicating.
identifier_system = "http://example.org/legacy-ids"

# Suffix name parts so test loads cannot collide with production data
decorate_names = false

# Optional profile declaration stamped on every mapped resource
# profile = "http://example.org/StructureDefinition/legacy-patient"

[mapping.provenance_tag]
# Tag attached to every mapped resource; verification searches by its code
system = "http://terminology.hl7.org/CodeSystem/v3-ObservationValue"
code = "SUBSET"
display = "Test Data"

[load]
# Operations per submitted bundle (1-500)
chunk_size = 100

# "transaction" for all-or-nothing chunks, "batch" for per-entry independence
bundle_type = "transaction"

[verification]
# Query the server after the load and reconcile against what was submitted
enabled = true

[logging]
# Rolling file logging in addition to console output
file_enabled = false
file_path = "logs"
rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeridianConfig;

    #[test]
    fn test_minimal_config_parses() {
        let config: MeridianConfig =
            toml::from_str(&InitArgs::generate_minimal_config()).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_config_parses() {
        let config: MeridianConfig =
            toml::from_str(&InitArgs::generate_config_with_examples()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.load.bundle_type, "transaction");
        assert_eq!(config.mapping.provenance_tag.code, "SUBSET");
    }
}

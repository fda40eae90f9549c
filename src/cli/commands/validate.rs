//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Meridian configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        match config.validate() {
            Ok(_) => {
                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Log Level: {}", config.application.log_level);
                println!("  Environment: {:?}", config.environment);
                println!("  FHIR Server: {}", config.fhir.base_url);
                println!(
                    "  Authentication: {}",
                    if config.fhir.token.is_some() {
                        "bearer token"
                    } else {
                        "none"
                    }
                );
                println!("  Source: {}", config.source.path);
                println!("  Identifier System: {}", config.mapping.identifier_system);
                println!("  Provenance Tag: {}", config.mapping.provenance_tag.code);
                println!("  Bundle Type: {}", config.load.bundle_type);
                println!("  Chunk Size: {}", config.load.chunk_size);
                println!(
                    "  Verification: {}",
                    if config.verification.enabled {
                        "enabled"
                    } else {
                        "disabled"
                    }
                );
                Ok(0)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                Ok(2)
            }
        }
    }
}

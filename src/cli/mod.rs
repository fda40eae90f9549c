//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Meridian using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Meridian - Legacy Clinical Records to FHIR ETL Tool
#[derive(Parser, Debug)]
#[command(name = "meridian")]
#[command(version, about, long_about = None)]
#[command(author = "Meridian Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "meridian.toml", env = "MERIDIAN_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "MERIDIAN_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transform legacy records and load them into the FHIR server
    Load(commands::load::LoadArgs),

    /// Query the FHIR server for previously loaded records
    Verify(commands::verify::VerifyArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_load() {
        let cli = Cli::parse_from(["meridian", "load"]);
        assert_eq!(cli.config, "meridian.toml");
        assert!(matches!(cli.command, Commands::Load(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["meridian", "--config", "custom.toml", "load"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["meridian", "--log-level", "debug", "load"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_verify() {
        let cli = Cli::parse_from(["meridian", "verify", "--limit", "10"]);
        match cli.command {
            Commands::Verify(args) => assert_eq!(args.limit, Some(10)),
            _ => panic!("expected verify command"),
        }
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["meridian", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["meridian", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }

    #[test]
    fn test_cli_parse_load_flags() {
        let cli = Cli::parse_from(["meridian", "load", "--yes", "--dry-run", "--no-verify"]);
        match cli.command {
            Commands::Load(args) => {
                assert!(args.yes);
                assert!(args.dry_run);
                assert!(args.no_verify);
            }
            _ => panic!("expected load command"),
        }
    }
}

//! Logging and observability
//!
//! Structured logging with the `tracing` stack: console output always,
//! JSON-formatted rolling file output when enabled in configuration.
//!
//! # Example
//!
//! ```no_run
//! use meridian::logging::init_logging;
//! use meridian::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

use crate::config::LoggingConfig;
use crate::domain::{MeridianError, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Guard that must be kept alive for the duration of the program
/// to ensure file logs are flushed properly
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

impl LoggingGuard {
    fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self {
            _file_guard: file_guard,
        }
    }
}

/// Initialize the logging system based on configuration
///
/// Returns a [`LoggingGuard`] that must be kept alive for the duration of
/// the program.
///
/// # Errors
///
/// Returns an error for an unknown log level or when the log directory
/// cannot be created.
pub fn init_logging(log_level_str: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    validate_log_level(log_level_str)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("meridian={log_level_str}")));

    let mut layers = Vec::new();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(env_filter)
        .boxed();
    layers.push(console_layer);

    let file_guard = if config.file_enabled {
        let rotation = match config.rotation.as_str() {
            "hourly" => Rotation::HOURLY,
            _ => Rotation::DAILY,
        };

        std::fs::create_dir_all(&config.file_path).map_err(|e| {
            MeridianError::Configuration(format!(
                "Failed to create log directory {}: {}",
                config.file_path, e
            ))
        })?;

        let file_appender = RollingFileAppender::new(rotation, &config.file_path, "meridian.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("meridian={log_level_str}")));
        let file_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(non_blocking)
            .with_filter(file_filter)
            .boxed();

        layers.push(file_layer);
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry().with(layers).try_init().ok();

    Ok(LoggingGuard::new(file_guard))
}

fn validate_log_level(level: &str) -> Result<()> {
    match level {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        other => Err(MeridianError::Configuration(format!(
            "Invalid log level '{other}'. Must be one of: trace, debug, info, warn, error"
        ))),
    }
}

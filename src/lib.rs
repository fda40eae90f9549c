// Meridian - Legacy Clinical Records to FHIR ETL Tool
// Copyright (c) 2025 Meridian Contributors
// Licensed under the MIT License

//! # Meridian - Legacy Clinical Records to FHIR ETL
//!
//! Meridian is an ETL tool built in Rust that migrates legacy tabular
//! patient records into a FHIR R4 server as canonical Patient resources,
//! then verifies the result with structured search queries.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Transforming** legacy CSV records into canonical FHIR Patient resources
//! - **Loading** resources via idempotent conditional-upsert transaction bundles
//! - **Analyzing** per-entry outcomes (created, updated, failed) in order
//! - **Verifying** server state with paginated, lazily-walked search queries
//!
//! ## Architecture
//!
//! Meridian follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (mapping, load, query, verification, pipeline)
//! - [`adapters`] - External integrations (FHIR transport, CSV source)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meridian::adapters::fhir::client::FhirClient;
//! use meridian::config::load_config;
//! use meridian::core::pipeline::Pipeline;
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("meridian.toml")?;
//!     let client = FhirClient::new(&config.fhir)?;
//!
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!     let pipeline = Pipeline::new(config, Arc::new(client));
//!     let summary = pipeline.run(shutdown_rx).await?;
//!     summary.log_summary();
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;

//! Load command implementation
//!
//! This module implements the `load` command: transform the legacy tabular
//! source into FHIR Patient resources, submit them as conditional upserts,
//! and verify server state afterwards.

use crate::adapters::fhir::client::FhirClient;
use crate::adapters::source::csv::CsvSource;
use crate::config::load_config;
use crate::core::load::{BatchBuilder, BundleType};
use crate::core::map::Mapper;
use crate::core::pipeline::Pipeline;
use clap::Args;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the load command
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Dry run mode - map and build the batch without submitting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Override the source CSV path
    #[arg(long)]
    pub source: Option<String>,

    /// Override the chunk size (1-500)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Skip post-load verification
    #[arg(long)]
    pub no_verify: bool,
}

impl LoadArgs {
    /// Execute the load command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting load command");

        let mut config = load_config(config_path)?;

        if let Some(source) = &self.source {
            tracing::info!(source = %source, "Overriding source path from CLI");
            config.source.path = source.clone();
        }

        if let Some(chunk_size) = self.chunk_size {
            tracing::info!(chunk_size, "Overriding chunk size from CLI");
            config.load.chunk_size = chunk_size;
        }

        if self.no_verify {
            tracing::info!("Disabling post-load verification from CLI");
            config.verification.enabled = false;
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        if self.dry_run {
            return self.preview(&config).await;
        }

        if !self.yes {
            println!("Load Configuration:");
            println!("  Source: {}", config.source.path);
            println!("  FHIR Server: {}", config.fhir.base_url);
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
            print!("Proceed? [y/N] ");
            io::stdout().flush()?;

            let mut answer = String::new();
            io::stdin().read_line(&mut answer)?;
            if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
                println!("Aborted");
                return Ok(0);
            }
        }

        let client = FhirClient::new(&config.fhir)?;
        let pipeline = Pipeline::new(config, Arc::new(client));
        let summary = pipeline.run(shutdown_signal).await?;
        summary.log_summary();

        println!();
        println!("Load Summary:");
        println!("  Records read:   {}", summary.records_read);
        println!("  Mapping errors: {}", summary.mapping_errors.len());
        println!("  Created:        {}", summary.created);
        println!("  Updated:        {}", summary.updated);
        println!("  Failed:         {}", summary.failed);
        if let Some(verified) = summary.verified_count {
            println!("  Verified:       {verified}");
            for discrepancy in &summary.verification_discrepancies {
                println!("  ⚠️  {discrepancy}");
            }
        }
        println!("  Duration:       {:.1}s", summary.duration.as_secs_f64());

        if summary.interrupted {
            println!();
            println!("⚠️  Run interrupted - outcomes above cover completed chunks only");
            return Ok(130);
        }
        if let Some(fatal) = &summary.fatal {
            println!();
            println!("❌ Load aborted: {fatal}");
            return Ok(5);
        }

        Ok(0)
    }

    /// Runs the transform phase only and reports what would be submitted
    async fn preview(&self, config: &crate::config::MeridianConfig) -> anyhow::Result<i32> {
        println!("🔍 DRY RUN MODE - No data will be submitted to the server");
        println!();

        let records = CsvSource::read_file(&config.source.path)?;
        let mapper = Mapper::new(&config.mapping);
        let (patients, rejections) = mapper.map_all(&records);

        let bundle_type: BundleType = config
            .load
            .bundle_type
            .parse()
            .map_err(anyhow::Error::msg)?;
        let (request, duplicates) =
            BatchBuilder::new(&config.mapping.identifier_system, bundle_type).build(&patients);

        println!("  Records read:    {}", records.len());
        println!("  Mappable:        {}", patients.len());
        println!(
            "  Rejected:        {}",
            rejections.len() + duplicates.len()
        );
        println!("  Operations:      {}", request.len());
        println!(
            "  Chunks:          {}",
            request.chunks(config.load.chunk_size).len()
        );
        for (row, error) in &rejections {
            println!("  ⚠️  row {row}: {error}");
        }
        for error in &duplicates {
            println!("  ⚠️  {error}");
        }
        Ok(0)
    }
}

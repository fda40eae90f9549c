//! End-to-end run coordination
//!
//! The pipeline wires the phases together: read the tabular source, map
//! records to canonical patients, build and submit the upsert batch, then
//! verify server state. The transport is injected so the whole pipeline
//! runs against a test double without a network.

use crate::adapters::fhir::transport::FhirTransport;
use crate::adapters::source::csv::CsvSource;
use crate::config::MeridianConfig;
use crate::core::load::{BatchBuilder, BundleType, ChunkedSubmitter};
use crate::core::map::Mapper;
use crate::core::pipeline::summary::PipelineSummary;
use crate::core::verify::{Reconciler, Verifier};
use crate::domain::errors::MeridianError;
use crate::domain::ids::LegacyId;
use crate::domain::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Coordinates a full transform-load-verify run
pub struct Pipeline {
    config: MeridianConfig,
    transport: Arc<dyn FhirTransport>,
}

impl Pipeline {
    pub fn new(config: MeridianConfig, transport: Arc<dyn FhirTransport>) -> Self {
        Self { config, transport }
    }

    /// Runs the pipeline to completion, interruption, or fatal failure.
    ///
    /// Per-record mapping rejections and per-entry server failures are
    /// business outcomes collected in the summary; only configuration,
    /// source, and protocol faults surface as `Err`.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<PipelineSummary> {
        let started = Instant::now();
        let mut summary = PipelineSummary::default();

        // Transform
        let records = CsvSource::read_file(&self.config.source.path)?;
        summary.records_read = records.len();
        tracing::info!(
            path = %self.config.source.path,
            records = records.len(),
            "Read source records"
        );

        let mapper = Mapper::new(&self.config.mapping);
        let (patients, rejections) = mapper.map_all(&records);
        for (row, error) in rejections {
            summary.mapping_errors.push(format!("row {row}: {error}"));
        }
        tracing::info!(
            mapped = patients.len(),
            rejected = summary.mapping_errors.len(),
            "Mapped records to canonical patients"
        );

        // Load
        let bundle_type: BundleType = self
            .config
            .load
            .bundle_type
            .parse()
            .map_err(MeridianError::Configuration)?;
        let (request, duplicates) =
            BatchBuilder::new(&self.config.mapping.identifier_system, bundle_type)
                .build(&patients);
        for error in duplicates {
            summary.mapping_errors.push(error.to_string());
        }

        let loaded_ids: Vec<LegacyId> = request
            .operations()
            .iter()
            .map(|op| op.legacy_id.clone())
            .collect();

        let submitter = ChunkedSubmitter::new(
            Arc::clone(&self.transport),
            self.config.load.chunk_size,
            self.config.fhir.retry.clone(),
        );
        let report = submitter.submit(&request, &shutdown).await?;
        summary.created = report.outcome.created();
        summary.updated = report.outcome.updated();
        summary.failed = report.outcome.failed();
        summary.failure_diagnostics = report.outcome.failure_diagnostics();
        summary.interrupted = report.interrupted;
        summary.fatal = report.fatal.map(|e| e.to_string());

        // Verify only after a complete load; a partial load would report
        // spurious shortfalls. A shutdown that lands while the last chunk
        // is in flight still stops the run here, before any search.
        if *shutdown.borrow() {
            summary.interrupted = true;
        }
        if self.config.verification.enabled && summary.fatal.is_none() && !summary.interrupted {
            let succeeded: Vec<LegacyId> = {
                let failed_indices: std::collections::BTreeSet<usize> = report
                    .outcome
                    .entries()
                    .iter()
                    .filter(|e| e.status == crate::core::load::EntryStatus::Failed)
                    .map(|e| e.operation_index)
                    .collect();
                loaded_ids
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !failed_indices.contains(i))
                    .map(|(_, id)| id.clone())
                    .collect()
            };

            let verifier = Verifier::new(
                Reconciler::new(Arc::clone(&self.transport)),
                &self.config.mapping.identifier_system,
                &self.config.mapping.provenance_tag.code,
            );
            let verification = verifier.verify(&succeeded, &shutdown).await?;
            summary.interrupted = verification.interrupted;
            summary.verified_count = Some(verification.verified_count);
            summary.verification_discrepancies = verification.discrepancies;
        }

        summary.duration = started.elapsed();
        Ok(summary)
    }
}

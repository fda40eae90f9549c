//! Chunked batch submission with retry
//!
//! Call discipline for the load phase: batches are split into chunks below
//! the configured operation ceiling, each chunk is submitted as one
//! serialized call, and transport-level failures are retried verbatim with
//! exponential backoff. Retrying a whole chunk is always safe because every
//! operation is a conditional upsert. 4xx protocol errors are never
//! retried. Cancellation is checked before each network call, never
//! mid-request, and outcomes already received are always preserved.

use crate::adapters::fhir::transport::FhirTransport;
use crate::config::RetryConfig;
use crate::core::load::batch::BatchRequest;
use crate::core::load::outcome::{self, BatchOutcome};
use crate::domain::errors::{FhirError, MeridianError};
use crate::domain::ids::LegacyId;
use crate::domain::Result;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Final disposition of a chunked submission
#[derive(Debug)]
pub struct SubmitReport {
    /// Per-entry outcomes for every chunk that completed, in operation order
    pub outcome: BatchOutcome,
    /// Whether a shutdown signal stopped the run between chunks
    pub interrupted: bool,
    /// Fatal transport failure that aborted the run, if any; outcomes of
    /// prior chunks remain in `outcome`
    pub fatal: Option<MeridianError>,
}

impl SubmitReport {
    /// Whether every chunk was submitted
    pub fn is_complete(&self) -> bool {
        !self.interrupted && self.fatal.is_none()
    }
}

/// Submits batch requests in chunks with bounded retry
pub struct ChunkedSubmitter {
    transport: Arc<dyn FhirTransport>,
    chunk_size: usize,
    retry: RetryConfig,
}

impl ChunkedSubmitter {
    /// Creates a submitter
    pub fn new(transport: Arc<dyn FhirTransport>, chunk_size: usize, retry: RetryConfig) -> Self {
        Self {
            transport,
            chunk_size,
            retry,
        }
    }

    /// Submits the batch chunk by chunk.
    ///
    /// Returns a [`SubmitReport`]; a fatal chunk failure or an interrupt is
    /// recorded in the report rather than thrown, so outcomes already
    /// received always reach the caller. Protocol errors (malformed
    /// responses) still propagate as `Err`.
    pub async fn submit(
        &self,
        request: &BatchRequest,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<SubmitReport> {
        let mut report = SubmitReport {
            outcome: BatchOutcome::default(),
            interrupted: false,
            fatal: None,
        };

        if request.is_empty() {
            tracing::debug!("No operations to submit");
            return Ok(report);
        }

        let chunks = request.chunks(self.chunk_size);
        tracing::info!(
            operations = request.len(),
            chunks = chunks.len(),
            chunk_size = self.chunk_size,
            "Submitting batch"
        );

        let mut index_offset = 0;
        for (chunk_index, chunk) in chunks.iter().enumerate() {
            if *shutdown.borrow() {
                tracing::warn!(
                    completed_chunks = chunk_index,
                    "Shutdown requested - stopping before next chunk submission"
                );
                report.interrupted = true;
                return Ok(report);
            }

            let ids: Vec<LegacyId> = chunk
                .operations()
                .iter()
                .map(|op| op.legacy_id.clone())
                .collect();

            match self.submit_chunk_with_retry(chunk, chunk_index).await {
                Ok(response) => {
                    let chunk_outcome = outcome::analyze(&response, &ids, index_offset)?;
                    tracing::info!(
                        chunk = chunk_index,
                        created = chunk_outcome.created(),
                        updated = chunk_outcome.updated(),
                        failed = chunk_outcome.failed(),
                        "Chunk submitted"
                    );
                    report.outcome.merge(chunk_outcome);
                }
                Err(e) => {
                    tracing::error!(
                        chunk = chunk_index,
                        error = %e,
                        "Chunk submission failed - aborting run, prior outcomes preserved"
                    );
                    report.fatal = Some(MeridianError::FatalBatch {
                        chunk_index,
                        message: e.to_string(),
                    });
                    return Ok(report);
                }
            }

            index_offset += chunk.len();
        }

        Ok(report)
    }

    /// Submits one chunk, retrying transport-level failures with backoff.
    ///
    /// Non-retryable errors (4xx, malformed responses) fail immediately.
    async fn submit_chunk_with_retry(
        &self,
        chunk: &BatchRequest,
        chunk_index: usize,
    ) -> Result<crate::adapters::fhir::models::Bundle, FhirError> {
        let bundle = chunk.to_bundle();
        let mut attempt = 0;

        loop {
            match self.transport.submit_bundle(&bundle).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt + 1 < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.backoff_delay(attempt);
                    tracing::warn!(
                        chunk = chunk_index,
                        attempt = attempt,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying chunk after transport error"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Exponential backoff with jitter, capped at `max_delay_ms`
    fn backoff_delay(&self, attempt: usize) -> Duration {
        let base = self.retry.initial_delay_ms as f64
            * self.retry.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let capped = base.min(self.retry.max_delay_ms as f64);
        let jitter = rand::thread_rng().gen_range(0.0..=capped * 0.1);
        Duration::from_millis((capped + jitter) as u64)
    }
}

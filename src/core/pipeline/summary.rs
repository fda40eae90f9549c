//! Run summary aggregation

use std::time::Duration;

/// Everything a completed (or aborted) run has to report
#[derive(Debug, Default)]
pub struct PipelineSummary {
    /// Source records read from the tabular input
    pub records_read: usize,
    /// Per-record mapping rejections, with source row context
    pub mapping_errors: Vec<String>,
    /// Resources created on the server
    pub created: usize,
    /// Resources updated in place
    pub updated: usize,
    /// Per-entry server-side failures
    pub failed: usize,
    /// Diagnostics for failed entries
    pub failure_diagnostics: Vec<String>,
    /// Primary matches returned by the verification query, if it ran
    pub verified_count: Option<usize>,
    /// Mismatches between server state and the loaded set
    pub verification_discrepancies: Vec<String>,
    /// Wall-clock duration of the run
    pub duration: Duration,
    /// Whether a shutdown signal stopped the run early
    pub interrupted: bool,
    /// Fatal transport failure that aborted the load, if any
    pub fatal: Option<String>,
}

impl PipelineSummary {
    /// Whether every record made it to the server without per-entry failure
    pub fn is_fully_successful(&self) -> bool {
        !self.interrupted
            && self.fatal.is_none()
            && self.mapping_errors.is_empty()
            && self.failed == 0
    }

    /// Emits the summary through structured logging
    pub fn log_summary(&self) {
        tracing::info!(
            records_read = self.records_read,
            mapping_errors = self.mapping_errors.len(),
            created = self.created,
            updated = self.updated,
            failed = self.failed,
            duration_ms = self.duration.as_millis() as u64,
            "Run complete"
        );

        for error in &self.mapping_errors {
            tracing::warn!(error = %error, "Record skipped during mapping");
        }
        for diagnostic in &self.failure_diagnostics {
            tracing::warn!(diagnostic = %diagnostic, "Entry failed on server");
        }

        match self.verified_count {
            Some(count) if self.verification_discrepancies.is_empty() => {
                tracing::info!(verified = count, "Verification clean");
            }
            Some(count) => {
                tracing::warn!(
                    verified = count,
                    discrepancies = self.verification_discrepancies.len(),
                    "Verification found discrepancies"
                );
            }
            None => {}
        }

        if let Some(fatal) = &self.fatal {
            tracing::error!(error = %fatal, "Load aborted");
        }
        if self.interrupted {
            tracing::warn!("Run interrupted by shutdown signal");
        }
    }
}

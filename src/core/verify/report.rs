//! Post-load verification
//!
//! After a load completes, the verifier queries the server for recently
//! tagged patients and reconciles what it gets back against the set of
//! identifiers the load claims to have written. Discrepancies are
//! reported, not thrown; verification never fails a run on its own.

use crate::core::query::{Direction, QueryBuilder, QueryDescriptor};
use crate::core::verify::reconciler::{EntryRole, Reconciler, ResourceEntry};
use crate::domain::ids::LegacyId;
use crate::domain::Result;
use serde_json::Value;
use std::collections::BTreeSet;
use tokio::sync::watch;

/// Outcome of reconciling server state against the loaded set
#[derive(Debug, Default)]
pub struct VerificationReport {
    /// Primary matches returned by the verification query
    pub verified_count: usize,
    /// Result pages fetched while walking the searchset
    pub pages_fetched: usize,
    /// Human-readable mismatches between server state and the loaded set
    pub discrepancies: Vec<String>,
    /// Whether the walk stopped early because a shutdown was requested
    pub interrupted: bool,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

/// Queries the server and reconciles results against loaded identifiers
pub struct Verifier {
    reconciler: Reconciler,
    identifier_system: String,
    tag_code: String,
}

impl Verifier {
    pub fn new(
        reconciler: Reconciler,
        identifier_system: impl Into<String>,
        tag_code: impl Into<String>,
    ) -> Self {
        Self {
            reconciler,
            identifier_system: identifier_system.into(),
            tag_code: tag_code.into(),
        }
    }

    /// The standard verification query: tagged patients, most recently
    /// updated first, capped at the number of identifiers loaded.
    pub fn verification_query(&self, loaded_count: usize) -> Result<QueryDescriptor> {
        let query = QueryBuilder::new("Patient")
            .filter("_tag", &self.tag_code)
            .sort("_lastUpdated", Direction::Descending)
            .limit(loaded_count)
            .build()?;
        Ok(query)
    }

    /// Runs the verification query and reconciles the results
    pub async fn verify(
        &self,
        loaded: &[LegacyId],
        shutdown: &watch::Receiver<bool>,
    ) -> Result<VerificationReport> {
        let mut report = VerificationReport::default();
        if loaded.is_empty() {
            tracing::info!("Nothing was loaded - skipping verification");
            return Ok(report);
        }

        let query = self.verification_query(loaded.len())?;
        tracing::info!(query = %query.query_string(), "Verifying loaded records");

        let mut walker = self.reconciler.execute(&query, shutdown).await?;
        let expected: BTreeSet<&str> = loaded.iter().map(LegacyId::as_str).collect();
        let mut seen: BTreeSet<String> = BTreeSet::new();

        while let Some(entry) = walker.next().await? {
            if entry.role != EntryRole::Primary {
                continue;
            }
            report.verified_count += 1;

            match self.legacy_id_of(&entry) {
                Some(id) if expected.contains(id.as_str()) => {
                    seen.insert(id);
                }
                Some(id) => {
                    report.discrepancies.push(format!(
                        "server returned tagged patient with unexpected identifier '{id}'"
                    ));
                }
                None => {
                    report.discrepancies.push(format!(
                        "tagged patient {} carries no identifier under {}",
                        entry.id().unwrap_or("<no id>"),
                        self.identifier_system
                    ));
                }
            }
        }
        report.pages_fetched = walker.pages_fetched();
        report.interrupted = walker.interrupted();

        // A truncated walk cannot distinguish "not written" from "not yet
        // seen", so the shortfall check only runs on a complete walk.
        if report.interrupted {
            tracing::warn!(
                verified = report.verified_count,
                "Verification interrupted before the searchset was exhausted"
            );
            return Ok(report);
        }

        if seen.len() < expected.len() {
            let missing: Vec<&str> = expected
                .iter()
                .filter(|id| !seen.contains(**id))
                .copied()
                .collect();
            report.discrepancies.push(format!(
                "{} loaded identifier(s) not found among tagged patients: {}",
                missing.len(),
                missing.join(", ")
            ));
        }

        if report.is_clean() {
            tracing::info!(
                verified = report.verified_count,
                pages = report.pages_fetched,
                "Verification clean"
            );
        } else {
            for discrepancy in &report.discrepancies {
                tracing::warn!(discrepancy = %discrepancy, "Verification discrepancy");
            }
        }

        Ok(report)
    }

    /// Pulls the legacy identifier from a returned Patient resource
    fn legacy_id_of(&self, entry: &ResourceEntry) -> Option<String> {
        entry
            .resource
            .get("identifier")?
            .as_array()?
            .iter()
            .find(|ident| {
                ident.get("system").and_then(Value::as_str) == Some(self.identifier_system.as_str())
            })
            .and_then(|ident| ident.get("value").and_then(Value::as_str))
            .map(String::from)
    }
}

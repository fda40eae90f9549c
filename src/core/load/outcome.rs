//! Transaction outcome analysis
//!
//! Classifies every entry of a bundle response as created, updated or
//! failed using a closed mapping over status-code ranges. Unrecognized
//! codes are never silently ignored; they become failures with a
//! diagnostic. Entry order mirrors operation order, so `outcome[i]` always
//! corresponds to `request.operations()[i]`.

use crate::adapters::fhir::models::Bundle;
use crate::domain::errors::MeridianError;
use crate::domain::ids::LegacyId;
use crate::domain::Result;

/// Per-entry outcome classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// 201: a new resource was created
    Created,
    /// Other 2xx: an existing resource was updated in place
    Updated,
    /// 4xx/5xx or anything unrecognized
    Failed,
}

/// Outcome of one upsert operation
#[derive(Debug, Clone)]
pub struct EntryOutcome {
    /// Index of the operation in the original batch (global across chunks)
    pub operation_index: usize,
    /// Legacy identifier of the operation, for diagnostics
    pub legacy_id: LegacyId,
    /// Classification
    pub status: EntryStatus,
    /// Server-assigned resource id, when the server reported a location
    pub server_id: Option<String>,
    /// Diagnostics for failed entries
    pub diagnostics: Option<String>,
}

/// Ordered, immutable record of a batch submission's per-entry outcomes
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    entries: Vec<EntryOutcome>,
}

impl BatchOutcome {
    /// Ordered entry outcomes
    pub fn entries(&self) -> &[EntryOutcome] {
        &self.entries
    }

    /// Number of entries classified as created
    pub fn created(&self) -> usize {
        self.count(EntryStatus::Created)
    }

    /// Number of entries classified as updated
    pub fn updated(&self) -> usize {
        self.count(EntryStatus::Updated)
    }

    /// Number of entries classified as failed
    pub fn failed(&self) -> usize {
        self.count(EntryStatus::Failed)
    }

    /// Diagnostics of failed entries, in operation order
    pub fn failure_diagnostics(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Failed)
            .map(|e| {
                format!(
                    "operation {} (id {}): {}",
                    e.operation_index,
                    e.legacy_id,
                    e.diagnostics.as_deref().unwrap_or("no diagnostics")
                )
            })
            .collect()
    }

    /// Appends the outcomes of a later chunk
    pub fn merge(&mut self, other: BatchOutcome) {
        self.entries.extend(other.entries);
    }

    fn count(&self, status: EntryStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }
}

/// Analyzes a bundle response against the chunk that produced it.
///
/// `index_offset` is the global index of the chunk's first operation, so
/// outcomes keep batch-wide operation indices across chunks.
///
/// # Errors
///
/// Returns [`MeridianError::Protocol`] when the response entry count does
/// not match the submitted operation count; order correspondence is the
/// contract the whole analysis rests on.
pub fn analyze(
    response: &Bundle,
    operation_ids: &[LegacyId],
    index_offset: usize,
) -> Result<BatchOutcome> {
    if response.entry.len() != operation_ids.len() {
        return Err(MeridianError::Protocol(format!(
            "Response entry count {} does not match submitted operation count {}",
            response.entry.len(),
            operation_ids.len()
        )));
    }

    let mut entries = Vec::with_capacity(operation_ids.len());
    for (i, (entry, legacy_id)) in response.entry.iter().zip(operation_ids).enumerate() {
        let operation_index = index_offset + i;

        let outcome = match &entry.response {
            Some(response_component) => {
                let (status, diagnostics) = classify_status(&response_component.status);
                let diagnostics = diagnostics.or_else(|| {
                    if status == EntryStatus::Failed {
                        Some(extract_diagnostics(response_component.outcome.as_ref()))
                    } else {
                        None
                    }
                });
                EntryOutcome {
                    operation_index,
                    legacy_id: legacy_id.clone(),
                    status,
                    server_id: response_component.resource_id().map(String::from),
                    diagnostics,
                }
            }
            None => EntryOutcome {
                operation_index,
                legacy_id: legacy_id.clone(),
                status: EntryStatus::Failed,
                server_id: None,
                diagnostics: Some("Response entry carries no response component".to_string()),
            },
        };

        entries.push(outcome);
    }

    Ok(BatchOutcome { entries })
}

/// Closed mapping from a status line to the three-valued outcome.
///
/// Returns an extra diagnostic only for the unrecognized-code fallback.
fn classify_status(status_line: &str) -> (EntryStatus, Option<String>) {
    let code: Option<u16> = status_line
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok());

    match code {
        Some(201) => (EntryStatus::Created, None),
        Some(c) if (200..300).contains(&c) => (EntryStatus::Updated, None),
        Some(c) if (400..600).contains(&c) => (EntryStatus::Failed, None),
        _ => (
            EntryStatus::Failed,
            Some(format!("Unrecognized status '{status_line}'")),
        ),
    }
}

/// Pulls human-readable diagnostics out of an entry's OperationOutcome
fn extract_diagnostics(outcome: Option<&serde_json::Value>) -> String {
    outcome
        .and_then(|o| o.get("issue"))
        .and_then(|issues| issues.as_array())
        .map(|issues| {
            issues
                .iter()
                .filter_map(|issue| issue.get("diagnostics").and_then(|d| d.as_str()))
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Server reported a failure without diagnostics".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(statuses: &[(&str, Option<&str>)]) -> Bundle {
        serde_json::from_value(json!({
            "resourceType": "Bundle",
            "type": "transaction-response",
            "entry": statuses
                .iter()
                .map(|(status, location)| {
                    let mut entry = json!({"response": {"status": status}});
                    if let Some(loc) = location {
                        entry["response"]["location"] = json!(loc);
                    }
                    entry
                })
                .collect::<Vec<_>>()
        }))
        .unwrap()
    }

    fn ids(names: &[&str]) -> Vec<LegacyId> {
        names.iter().map(|n| LegacyId::new(*n).unwrap()).collect()
    }

    #[test]
    fn test_analyze_classifies_created_and_updated() {
        let bundle = response(&[
            ("201 Created", Some("Patient/10/_history/1")),
            ("200 OK", Some("Patient/11/_history/2")),
        ]);
        let outcome = analyze(&bundle, &ids(&["A", "B"]), 0).unwrap();

        assert_eq!(outcome.created(), 1);
        assert_eq!(outcome.updated(), 1);
        assert_eq!(outcome.failed(), 0);
        assert_eq!(outcome.entries()[0].server_id.as_deref(), Some("10"));
        assert_eq!(outcome.entries()[1].server_id.as_deref(), Some("11"));
    }

    #[test]
    fn test_analyze_preserves_operation_order() {
        let bundle = response(&[
            ("201 Created", None),
            ("422 Unprocessable Entity", None),
            ("200 OK", None),
        ]);
        let outcome = analyze(&bundle, &ids(&["A", "B", "C"]), 0).unwrap();

        let statuses: Vec<_> = outcome.entries().iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![EntryStatus::Created, EntryStatus::Failed, EntryStatus::Updated]
        );
        assert_eq!(outcome.entries()[1].operation_index, 1);
        assert_eq!(outcome.entries()[1].legacy_id.as_str(), "B");
    }

    #[test]
    fn test_analyze_applies_index_offset() {
        let bundle = response(&[("200 OK", None)]);
        let outcome = analyze(&bundle, &ids(&["Z"]), 5).unwrap();
        assert_eq!(outcome.entries()[0].operation_index, 5);
    }

    #[test]
    fn test_analyze_unrecognized_status_is_failed_with_diagnostic() {
        let bundle = response(&[("banana", None), ("302 Found", None)]);
        let outcome = analyze(&bundle, &ids(&["A", "B"]), 0).unwrap();

        assert_eq!(outcome.failed(), 2);
        assert!(outcome.entries()[0]
            .diagnostics
            .as_deref()
            .unwrap()
            .contains("Unrecognized status"));
        assert!(outcome.entries()[1]
            .diagnostics
            .as_deref()
            .unwrap()
            .contains("Unrecognized status"));
    }

    #[test]
    fn test_analyze_entry_count_mismatch_is_protocol_error() {
        let bundle = response(&[("200 OK", None)]);
        let result = analyze(&bundle, &ids(&["A", "B"]), 0);
        assert!(matches!(result, Err(MeridianError::Protocol(_))));
    }

    #[test]
    fn test_analyze_extracts_operation_outcome_diagnostics() {
        let bundle: Bundle = serde_json::from_value(json!({
            "resourceType": "Bundle",
            "type": "transaction-response",
            "entry": [{
                "response": {
                    "status": "422 Unprocessable Entity",
                    "outcome": {
                        "resourceType": "OperationOutcome",
                        "issue": [{
                            "severity": "error",
                            "diagnostics": "Patient.birthDate is not a valid date"
                        }]
                    }
                }
            }]
        }))
        .unwrap();

        let outcome = analyze(&bundle, &ids(&["A"]), 0).unwrap();
        assert_eq!(outcome.failed(), 1);
        assert!(outcome.failure_diagnostics()[0].contains("not a valid date"));
    }

    #[test]
    fn test_merge_keeps_chunk_order() {
        let first = analyze(&response(&[("201 Created", None)]), &ids(&["A"]), 0).unwrap();
        let second = analyze(&response(&[("200 OK", None)]), &ids(&["B"]), 1).unwrap();

        let mut merged = first;
        merged.merge(second);

        assert_eq!(merged.created(), 1);
        assert_eq!(merged.updated(), 1);
        assert_eq!(merged.entries()[1].operation_index, 1);
    }
}

//! Upsert batch construction
//!
//! Turns canonical patients into one ordered batch of conditional PUT
//! operations. Each operation is keyed by `(identifier system, legacy id)`
//! rather than a server-assigned id, which makes resubmission naturally
//! idempotent: re-running the pipeline against the same input updates
//! resources in place instead of creating duplicates. No network access
//! happens here.

use crate::adapters::fhir::models::{Bundle, BundleEntry, RequestComponent};
use crate::domain::errors::MappingError;
use crate::domain::ids::LegacyId;
use crate::domain::patient::CanonicalPatient;
use serde_json::Value;
use std::collections::BTreeSet;
use std::str::FromStr;

/// Bundle submission mode, a transport capability flag.
///
/// `Transaction` is all-or-nothing for protocol-level failures; `Batch`
/// reports every entry independently. Per-entry business failures are
/// reported per-entry in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BundleType {
    #[default]
    Transaction,
    Batch,
}

impl BundleType {
    /// Wire value for the bundle `type` element
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleType::Transaction => "transaction",
            BundleType::Batch => "batch",
        }
    }
}

impl FromStr for BundleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transaction" => Ok(BundleType::Transaction),
            "batch" => Ok(BundleType::Batch),
            other => Err(format!(
                "Invalid bundle type '{other}'. Must be 'transaction' or 'batch'"
            )),
        }
    }
}

/// One conditional upsert operation
#[derive(Debug, Clone)]
pub struct UpsertOperation {
    /// Legacy identifier half of the conditional key
    pub legacy_id: LegacyId,
    /// FHIR Patient resource payload
    pub resource: Value,
    /// Conditional request URL, `Patient?identifier={system}|{id}`
    pub url: String,
}

/// Ordered sequence of upsert operations submitted as one unit
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    operations: Vec<UpsertOperation>,
    bundle_type: BundleType,
}

impl BatchRequest {
    /// The ordered operations
    pub fn operations(&self) -> &[UpsertOperation] {
        &self.operations
    }

    /// Number of operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the batch holds no operations
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Bundle submission mode
    pub fn bundle_type(&self) -> BundleType {
        self.bundle_type
    }

    /// Splits the batch into chunks of at most `chunk_size` operations,
    /// preserving operation order across chunk boundaries
    pub fn chunks(&self, chunk_size: usize) -> Vec<BatchRequest> {
        assert!(chunk_size > 0, "chunk_size must be positive");
        self.operations
            .chunks(chunk_size)
            .map(|ops| BatchRequest {
                operations: ops.to_vec(),
                bundle_type: self.bundle_type,
            })
            .collect()
    }

    /// Renders the batch as a FHIR request bundle
    pub fn to_bundle(&self) -> Bundle {
        let mut bundle = Bundle::request(self.bundle_type.as_str());
        for op in &self.operations {
            bundle.entry.push(BundleEntry {
                resource: Some(op.resource.clone()),
                request: Some(RequestComponent {
                    method: "PUT".to_string(),
                    url: op.url.clone(),
                }),
                ..Default::default()
            });
        }
        bundle
    }
}

/// Builds batch requests from canonical patients
#[derive(Debug, Clone)]
pub struct BatchBuilder {
    identifier_system: String,
    bundle_type: BundleType,
}

impl BatchBuilder {
    /// Creates a builder with the fixed conditional-key system
    pub fn new(identifier_system: impl Into<String>, bundle_type: BundleType) -> Self {
        Self {
            identifier_system: identifier_system.into(),
            bundle_type,
        }
    }

    /// Builds a batch from canonical patients.
    ///
    /// Duplicate legacy identifiers within the input set are rejected here:
    /// two conditional upserts for the same key in one bundle are ambiguous
    /// server-side. The first occurrence is kept, later ones come back as
    /// [`MappingError::DuplicateIdentifier`] diagnostics.
    pub fn build(
        &self,
        patients: &[CanonicalPatient],
    ) -> (BatchRequest, Vec<MappingError>) {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut operations = Vec::with_capacity(patients.len());
        let mut rejected = Vec::new();

        for patient in patients {
            if !seen.insert(patient.legacy_id.as_str()) {
                tracing::warn!(
                    legacy_id = %patient.legacy_id,
                    "Rejecting duplicate legacy identifier within one batch"
                );
                rejected.push(MappingError::DuplicateIdentifier {
                    id: patient.legacy_id.as_str().to_string(),
                });
                continue;
            }

            operations.push(UpsertOperation {
                legacy_id: patient.legacy_id.clone(),
                resource: patient.to_resource(&self.identifier_system),
                url: format!(
                    "Patient?identifier={}|{}",
                    self.identifier_system,
                    patient.legacy_id.as_str()
                ),
            });
        }

        (
            BatchRequest {
                operations,
                bundle_type: self.bundle_type,
            },
            rejected,
        )
    }
}

//! FHIR bundle wire models
//!
//! Serde models for the subset of the FHIR R4 `Bundle` resource the pipeline
//! manipulates: transaction/batch requests, transaction responses, and
//! searchset pages. Resource bodies stay as raw JSON values; Meridian never
//! models the full wire schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A FHIR Bundle in any of the directions the pipeline uses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(rename = "resourceType", default = "bundle_resource_type")]
    pub resource_type: String,

    /// Bundle type: transaction, batch, transaction-response, batch-response
    /// or searchset
    #[serde(rename = "type")]
    pub bundle_type: String,

    /// Total matching resources for searchset bundles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    /// Navigation links; a `next` relation carries the continuation URL
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<BundleLink>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,
}

impl Bundle {
    /// Creates an empty request bundle of the given type
    pub fn request(bundle_type: impl Into<String>) -> Self {
        Self {
            resource_type: bundle_resource_type(),
            bundle_type: bundle_type.into(),
            total: None,
            link: Vec::new(),
            entry: Vec::new(),
        }
    }

    /// Continuation URL for the next page of a searchset, if any.
    ///
    /// The URL is an opaque cursor valid only for the lifetime of the
    /// original query context.
    pub fn next_link(&self) -> Option<&str> {
        self.link
            .iter()
            .find(|l| l.relation == "next")
            .map(|l| l.url.as_str())
    }
}

/// Bundle navigation link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleLink {
    pub relation: String,
    pub url: String,
}

/// One bundle entry; which parts are present depends on direction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleEntry {
    #[serde(rename = "fullUrl", default, skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    /// The resource body (request payload or returned resource)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,

    /// Request component for transaction/batch entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestComponent>,

    /// Response component in transaction-response/batch-response entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseComponent>,

    /// Search component in searchset entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchComponent>,
}

/// Entry request: HTTP verb plus conditional URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestComponent {
    pub method: String,
    pub url: String,
}

/// Per-entry response status as returned by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseComponent {
    /// HTTP-style status line, e.g. `"201 Created"` or `"200 OK"`
    pub status: String,

    /// Server-assigned location, e.g. `"Patient/42/_history/1"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// OperationOutcome with diagnostics for failed entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Value>,
}

impl ResponseComponent {
    /// Extracts the server-assigned resource id from the location, if any
    pub fn resource_id(&self) -> Option<&str> {
        self.location
            .as_deref()
            .and_then(|loc| loc.split('/').nth(1))
            .filter(|id| !id.is_empty())
    }
}

/// Search entry metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchComponent {
    /// `"match"` for primary results, `"include"` for included resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

fn bundle_resource_type() -> String {
    "Bundle".to_string()
}

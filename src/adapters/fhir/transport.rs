//! FHIR transport trait
//!
//! The seam between the pipeline core and the wire. The core owns call
//! discipline (chunking, retry, cancellation); implementations own the
//! actual HTTP exchange. Tests substitute an in-memory store implementing
//! this trait.

use crate::adapters::fhir::models::Bundle;
use crate::domain::errors::FhirError;
use async_trait::async_trait;

/// Transport abstraction over a FHIR server
///
/// Implementations must preserve per-entry order in bundle responses: the
/// i-th response entry corresponds to the i-th submitted operation.
#[async_trait]
pub trait FhirTransport: Send + Sync {
    /// Submits a transaction/batch bundle and returns the response bundle
    async fn submit_bundle(&self, bundle: &Bundle) -> Result<Bundle, FhirError>;

    /// Executes a search for `resource_type` with the rendered query string
    /// and returns the first searchset page
    async fn search(&self, resource_type: &str, query: &str) -> Result<Bundle, FhirError>;

    /// Fetches a continuation page by its opaque `next` URL
    async fn fetch_page(&self, url: &str) -> Result<Bundle, FhirError>;
}

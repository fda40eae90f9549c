//! FHIR server adapter
//!
//! Wire models for the bundle subset the pipeline manipulates, the
//! [`FhirTransport`] trait that decouples the core from HTTP, and the
//! reqwest-backed [`FhirClient`] implementation.

pub mod client;
pub mod models;
pub mod transport;

pub use client::FhirClient;
pub use models::{Bundle, BundleEntry, BundleLink, RequestComponent, ResponseComponent, SearchComponent};
pub use transport::FhirTransport;

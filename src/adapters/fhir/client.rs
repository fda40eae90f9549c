//! HTTP client implementation of the FHIR transport
//!
//! Wraps `reqwest` with the configured base URL, timeouts, TLS policy and
//! bearer credential. Retry and chunking policy live above this layer, in
//! the core submitter; this client performs exactly one exchange per call
//! and triages failures into the domain error taxonomy.

use crate::adapters::fhir::models::Bundle;
use crate::adapters::fhir::transport::FhirTransport;
use crate::config::FhirConfig;
use crate::domain::errors::{FhirError, MeridianError};
use crate::domain::Result;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Response};
use secrecy::ExposeSecret;
use std::time::Duration;
use url::Url;

/// Reqwest-backed FHIR transport
pub struct FhirClient {
    base_url: Url,
    client: Client,
    /// Bearer credential; absent means deliberate unauthenticated access
    token: Option<String>,
}

impl FhirClient {
    /// Creates a client from FHIR configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the base URL cannot be parsed or
    /// the HTTP client cannot be built.
    pub fn new(config: &FhirConfig) -> Result<Self> {
        // A trailing slash makes Url::join keep the last path segment
        // (".../baseR4" + "Patient" would otherwise drop "baseR4").
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            MeridianError::Configuration(format!("Invalid fhir.base_url '{base}': {e}"))
        })?;

        let mut client_builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds));

        if !config.tls_verify {
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder.build().map_err(|e| {
            MeridianError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        let token = config
            .token
            .as_ref()
            .map(|t| t.expose_secret().as_ref().to_string());

        if token.is_none() {
            tracing::info!("No bearer credential configured - proceeding unauthenticated");
        }

        Ok(Self {
            base_url,
            client,
            token,
        })
    }

    /// Base URL of the remote store
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    fn triage_send_error(err: reqwest::Error) -> FhirError {
        if err.is_timeout() {
            FhirError::Timeout(err.to_string())
        } else {
            FhirError::ConnectionFailed(err.to_string())
        }
    }

    async fn read_bundle(response: Response) -> Result<Bundle, FhirError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json::<Bundle>()
                .await
                .map_err(|e| FhirError::InvalidResponse(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            Err(FhirError::ServerError {
                status: status.as_u16(),
                message: body,
            })
        } else {
            Err(FhirError::ClientError {
                status: status.as_u16(),
                message: body,
            })
        }
    }
}

#[async_trait]
impl FhirTransport for FhirClient {
    async fn submit_bundle(&self, bundle: &Bundle) -> Result<Bundle, FhirError> {
        let url = self.base_url.clone();

        tracing::debug!(
            url = %url,
            entries = bundle.entry.len(),
            bundle_type = %bundle.bundle_type,
            "Submitting bundle"
        );

        let request = self
            .authorize(self.client.post(url))
            .header("Content-Type", "application/fhir+json")
            .json(bundle);

        let response = request.send().await.map_err(Self::triage_send_error)?;
        Self::read_bundle(response).await
    }

    async fn search(&self, resource_type: &str, query: &str) -> Result<Bundle, FhirError> {
        let mut url = self
            .base_url
            .join(resource_type)
            .map_err(|e| FhirError::InvalidResponse(format!("Invalid search URL: {e}")))?;
        url.set_query(Some(query));

        tracing::debug!(url = %url, "Executing search");

        let request = self
            .authorize(self.client.get(url))
            .header("Accept", "application/fhir+json");

        let response = request.send().await.map_err(Self::triage_send_error)?;
        Self::read_bundle(response).await
    }

    async fn fetch_page(&self, url: &str) -> Result<Bundle, FhirError> {
        tracing::debug!(url = %url, "Fetching continuation page");

        let request = self
            .authorize(self.client.get(url))
            .header("Accept", "application/fhir+json");

        let response = request.send().await.map_err(Self::triage_send_error)?;
        Self::read_bundle(response).await
    }
}

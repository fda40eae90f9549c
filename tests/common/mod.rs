//! Shared test fixtures
//!
//! [`InMemoryFhirStore`] is a transport double with real conditional-upsert
//! semantics: the first submission for a given identifier creates, later
//! ones update, and searchsets page through stored patients most recently
//! written first. Tests exercise the pipeline end-to-end against it
//! without a network.

// Not every test binary uses every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use meridian::adapters::fhir::models::{
    Bundle, BundleEntry, BundleLink, ResponseComponent, SearchComponent,
};
use meridian::adapters::fhir::transport::FhirTransport;
use meridian::domain::errors::FhirError;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredPatient {
    server_id: String,
    identifier_key: String,
    resource: Value,
    version: u64,
    updated_seq: u64,
}

#[derive(Debug, Default)]
struct StoreState {
    patients: Vec<StoredPatient>,
    next_id: u64,
    next_seq: u64,
    submit_calls: usize,
    search_calls: usize,
    page_fetches: usize,
}

/// In-memory FHIR server double
#[derive(Debug, Default)]
pub struct InMemoryFhirStore {
    state: Mutex<StoreState>,
    /// Searchset page size; `None` returns everything in one page
    page_size: Option<usize>,
    /// Legacy identifier values whose upserts fail with 422
    fail_values: BTreeSet<String>,
}

impl InMemoryFhirStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: Some(page_size),
            ..Self::default()
        }
    }

    /// Makes upserts for the given legacy identifier values fail with a 422
    /// carrying an OperationOutcome
    pub fn failing_values(mut self, values: &[&str]) -> Self {
        self.fail_values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn patient_count(&self) -> usize {
        self.state.lock().unwrap().patients.len()
    }

    pub fn submit_calls(&self) -> usize {
        self.state.lock().unwrap().submit_calls
    }

    pub fn search_calls(&self) -> usize {
        self.state.lock().unwrap().search_calls
    }

    pub fn page_fetches(&self) -> usize {
        self.state.lock().unwrap().page_fetches
    }

    /// Version of the stored patient with the given identifier value, if any
    pub fn version_of(&self, identifier_value: &str) -> Option<u64> {
        let state = self.state.lock().unwrap();
        state
            .patients
            .iter()
            .find(|p| p.identifier_key.ends_with(&format!("|{identifier_value}")))
            .map(|p| p.version)
    }

    fn upsert(state: &mut StoreState, identifier_key: &str, resource: Value) -> ResponseComponent {
        state.next_seq += 1;
        let seq = state.next_seq;

        if let Some(existing) = state
            .patients
            .iter_mut()
            .find(|p| p.identifier_key == identifier_key)
        {
            existing.version += 1;
            existing.updated_seq = seq;
            let mut updated = resource;
            updated["id"] = json!(existing.server_id);
            existing.resource = updated;
            return ResponseComponent {
                status: "200 OK".to_string(),
                location: Some(format!(
                    "Patient/{}/_history/{}",
                    existing.server_id, existing.version
                )),
                outcome: None,
            };
        }

        state.next_id += 1;
        let server_id = state.next_id.to_string();
        let mut created = resource;
        created["id"] = json!(server_id);
        state.patients.push(StoredPatient {
            server_id: server_id.clone(),
            identifier_key: identifier_key.to_string(),
            resource: created,
            version: 1,
            updated_seq: seq,
        });
        ResponseComponent {
            status: "201 Created".to_string(),
            location: Some(format!("Patient/{server_id}/_history/1")),
            outcome: None,
        }
    }

    /// Extracts `system|value` from a conditional URL like
    /// `Patient?identifier=system|value`
    fn identifier_key(url: &str) -> Option<&str> {
        url.split_once("identifier=").map(|(_, key)| key)
    }

    fn tag_matches(resource: &Value, code: &str) -> bool {
        resource
            .pointer("/meta/tag")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .any(|t| t.get("code").and_then(Value::as_str) == Some(code))
            })
            .unwrap_or(false)
    }

    /// Runs the query against stored patients, newest write first, and
    /// renders the requested page of the searchset
    fn searchset(&self, query: &str, offset: usize) -> Bundle {
        let tag_filter = query
            .split('&')
            .find_map(|p| p.strip_prefix("_tag="))
            .map(str::to_string);
        let count: Option<usize> = query
            .split('&')
            .find_map(|p| p.strip_prefix("_count="))
            .and_then(|v| v.parse().ok());

        let state = self.state.lock().unwrap();
        let mut matches: Vec<&StoredPatient> = state
            .patients
            .iter()
            .filter(|p| match &tag_filter {
                Some(code) => Self::tag_matches(&p.resource, code),
                None => true,
            })
            .collect();
        matches.sort_by(|a, b| b.updated_seq.cmp(&a.updated_seq));
        if let Some(count) = count {
            matches.truncate(count);
        }

        let total = matches.len() as u64;
        let page_size = self.page_size.unwrap_or(usize::MAX);
        let page: Vec<&StoredPatient> =
            matches.into_iter().skip(offset).take(page_size).collect();
        let next_offset = offset + page.len();

        let mut bundle = Bundle::request("searchset");
        bundle.total = Some(total);
        for patient in page {
            bundle.entry.push(BundleEntry {
                full_url: Some(format!("Patient/{}", patient.server_id)),
                resource: Some(patient.resource.clone()),
                search: Some(SearchComponent {
                    mode: Some("match".to_string()),
                }),
                ..Default::default()
            });
        }
        if (next_offset as u64) < total {
            bundle.link.push(BundleLink {
                relation: "next".to_string(),
                url: format!("http://store.local/Patient?{query}&offset={next_offset}"),
            });
        }
        bundle
    }
}

#[async_trait]
impl FhirTransport for InMemoryFhirStore {
    async fn submit_bundle(&self, bundle: &Bundle) -> Result<Bundle, FhirError> {
        let mut state = self.state.lock().unwrap();
        state.submit_calls += 1;

        let mut response = Bundle::request(format!("{}-response", bundle.bundle_type));
        for entry in &bundle.entry {
            let url = entry
                .request
                .as_ref()
                .map(|r| r.url.as_str())
                .unwrap_or_default();
            let key = Self::identifier_key(url).unwrap_or_default().to_string();
            let value = key.split_once('|').map(|(_, v)| v).unwrap_or(&key);

            let component = if self.fail_values.contains(value) {
                ResponseComponent {
                    status: "422 Unprocessable Entity".to_string(),
                    location: None,
                    outcome: Some(json!({
                        "resourceType": "OperationOutcome",
                        "issue": [{
                            "severity": "error",
                            "code": "invariant",
                            "diagnostics": format!("rejected by server policy: {value}"),
                        }]
                    })),
                }
            } else {
                let resource = entry.resource.clone().unwrap_or(Value::Null);
                Self::upsert(&mut state, &key, resource)
            };

            response.entry.push(BundleEntry {
                response: Some(component),
                ..Default::default()
            });
        }
        Ok(response)
    }

    async fn search(&self, resource_type: &str, query: &str) -> Result<Bundle, FhirError> {
        assert_eq!(resource_type, "Patient", "store only indexes patients");
        self.state.lock().unwrap().search_calls += 1;
        Ok(self.searchset(query, 0))
    }

    async fn fetch_page(&self, url: &str) -> Result<Bundle, FhirError> {
        self.state.lock().unwrap().page_fetches += 1;
        let (query, offset) = url
            .split_once('?')
            .and_then(|(_, q)| q.rsplit_once("&offset="))
            .ok_or_else(|| FhirError::InvalidResponse(format!("bad page url: {url}")))?;
        let offset: usize = offset
            .parse()
            .map_err(|_| FhirError::InvalidResponse(format!("bad page offset in: {url}")))?;
        Ok(self.searchset(query, offset))
    }
}

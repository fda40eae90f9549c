//! Lazy searchset walking
//!
//! Executing a query yields a [`BundleWalker`] that pulls result entries
//! one at a time, fetching continuation pages only when the current page
//! is exhausted. Entries are tagged by how they entered the result set:
//! primary match, forward include, or reverse include.

use crate::adapters::fhir::models::BundleEntry;
use crate::adapters::fhir::transport::FhirTransport;
use crate::core::query::QueryDescriptor;
use crate::domain::errors::MeridianError;
use crate::domain::Result;
use serde_json::Value;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use tokio::sync::watch;

/// How an entry entered the result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRole {
    /// Matched the query filters directly
    Primary,
    /// Pulled in by following a reference out of a match
    IncludedForward,
    /// Pulled in because it references a match
    IncludedReverse,
}

/// One resource from a walked searchset
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    pub role: EntryRole,
    pub resource: Value,
}

impl ResourceEntry {
    /// The resource's `resourceType`, if present
    pub fn resource_type(&self) -> Option<&str> {
        self.resource.get("resourceType").and_then(Value::as_str)
    }

    /// The resource's `id`, if present
    pub fn id(&self) -> Option<&str> {
        self.resource.get("id").and_then(Value::as_str)
    }
}

/// Executes queries and hands back walkers over their results
pub struct Reconciler {
    transport: Arc<dyn FhirTransport>,
}

impl Reconciler {
    pub fn new(transport: Arc<dyn FhirTransport>) -> Self {
        Self { transport }
    }

    /// Runs the query and returns a walker positioned at the first entry.
    ///
    /// Only the first page is fetched here; later pages are fetched on
    /// demand as the walker is drained. The shutdown receiver is consulted
    /// before the initial search and before each continuation fetch, so a
    /// signalled walk stops without issuing further requests.
    pub async fn execute(
        &self,
        query: &QueryDescriptor,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<BundleWalker> {
        let reverse_types: BTreeSet<String> = query
            .reverse_include_types()
            .into_iter()
            .map(String::from)
            .collect();

        let mut walker = BundleWalker {
            transport: Arc::clone(&self.transport),
            pending: VecDeque::new(),
            next_url: None,
            reverse_types,
            pages_fetched: 0,
            shutdown: shutdown.clone(),
            interrupted: false,
        };

        if *shutdown.borrow() {
            tracing::warn!("Shutdown requested - skipping search");
            walker.interrupted = true;
            return Ok(walker);
        }

        let query_string = query.query_string();
        tracing::debug!(
            resource_type = query.resource_type(),
            query = %query_string,
            "Executing search"
        );

        let first = self
            .transport
            .search(query.resource_type(), &query_string)
            .await
            .map_err(MeridianError::from)?;
        walker.pages_fetched = 1;

        let next = first.next_link().map(String::from);
        walker.absorb(first.entry, next);
        Ok(walker)
    }
}

/// Pull-based iterator over a paginated searchset
pub struct BundleWalker {
    transport: Arc<dyn FhirTransport>,
    pending: VecDeque<ResourceEntry>,
    next_url: Option<String>,
    reverse_types: BTreeSet<String>,
    pages_fetched: usize,
    shutdown: watch::Receiver<bool>,
    interrupted: bool,
}

impl BundleWalker {
    /// Yields the next entry, fetching the next page if the current one is
    /// drained. `Ok(None)` means the searchset is exhausted, or that a
    /// shutdown was requested; [`BundleWalker::interrupted`] tells which.
    pub async fn next(&mut self) -> Result<Option<ResourceEntry>> {
        loop {
            if let Some(entry) = self.pending.pop_front() {
                return Ok(Some(entry));
            }

            let Some(url) = self.next_url.take() else {
                return Ok(None);
            };

            if *self.shutdown.borrow() {
                tracing::warn!("Shutdown requested - stopping result walk");
                self.interrupted = true;
                return Ok(None);
            }

            tracing::debug!(page = self.pages_fetched + 1, "Fetching next result page");
            let page = self
                .transport
                .fetch_page(&url)
                .await
                .map_err(MeridianError::from)?;
            self.pages_fetched += 1;
            let next = page.next_link().map(String::from);
            self.absorb(page.entry, next);
        }
    }

    /// Drains the remaining entries into a vector
    pub async fn collect_remaining(&mut self) -> Result<Vec<ResourceEntry>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next().await? {
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Number of pages fetched so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Whether the walk stopped early because a shutdown was requested
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    fn absorb(&mut self, entries: Vec<BundleEntry>, next_url: Option<String>) {
        for entry in entries {
            let Some(resource) = entry.resource else {
                continue;
            };
            let role = self.classify(entry.search.as_ref().and_then(|s| s.mode.as_deref()), &resource);
            self.pending.push_back(ResourceEntry { role, resource });
        }
        self.next_url = next_url;
    }

    /// Entries in `include` mode are reverse-included when their type was
    /// declared in a `_revinclude`, forward-included otherwise. Entries
    /// without a search mode count as primary matches.
    fn classify(&self, mode: Option<&str>, resource: &Value) -> EntryRole {
        match mode {
            Some("include") => {
                let resource_type = resource
                    .get("resourceType")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if self.reverse_types.contains(resource_type) {
                    EntryRole::IncludedReverse
                } else {
                    EntryRole::IncludedForward
                }
            }
            _ => EntryRole::Primary,
        }
    }
}

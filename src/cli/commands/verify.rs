//! Verify command implementation
//!
//! This module implements the standalone `verify` command: query the FHIR
//! server and report what is actually there, without running a load first.
//! By default it searches for patients carrying the configured provenance
//! tag; arbitrary filters and include directives can be stacked on top.

use crate::adapters::fhir::client::FhirClient;
use crate::config::load_config;
use crate::core::query::{Direction, QueryBuilder};
use crate::core::verify::{EntryRole, Reconciler};
use clap::Args;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the verify command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Resource type to search (defaults to Patient)
    #[arg(long, default_value = "Patient")]
    pub resource_type: String,

    /// Maximum number of primary matches to request
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Override the provenance tag code to search for; pass --no-tag to
    /// drop the tag filter entirely
    #[arg(long, conflicts_with = "no_tag")]
    pub tag: Option<String>,

    /// Search without the provenance tag filter
    #[arg(long)]
    pub no_tag: bool,

    /// Additional filter as path[:modifier]=value, e.g.
    /// participant.individual.name:contains=Smith (repeatable)
    #[arg(long = "filter", value_name = "PATH[:MOD]=VALUE")]
    pub filters: Vec<String>,

    /// Follow references out of matches, as SourceType:path (repeatable)
    #[arg(long = "include", value_name = "TYPE:PATH")]
    pub includes: Vec<String>,

    /// Pull in resources referencing the matches, as Type:path (repeatable)
    #[arg(long = "revinclude", value_name = "TYPE:PATH")]
    pub revincludes: Vec<String>,
}

impl VerifyArgs {
    /// Execute the verify command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting verify command");

        let config = load_config(config_path)?;
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        let mut builder = QueryBuilder::new(&self.resource_type)
            .sort("_lastUpdated", Direction::Descending);

        if !self.no_tag {
            let tag = self
                .tag
                .clone()
                .unwrap_or_else(|| config.mapping.provenance_tag.code.clone());
            builder = builder.filter("_tag", tag);
        }

        for raw in &self.filters {
            let Some((path_part, value)) = raw.split_once('=') else {
                eprintln!("Invalid filter '{raw}': expected path[:modifier]=value");
                return Ok(2);
            };
            builder = match path_part.split_once(':') {
                Some((path, modifier)) => builder.filter_with_modifier(path, modifier, value),
                None => builder.filter(path_part, value),
            };
        }

        for raw in &self.includes {
            let Some((source_type, path)) = raw.split_once(':') else {
                eprintln!("Invalid include '{raw}': expected Type:path");
                return Ok(2);
            };
            builder = builder.include(source_type, path);
        }
        for raw in &self.revincludes {
            let Some((resource_type, path)) = raw.split_once(':') else {
                eprintln!("Invalid revinclude '{raw}': expected Type:path");
                return Ok(2);
            };
            builder = builder.revinclude(resource_type, path);
        }

        if let Some(limit) = self.limit {
            builder = builder.limit(limit);
        }

        let query = match builder.build() {
            Ok(q) => q,
            Err(e) => {
                eprintln!("Invalid query: {e}");
                return Ok(2);
            }
        };

        println!(
            "🔍 Searching {}: {}",
            query.resource_type(),
            query.query_string()
        );
        println!();

        let client = FhirClient::new(&config.fhir)?;
        let reconciler = Reconciler::new(Arc::new(client));
        let mut walker = reconciler.execute(&query, &shutdown_signal).await?;

        let mut matches = 0;
        let mut included = 0;
        while let Some(entry) = walker.next().await? {
            let marker = match entry.role {
                EntryRole::Primary => {
                    matches += 1;
                    " "
                }
                EntryRole::IncludedForward => {
                    included += 1;
                    "→"
                }
                EntryRole::IncludedReverse => {
                    included += 1;
                    "←"
                }
            };

            let version = entry
                .resource
                .pointer("/meta/versionId")
                .and_then(Value::as_str)
                .unwrap_or("?");
            let label = entry
                .resource
                .pointer("/name/0/family")
                .or_else(|| entry.resource.pointer("/identifier/0/value"))
                .and_then(Value::as_str)
                .unwrap_or("-");
            println!(
                "  {} {}/{} v{} {}",
                marker,
                entry.resource_type().unwrap_or("?"),
                entry.id().unwrap_or("?"),
                version,
                label
            );
        }

        println!();
        println!(
            "Found {} match(es) and {} included resource(s) across {} page(s)",
            matches,
            included,
            walker.pages_fetched()
        );

        if walker.interrupted() {
            println!("⚠️  Walk interrupted - results above are incomplete");
            return Ok(130);
        }
        Ok(0)
    }
}

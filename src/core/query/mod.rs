//! Structured search query construction
//!
//! A [`QueryBuilder`] assembles filters, includes, sorting, and a result
//! limit into an immutable [`QueryDescriptor`], which renders itself as a
//! FHIR search query string. Construction is the only place validation
//! happens; a descriptor that exists is renderable.

use crate::domain::errors::QueryBuildError;
use std::collections::BTreeSet;
use std::fmt;
use url::form_urlencoded;

/// Sort direction for a `_sort` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A single search filter, e.g. `participant.individual.name:contains=Smith`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Filter {
    /// Search parameter path, possibly chained with `.`
    pub path: String,
    /// Optional modifier rendered after `:`
    pub modifier: Option<String>,
    pub value: String,
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.modifier {
            Some(m) => write!(f, "{}:{}={}", self.path, m, self.value),
            None => write!(f, "{}={}", self.path, self.value),
        }
    }
}

/// A related-resource inclusion directive.
///
/// `Forward` follows references out of matched resources (`_include`);
/// `Reverse` pulls in resources that point back at the matches
/// (`_revinclude`). The variant is kept explicit so result entries can be
/// tagged by which direction produced them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Include {
    Forward {
        /// Resource type the reference lives on
        source_type: String,
        /// Reference search parameter, e.g. `patient`
        reference_path: String,
    },
    Reverse {
        /// Resource type that references the matches
        resource_type: String,
        reference_path: String,
    },
}

impl Include {
    fn declaration(&self) -> String {
        match self {
            Include::Forward {
                source_type,
                reference_path,
            } => format!("{source_type}:{reference_path}"),
            Include::Reverse {
                resource_type,
                reference_path,
            } => format!("{resource_type}:{reference_path}"),
        }
    }
}

/// A sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

/// An immutable, validated search query
#[derive(Debug, Clone)]
pub struct QueryDescriptor {
    resource_type: String,
    filters: Vec<Filter>,
    includes: BTreeSet<Include>,
    sort: Option<Sort>,
    limit: Option<usize>,
}

impl QueryDescriptor {
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Resource types declared via reverse includes. Used when walking
    /// results to tell reverse-included entries from forward-included ones.
    pub fn reverse_include_types(&self) -> BTreeSet<&str> {
        self.includes
            .iter()
            .filter_map(|inc| match inc {
                Include::Reverse { resource_type, .. } => Some(resource_type.as_str()),
                Include::Forward { .. } => None,
            })
            .collect()
    }

    /// Renders the query string, without a leading `?`.
    ///
    /// Filter values are form-encoded; parameter names, modifiers, and
    /// include declarations are emitted verbatim since they are validated
    /// identifiers.
    pub fn query_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        for filter in &self.filters {
            let value: String = form_urlencoded::byte_serialize(filter.value.as_bytes()).collect();
            match &filter.modifier {
                Some(m) => parts.push(format!("{}:{}={}", filter.path, m, value)),
                None => parts.push(format!("{}={}", filter.path, value)),
            }
        }

        for include in &self.includes {
            match include {
                Include::Forward { .. } => {
                    parts.push(format!("_include={}", include.declaration()))
                }
                Include::Reverse { .. } => {
                    parts.push(format!("_revinclude={}", include.declaration()))
                }
            }
        }

        if let Some(sort) = &self.sort {
            match sort.direction {
                Direction::Ascending => parts.push(format!("_sort={}", sort.field)),
                Direction::Descending => parts.push(format!("_sort=-{}", sort.field)),
            }
        }

        if let Some(limit) = self.limit {
            parts.push(format!("_count={limit}"));
        }

        parts.join("&")
    }
}

/// Accumulates query components and validates them at build time
#[derive(Debug, Default)]
pub struct QueryBuilder {
    resource_type: String,
    filters: Vec<Filter>,
    includes: BTreeSet<Include>,
    sort: Option<Sort>,
    limit: Option<usize>,
}

impl QueryBuilder {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            ..Default::default()
        }
    }

    /// Adds a plain filter
    pub fn filter(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter {
            path: path.into(),
            modifier: None,
            value: value.into(),
        });
        self
    }

    /// Adds a filter with a modifier, e.g. `contains` or `exact`
    pub fn filter_with_modifier(
        mut self,
        path: impl Into<String>,
        modifier: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.filters.push(Filter {
            path: path.into(),
            modifier: Some(modifier.into()),
            value: value.into(),
        });
        self
    }

    /// Follows references out of matched resources. Duplicate declarations
    /// collapse to one.
    pub fn include(
        mut self,
        source_type: impl Into<String>,
        reference_path: impl Into<String>,
    ) -> Self {
        self.includes.insert(Include::Forward {
            source_type: source_type.into(),
            reference_path: reference_path.into(),
        });
        self
    }

    /// Pulls in resources that reference the matches
    pub fn revinclude(
        mut self,
        resource_type: impl Into<String>,
        reference_path: impl Into<String>,
    ) -> Self {
        self.includes.insert(Include::Reverse {
            resource_type: resource_type.into(),
            reference_path: reference_path.into(),
        });
        self
    }

    /// Sets the sort key, replacing any previous one
    pub fn sort(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.sort = Some(Sort {
            field: field.into(),
            direction,
        });
        self
    }

    /// Caps the number of primary matches
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Validates components and produces the descriptor.
    ///
    /// Fails on an empty resource type, empty filter paths or values,
    /// empty include components, or a zero limit.
    pub fn build(self) -> Result<QueryDescriptor, QueryBuildError> {
        if self.resource_type.trim().is_empty() {
            return Err(QueryBuildError::EmptyResourceType);
        }

        for filter in &self.filters {
            if filter.path.trim().is_empty() {
                return Err(QueryBuildError::EmptyFilterPath);
            }
            if filter.value.trim().is_empty() {
                return Err(QueryBuildError::EmptyFilterValue {
                    path: filter.path.clone(),
                });
            }
        }

        for include in &self.includes {
            let declaration = include.declaration();
            let malformed = match include {
                Include::Forward {
                    source_type,
                    reference_path,
                } => source_type.trim().is_empty() || reference_path.trim().is_empty(),
                Include::Reverse {
                    resource_type,
                    reference_path,
                } => resource_type.trim().is_empty() || reference_path.trim().is_empty(),
            };
            if malformed {
                return Err(QueryBuildError::EmptyIncludePath { declaration });
            }
        }

        if self.limit == Some(0) {
            return Err(QueryBuildError::ZeroLimit);
        }

        Ok(QueryDescriptor {
            resource_type: self.resource_type,
            filters: self.filters,
            includes: self.includes,
            sort: self.sort,
            limit: self.limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_filter() {
        let query = QueryBuilder::new("Patient")
            .filter("_tag", "SUBSET")
            .build()
            .unwrap();
        assert_eq!(query.query_string(), "_tag=SUBSET");
    }

    #[test]
    fn test_chained_filter_with_modifier() {
        let query = QueryBuilder::new("Encounter")
            .filter_with_modifier("participant.individual.name", "contains", "Smith")
            .build()
            .unwrap();
        assert_eq!(
            query.query_string(),
            "participant.individual.name:contains=Smith"
        );
    }

    #[test]
    fn test_filter_value_is_encoded() {
        let query = QueryBuilder::new("Patient")
            .filter("identifier", "http://example.org/ids|A-001")
            .build()
            .unwrap();
        assert_eq!(
            query.query_string(),
            "identifier=http%3A%2F%2Fexample.org%2Fids%7CA-001"
        );
    }

    #[test]
    fn test_includes_and_revincludes_render_separately() {
        let query = QueryBuilder::new("Encounter")
            .include("Encounter", "patient")
            .revinclude("Observation", "patient")
            .build()
            .unwrap();
        let rendered = query.query_string();
        assert!(rendered.contains("_include=Encounter:patient"));
        assert!(rendered.contains("_revinclude=Observation:patient"));
    }

    #[test]
    fn test_duplicate_includes_collapse() {
        let query = QueryBuilder::new("Encounter")
            .include("Encounter", "patient")
            .include("Encounter", "patient")
            .build()
            .unwrap();
        assert_eq!(query.query_string(), "_include=Encounter:patient");
    }

    #[test]
    fn test_forward_and_reverse_same_declaration_are_distinct() {
        let query = QueryBuilder::new("Encounter")
            .include("Observation", "patient")
            .revinclude("Observation", "patient")
            .build()
            .unwrap();
        let rendered = query.query_string();
        assert!(rendered.contains("_include=Observation:patient"));
        assert!(rendered.contains("_revinclude=Observation:patient"));
    }

    #[test]
    fn test_include_declaration_order_is_irrelevant() {
        let forward_first = QueryBuilder::new("Encounter")
            .include("Encounter", "patient")
            .revinclude("Observation", "patient")
            .build()
            .unwrap();
        let reverse_first = QueryBuilder::new("Encounter")
            .revinclude("Observation", "patient")
            .include("Encounter", "patient")
            .build()
            .unwrap();
        assert_eq!(forward_first.query_string(), reverse_first.query_string());
    }

    #[test]
    fn test_sort_descending_and_limit() {
        let query = QueryBuilder::new("Patient")
            .filter("_tag", "SUBSET")
            .sort("_lastUpdated", Direction::Descending)
            .limit(20)
            .build()
            .unwrap();
        assert_eq!(
            query.query_string(),
            "_tag=SUBSET&_sort=-_lastUpdated&_count=20"
        );
    }

    #[test]
    fn test_sort_replaces_previous() {
        let query = QueryBuilder::new("Patient")
            .sort("name", Direction::Ascending)
            .sort("_lastUpdated", Direction::Descending)
            .build()
            .unwrap();
        assert_eq!(query.query_string(), "_sort=-_lastUpdated");
    }

    #[test]
    fn test_empty_resource_type_rejected() {
        let err = QueryBuilder::new("  ").build().unwrap_err();
        assert!(matches!(err, QueryBuildError::EmptyResourceType));
    }

    #[test]
    fn test_empty_filter_value_rejected() {
        let err = QueryBuilder::new("Patient")
            .filter("_tag", "")
            .build()
            .unwrap_err();
        assert!(matches!(err, QueryBuildError::EmptyFilterValue { .. }));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let err = QueryBuilder::new("Patient").limit(0).build().unwrap_err();
        assert!(matches!(err, QueryBuildError::ZeroLimit));
    }

    #[test]
    fn test_reverse_include_types() {
        let query = QueryBuilder::new("Encounter")
            .include("Encounter", "patient")
            .revinclude("Observation", "patient")
            .revinclude("DiagnosticReport", "subject")
            .build()
            .unwrap();
        let types = query.reverse_include_types();
        assert!(types.contains("Observation"));
        assert!(types.contains("DiagnosticReport"));
        assert!(!types.contains("Encounter"));
    }
}

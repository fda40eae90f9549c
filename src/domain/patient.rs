//! Canonical patient model and raw record types
//!
//! The canonical model is the pipeline's internal representation of one
//! legacy patient row after mapping. It is immutable once constructed and is
//! owned by the batch request until submission; after that the server holds
//! the authoritative state and the pipeline keeps only outcome records.

use crate::domain::ids::LegacyId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// One raw row from the tabular source: an ordered column-name → value map.
///
/// No invariants are enforced here; records may be malformed. Column lookup
/// is tolerant of header styles (`FirstName`, `first_name` and `firstname`
/// all resolve to the same column).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    columns: Vec<(String, String)>,
}

impl RawRecord {
    /// Creates a record from ordered (column, value) pairs
    pub fn new(columns: Vec<(String, String)>) -> Self {
        Self { columns }
    }

    /// Looks up a column by normalized name
    pub fn get(&self, name: &str) -> Option<&str> {
        let wanted = normalize_header(name);
        self.columns
            .iter()
            .find(|(col, _)| normalize_header(col) == wanted)
            .map(|(_, value)| value.as_str())
    }

    /// Column count
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the record has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Ordered view of the raw columns
    pub fn columns(&self) -> &[(String, String)] {
        &self.columns
    }
}

/// Lowercases and strips `_`, `-` and spaces so legacy header spellings
/// (`FirstName`, `first_name`) resolve to the same column.
fn normalize_header(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Administrative gender, coerced to a closed set.
///
/// Unrecognized or absent raw values map to `Unknown`, never to an error,
/// which keeps the mapper total on this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    /// Coerces a raw cell value to the closed gender set
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("male") => Gender::Male,
            Some("female") => Gender::Female,
            _ => Gender::Unknown,
        }
    }

    /// FHIR wire value for the gender code
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata marker identifying pipeline-generated resources, so the
/// verification query (and any later cleanup) can filter by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceTag {
    /// Code system URI
    pub system: String,
    /// Tag code
    pub code: String,
    /// Human-readable display text
    pub display: String,
}

impl ProvenanceTag {
    /// Creates a provenance tag
    pub fn new(
        system: impl Into<String>,
        code: impl Into<String>,
        display: impl Into<String>,
    ) -> Self {
        Self {
            system: system.into(),
            code: code.into(),
            display: display.into(),
        }
    }
}

/// Canonical clinical resource produced by the mapper.
///
/// Required fields are guaranteed non-empty by construction through the
/// mapper; `phone` is omitted from the wire resource when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPatient {
    /// Stable external identifier from the legacy system
    pub legacy_id: LegacyId,
    /// Family name part
    pub family: String,
    /// Given name part
    pub given: String,
    /// Administrative gender
    pub gender: Gender,
    /// ISO-8601 date string (`yyyy-MM-dd`)
    pub birth_date: String,
    /// Optional contact phone number
    pub phone: Option<String>,
    /// Provenance tag set attached by the mapper
    pub tags: Vec<ProvenanceTag>,
    /// Optional profile declaration for `meta.profile`
    pub profile: Option<String>,
}

impl CanonicalPatient {
    /// Renders the canonical patient as a FHIR R4 Patient resource.
    ///
    /// `identifier_system` is the fixed system URI that, together with the
    /// legacy id, forms the conditional-upsert key.
    pub fn to_resource(&self, identifier_system: &str) -> Value {
        let mut meta = json!({
            "tag": self
                .tags
                .iter()
                .map(|t| json!({
                    "system": t.system,
                    "code": t.code,
                    "display": t.display,
                }))
                .collect::<Vec<_>>(),
        });
        if let Some(profile) = &self.profile {
            meta["profile"] = json!([profile]);
        }

        let mut resource = json!({
            "resourceType": "Patient",
            "meta": meta,
            "identifier": [{
                "system": identifier_system,
                "value": self.legacy_id.as_str(),
            }],
            "name": [{
                "family": self.family,
                "given": [self.given],
            }],
            "gender": self.gender.as_str(),
            "birthDate": self.birth_date,
        });

        if let Some(phone) = &self.phone {
            resource["telecom"] = json!([{
                "system": "phone",
                "value": phone,
            }]);
        }

        resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient() -> CanonicalPatient {
        CanonicalPatient {
            legacy_id: LegacyId::new("PAT-1").unwrap(),
            family: "Chen".to_string(),
            given: "Wei".to_string(),
            gender: Gender::Female,
            birth_date: "1984-03-12".to_string(),
            phone: Some("555-0100".to_string()),
            tags: vec![ProvenanceTag::new(
                "http://terminology.hl7.org/CodeSystem/v3-ObservationValue",
                "SUBSET",
                "Test Data",
            )],
            profile: None,
        }
    }

    #[test]
    fn test_raw_record_header_normalization() {
        let record = RawRecord::new(vec![
            ("Id".to_string(), "1".to_string()),
            ("FirstName".to_string(), "Wei".to_string()),
            ("birth_date".to_string(), "1984-03-12".to_string()),
        ]);

        assert_eq!(record.get("id"), Some("1"));
        assert_eq!(record.get("first_name"), Some("Wei"));
        assert_eq!(record.get("BirthDate"), Some("1984-03-12"));
        assert_eq!(record.get("phone"), None);
    }

    #[test]
    fn test_gender_coercion_is_total() {
        assert_eq!(Gender::from_raw(Some("Male")), Gender::Male);
        assert_eq!(Gender::from_raw(Some("FEMALE")), Gender::Female);
        assert_eq!(Gender::from_raw(Some("nonbinary")), Gender::Unknown);
        assert_eq!(Gender::from_raw(Some("")), Gender::Unknown);
        assert_eq!(Gender::from_raw(None), Gender::Unknown);
    }

    #[test]
    fn test_to_resource_shape() {
        let resource = patient().to_resource("http://example.org/legacy-ids");

        assert_eq!(resource["resourceType"], "Patient");
        assert_eq!(
            resource["identifier"][0]["system"],
            "http://example.org/legacy-ids"
        );
        assert_eq!(resource["identifier"][0]["value"], "PAT-1");
        assert_eq!(resource["name"][0]["family"], "Chen");
        assert_eq!(resource["name"][0]["given"][0], "Wei");
        assert_eq!(resource["gender"], "female");
        assert_eq!(resource["birthDate"], "1984-03-12");
        assert_eq!(resource["telecom"][0]["value"], "555-0100");
        assert_eq!(resource["meta"]["tag"][0]["code"], "SUBSET");
    }

    #[test]
    fn test_to_resource_omits_absent_phone() {
        let mut p = patient();
        p.phone = None;
        let resource = p.to_resource("http://example.org/legacy-ids");
        assert!(resource.get("telecom").is_none());
    }

    #[test]
    fn test_to_resource_includes_profile() {
        let mut p = patient();
        p.profile = Some("http://example.org/StructureDefinition/legacy-patient".to_string());
        let resource = p.to_resource("http://example.org/legacy-ids");
        assert_eq!(
            resource["meta"]["profile"][0],
            "http://example.org/StructureDefinition/legacy-patient"
        );
    }
}

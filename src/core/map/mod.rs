//! Canonical mapper
//!
//! Pure transformation from raw tabular records to canonical patients.
//! No I/O. The mapper fails only when a required field is absent, empty or
//! (for the birth date) not a real calendar date; every optional field
//! degrades gracefully, and gender coercion is total.

use crate::config::MappingConfig;
use crate::domain::errors::MappingError;
use chrono::NaiveDate;
use crate::domain::ids::LegacyId;
use crate::domain::patient::{CanonicalPatient, Gender, ProvenanceTag, RawRecord};

/// Required source columns. A record missing any of these is skipped with
/// a [`MappingError`]; the pipeline run continues.
const REQUIRED_FIELDS: [&str; 4] = ["id", "first_name", "last_name", "birth_date"];

/// Maps raw records to canonical patients
#[derive(Debug, Clone)]
pub struct Mapper {
    identifier_system: String,
    decorate_names: bool,
    profile: Option<String>,
    tag: ProvenanceTag,
}

impl Mapper {
    /// Creates a mapper from mapping configuration
    pub fn new(config: &MappingConfig) -> Self {
        Self {
            identifier_system: config.identifier_system.clone(),
            decorate_names: config.decorate_names,
            profile: config.profile.clone(),
            tag: ProvenanceTag::new(
                config.provenance_tag.system.clone(),
                config.provenance_tag.code.clone(),
                config.provenance_tag.display.clone(),
            ),
        }
    }

    /// Identifier system URI forming the conditional-upsert key
    pub fn identifier_system(&self) -> &str {
        &self.identifier_system
    }

    /// Provenance tag attached to every mapped resource
    pub fn provenance_tag(&self) -> &ProvenanceTag {
        &self.tag
    }

    /// Maps one raw record to a canonical patient
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::MissingRequired`] when `id`, `first_name`,
    /// `last_name` or `birth_date` is absent or empty, and
    /// [`MappingError::InvalidBirthDate`] when the birth date is not a real
    /// `YYYY-MM-DD` date. No partial patient is ever produced. Unrecognized
    /// gender values map to [`Gender::Unknown`], never to an error; a blank
    /// phone is omitted.
    pub fn map(&self, record: &RawRecord) -> Result<CanonicalPatient, MappingError> {
        for field in REQUIRED_FIELDS {
            match record.get(field) {
                Some(value) if !value.trim().is_empty() => {}
                _ => {
                    return Err(MappingError::MissingRequired {
                        field: field.to_string(),
                    })
                }
            }
        }

        // Required fields checked above; lookups cannot fail from here on.
        let id_value = record.get("id").unwrap_or_default().trim().to_string();
        let legacy_id = LegacyId::new(id_value).map_err(|_| MappingError::MissingRequired {
            field: "id".to_string(),
        })?;

        let mut given = record.get("first_name").unwrap_or_default().trim().to_string();
        let mut family = record.get("last_name").unwrap_or_default().trim().to_string();
        if self.decorate_names {
            given = format!("{given}-Test");
            family = format!("{family} [TEST]");
        }

        let birth_date = record.get("birth_date").unwrap_or_default().trim().to_string();
        if NaiveDate::parse_from_str(&birth_date, "%Y-%m-%d").is_err() {
            return Err(MappingError::InvalidBirthDate { value: birth_date });
        }

        let phone = record
            .get("phone")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from);

        Ok(CanonicalPatient {
            legacy_id,
            family,
            given,
            gender: Gender::from_raw(record.get("gender")),
            birth_date,
            phone,
            tags: vec![self.tag.clone()],
            profile: self.profile.clone(),
        })
    }

    /// Maps a sequence of records, partitioning successes from failures.
    ///
    /// Failures carry the 1-based row number for diagnostics. Record order
    /// is preserved on both sides.
    pub fn map_all(&self, records: &[RawRecord]) -> (Vec<CanonicalPatient>, Vec<(usize, MappingError)>) {
        let mut patients = Vec::with_capacity(records.len());
        let mut errors = Vec::new();

        for (index, record) in records.iter().enumerate() {
            match self.map(record) {
                Ok(patient) => patients.push(patient),
                Err(e) => {
                    tracing::warn!(
                        row = index + 1,
                        error = %e,
                        "Skipping record that failed mapping"
                    );
                    errors.push((index + 1, e));
                }
            }
        }

        (patients, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MappingConfig, ProvenanceTagConfig};
    use test_case::test_case;

    fn mapper() -> Mapper {
        Mapper::new(&MappingConfig::default())
    }

    fn record(id: &str, first: &str, last: &str, gender: &str, birth: &str, phone: &str) -> RawRecord {
        RawRecord::new(vec![
            ("Id".to_string(), id.to_string()),
            ("FirstName".to_string(), first.to_string()),
            ("LastName".to_string(), last.to_string()),
            ("Gender".to_string(), gender.to_string()),
            ("BirthDate".to_string(), birth.to_string()),
            ("Phone".to_string(), phone.to_string()),
        ])
    }

    #[test]
    fn test_map_complete_record() {
        let patient = mapper()
            .map(&record("A", "Wei", "Chen", "female", "1984-03-12", "555-0100"))
            .unwrap();

        assert_eq!(patient.legacy_id.as_str(), "A");
        assert_eq!(patient.given, "Wei");
        assert_eq!(patient.family, "Chen");
        assert_eq!(patient.gender, Gender::Female);
        assert_eq!(patient.birth_date, "1984-03-12");
        assert_eq!(patient.phone.as_deref(), Some("555-0100"));
        assert_eq!(patient.tags[0].code, "SUBSET");
    }

    #[test_case("id" ; "missing identifier")]
    #[test_case("first_name" ; "missing given name")]
    #[test_case("last_name" ; "missing family name")]
    #[test_case("birth_date" ; "missing birth date")]
    fn test_map_fails_on_missing_required(field: &str) {
        let raw = record("A", "Wei", "Chen", "female", "1984-03-12", "");
        let blanked = RawRecord::new(
            raw.columns()
                .iter()
                .map(|(col, val)| {
                    let normalized = col.to_lowercase().replace('_', "");
                    if normalized == field.replace('_', "") {
                        (col.clone(), String::new())
                    } else {
                        (col.clone(), val.clone())
                    }
                })
                .collect(),
        );

        let result = mapper().map(&blanked);
        assert_eq!(
            result.unwrap_err(),
            MappingError::MissingRequired {
                field: field.to_string()
            }
        );
    }

    #[test_case("male", Gender::Male)]
    #[test_case("Female", Gender::Female)]
    #[test_case("other", Gender::Unknown)]
    #[test_case("", Gender::Unknown)]
    fn test_map_gender_is_total(raw: &str, expected: Gender) {
        let patient = mapper()
            .map(&record("A", "Wei", "Chen", raw, "1984-03-12", ""))
            .unwrap();
        assert_eq!(patient.gender, expected);
    }

    #[test_case("12/03/1984" ; "wrong separator order")]
    #[test_case("1984-13-01" ; "month out of range")]
    #[test_case("1984-02-30" ; "day not in month")]
    #[test_case("not-a-date" ; "garbage")]
    fn test_map_rejects_invalid_birth_date(raw: &str) {
        let result = mapper().map(&record("A", "Wei", "Chen", "female", raw, ""));
        assert_eq!(
            result.unwrap_err(),
            MappingError::InvalidBirthDate {
                value: raw.to_string()
            }
        );
    }

    #[test]
    fn test_map_blank_phone_omitted() {
        let patient = mapper()
            .map(&record("A", "Wei", "Chen", "female", "1984-03-12", "   "))
            .unwrap();
        assert!(patient.phone.is_none());
    }

    #[test]
    fn test_map_decorates_names_when_enabled() {
        let config = MappingConfig {
            decorate_names: true,
            ..MappingConfig::default()
        };
        let patient = Mapper::new(&config)
            .map(&record("A", "Wei", "Chen", "female", "1984-03-12", ""))
            .unwrap();

        assert_eq!(patient.given, "Wei-Test");
        assert_eq!(patient.family, "Chen [TEST]");
    }

    #[test]
    fn test_map_all_partitions_failures() {
        let records = vec![
            record("A", "Wei", "Chen", "female", "1984-03-12", ""),
            record("B", "Omar", "Haddad", "male", "", ""),
            record("C", "Ana", "Silva", "female", "1990-07-01", ""),
        ];

        let (patients, errors) = mapper().map_all(&records);
        assert_eq!(patients.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, 2);
        assert_eq!(patients[0].legacy_id.as_str(), "A");
        assert_eq!(patients[1].legacy_id.as_str(), "C");
    }

    #[test]
    fn test_custom_provenance_tag() {
        let config = MappingConfig {
            provenance_tag: ProvenanceTagConfig {
                system: "http://example.org/tags".to_string(),
                code: "PIPELINE".to_string(),
                display: "Pipeline Data".to_string(),
            },
            ..MappingConfig::default()
        };
        let patient = Mapper::new(&config)
            .map(&record("A", "Wei", "Chen", "female", "1984-03-12", ""))
            .unwrap();
        assert_eq!(patient.tags[0].system, "http://example.org/tags");
        assert_eq!(patient.tags[0].code, "PIPELINE");
    }
}

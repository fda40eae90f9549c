//! CSV source reader
//!
//! Reads header-keyed legacy CSV files into ordered [`RawRecord`]s. Cell
//! values are passed through untouched; all interpretation happens in the
//! mapper.

use crate::domain::errors::MeridianError;
use crate::domain::patient::RawRecord;
use crate::domain::Result;
use std::path::Path;

/// CSV-backed record source
pub struct CsvSource;

impl CsvSource {
    /// Reads all records from a CSV file
    ///
    /// The first row is treated as the header. Rows shorter than the header
    /// keep only the columns they have; surplus cells are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`MeridianError::Source`] when the file cannot be opened or a
    /// row cannot be parsed.
    pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<RawRecord>> {
        let path = path.as_ref();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| {
                MeridianError::Source(format!("Failed to open {}: {}", path.display(), e))
            })?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| {
                MeridianError::Source(format!("Failed to read header of {}: {}", path.display(), e))
            })?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut records = Vec::new();
        for (row_index, row) in reader.records().enumerate() {
            let row = row.map_err(|e| {
                MeridianError::Source(format!(
                    "Failed to parse row {} of {}: {}",
                    row_index + 2,
                    path.display(),
                    e
                ))
            })?;

            let columns = headers
                .iter()
                .zip(row.iter())
                .map(|(header, value)| (header.clone(), value.to_string()))
                .collect();
            records.push(RawRecord::new(columns));
        }

        tracing::info!(
            path = %path.display(),
            count = records.len(),
            "Read records from CSV source"
        );

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_file_keeps_column_order() {
        let file = write_csv(
            "Id,FirstName,LastName,Gender,BirthDate,Phone\n\
             A,Wei,Chen,female,1984-03-12,555-0100\n\
             B,Omar,Haddad,male,1972-11-02,\n",
        );

        let records = CsvSource::read_file(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("id"), Some("A"));
        assert_eq!(records[0].get("first_name"), Some("Wei"));
        assert_eq!(records[1].get("phone"), Some(""));
        assert_eq!(records[0].columns()[0].0, "Id");
    }

    #[test]
    fn test_read_file_trims_whitespace() {
        let file = write_csv("Id,FirstName\n  A  ,  Wei \n");
        let records = CsvSource::read_file(file.path()).unwrap();
        assert_eq!(records[0].get("id"), Some("A"));
        assert_eq!(records[0].get("firstname"), Some("Wei"));
    }

    #[test]
    fn test_read_file_missing_is_fatal() {
        let result = CsvSource::read_file("does-not-exist.csv");
        assert!(matches!(result, Err(MeridianError::Source(_))));
    }
}

//! Raw event files as string records.

use anyhow::{Context, Result};
use hurricane_algo::RawRecord;
use hurricane_core::HurricaneError;
use std::path::Path;

/// Read a headed CSV file into one record per row, keyed by header.
///
/// A missing file is [`HurricaneError::NotFound`].
pub fn read_raw_csv(path: &Path) -> Result<Vec<RawRecord>> {
    if !path.exists() {
        return Err(HurricaneError::NotFound(format!("raw file {}", path.display())).into());
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening raw file {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("reading {} row {}", path.display(), line + 1))?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn rows_are_keyed_by_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("furto.csv");
        fs::write(
            &path,
            "ID, DATE,PERIOD,LATITUDE,LONGITUDE\n7,2023-05-14,NOITE,-22.9,-43.2\n8,2023-05-15,MANHA\n",
        )
        .unwrap();

        let rows = read_raw_csv(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["DATE"], "2023-05-14");
        assert_eq!(rows[0]["LONGITUDE"], "-43.2");
        assert!(!rows[1].contains_key("LATITUDE"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = read_raw_csv(Path::new("/nonexistent/raw.csv")).unwrap_err();
        assert!(err
            .downcast_ref::<HurricaneError>()
            .is_some_and(HurricaneError::is_not_found));
    }
}

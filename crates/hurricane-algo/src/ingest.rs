//! Normalizing raw event extracts into merge candidates.

use chrono::{NaiveDate, NaiveDateTime};
use hurricane_core::geodesy::{round_to, COORD_PRECISION};
use hurricane_core::{EventCandidate, HurricaneError, HurricaneResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// One raw row: column name to text value. Empty text counts as missing.
pub type RawRecord = BTreeMap<String, String>;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M"];

/// Declaration of one raw event source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceSpec {
    /// Source name; also the category label of its events.
    pub name: String,
    /// Columns whose values, joined with `|`, form the natural key.
    pub key_columns: Vec<String>,
    #[serde(default = "default_date_column")]
    pub date_column: String,
    #[serde(default = "default_period_column")]
    pub period_column: String,
    #[serde(default = "default_latitude_column")]
    pub latitude_column: String,
    #[serde(default = "default_longitude_column")]
    pub longitude_column: String,
    /// Extra columns carried into the ledger and the fact table.
    #[serde(default)]
    pub feature_columns: Vec<String>,
}

fn default_date_column() -> String {
    "DATE".to_string()
}
fn default_period_column() -> String {
    "PERIOD".to_string()
}
fn default_latitude_column() -> String {
    "LATITUDE".to_string()
}
fn default_longitude_column() -> String {
    "LONGITUDE".to_string()
}

impl InterfaceSpec {
    pub fn new(name: impl Into<String>, key_columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            key_columns,
            date_column: default_date_column(),
            period_column: default_period_column(),
            latitude_column: default_latitude_column(),
            longitude_column: default_longitude_column(),
            feature_columns: Vec::new(),
        }
    }

    pub fn validate(&self) -> HurricaneResult<()> {
        if self.name.trim().is_empty() {
            return Err(HurricaneError::Validation("interface name is empty".into()));
        }
        if self.key_columns.is_empty() {
            return Err(HurricaneError::Validation(format!(
                "interface '{}' declares no key columns",
                self.name
            )));
        }
        Ok(())
    }
}

/// Normalized rows of one interface batch.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub rows: Vec<EventCandidate>,
    /// Rows missing a required field.
    pub dropped: usize,
    /// Rows shadowed by a later row with the same key.
    pub duplicates: usize,
}

/// Turn raw rows of `spec` into merge candidates.
///
/// Rows missing date, period, latitude or longitude are dropped.
/// Coordinates are rounded to 7 decimals, the natural key is built from the
/// key columns and only the last row of every key is kept. A present value
/// that does not parse is a [`HurricaneError::Conversion`] error for the
/// whole batch.
pub fn normalize_interface(
    spec: &InterfaceSpec,
    rows: Vec<RawRecord>,
) -> HurricaneResult<NormalizedBatch> {
    spec.validate()?;
    let total = rows.len();
    let mut parsed = Vec::with_capacity(total);
    for (index, row) in rows.iter().enumerate() {
        let field = |column: &str| row.get(column).map(|v| v.trim()).filter(|v| !v.is_empty());
        let (Some(date), Some(period), Some(lat), Some(lon)) = (
            field(&spec.date_column),
            field(&spec.period_column),
            field(&spec.latitude_column),
            field(&spec.longitude_column),
        ) else {
            continue;
        };

        let context = |what: &str, value: &str| {
            HurricaneError::Conversion(format!(
                "{} row {}: {what} '{value}' cannot be parsed",
                spec.name,
                index + 1
            ))
        };
        let date = parse_date(date).ok_or_else(|| context("date", date))?;
        let latitude = parse_degrees(lat).ok_or_else(|| context("latitude", lat))?;
        let longitude = parse_degrees(lon).ok_or_else(|| context("longitude", lon))?;

        let key = spec
            .key_columns
            .iter()
            .map(|column| field(column).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("|");
        let features = spec
            .feature_columns
            .iter()
            .map(|column| (column.clone(), field(column).unwrap_or_default().to_string()))
            .collect();

        parsed.push(EventCandidate {
            key,
            date: Some(date),
            period: Some(period.to_string()),
            latitude: Some(round_to(latitude, COORD_PRECISION)),
            longitude: Some(round_to(longitude, COORD_PRECISION)),
            category: spec.name.clone(),
            features,
        });
    }

    let dropped = total - parsed.len();
    let mut last: HashMap<String, usize> = HashMap::with_capacity(parsed.len());
    for (index, row) in parsed.iter().enumerate() {
        last.insert(row.key.clone(), index);
    }
    let kept: Vec<EventCandidate> = parsed
        .into_iter()
        .enumerate()
        .filter(|(index, row)| last.get(&row.key) == Some(index))
        .map(|(_, row)| row)
        .collect();
    let duplicates = total - dropped - kept.len();

    debug!(
        interface = %spec.name,
        rows = total,
        kept = kept.len(),
        dropped,
        duplicates,
        "normalized interface batch"
    );
    Ok(NormalizedBatch {
        rows: kept,
        dropped,
        duplicates,
    })
}

/// Parse a calendar date, accepting ISO dates, `dd/mm/yyyy` and timestamps.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|dt| dt.date())
        })
}

/// Parse decimal degrees; a lone comma is read as the decimal separator.
fn parse_degrees(text: &str) -> Option<f64> {
    let value = if !text.contains('.') && text.matches(',').count() == 1 {
        text.replace(',', ".").parse::<f64>().ok()?
    } else {
        text.parse::<f64>().ok()?
    };
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> InterfaceSpec {
        let mut spec = InterfaceSpec::new("roubo", vec!["ID".into(), "SEQ".into()]);
        spec.feature_columns = vec!["WEAPON".into()];
        spec
    }

    fn raw(pairs: &[(&str, &str)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full(id: &str, lat: &str) -> RawRecord {
        raw(&[
            ("ID", id),
            ("SEQ", "1"),
            ("DATE", "2021-05-03"),
            ("PERIOD", "Noite"),
            ("LATITUDE", lat),
            ("LONGITUDE", "-43.123456789"),
            ("WEAPON", "faca"),
        ])
    }

    #[test]
    fn builds_key_category_and_rounds() {
        let batch = normalize_interface(&spec(), vec![full("77", "-22.9")]).unwrap();
        let row = &batch.rows[0];
        assert_eq!(row.key, "77|1");
        assert_eq!(row.category, "roubo");
        assert_eq!(row.longitude, Some(-43.1234568));
        assert_eq!(row.features["WEAPON"], "faca");
    }

    #[test]
    fn rows_missing_required_fields_are_dropped() {
        let mut missing = full("1", "-22.9");
        missing.insert("PERIOD".into(), "  ".into());
        let batch = normalize_interface(&spec(), vec![missing, full("2", "-22.9")]).unwrap();
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.dropped, 1);
    }

    #[test]
    fn later_rows_win_on_duplicate_keys() {
        let batch =
            normalize_interface(&spec(), vec![full("1", "-22.9"), full("1", "-22.8")]).unwrap();
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.rows[0].latitude, Some(-22.8));
        assert_eq!(batch.duplicates, 1);
    }

    #[test]
    fn unparsable_value_fails_the_batch() {
        let err = normalize_interface(&spec(), vec![full("1", "south")]).unwrap_err();
        assert!(matches!(err, HurricaneError::Conversion(_)));
    }

    #[test]
    fn date_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 5, 3);
        assert_eq!(parse_date("2021-05-03"), expected);
        assert_eq!(parse_date("03/05/2021"), expected);
        assert_eq!(parse_date("2021-05-03 22:10:00"), expected);
        assert_eq!(parse_date("May 3rd"), None);
        assert_eq!(parse_degrees("-22,95"), Some(-22.95));
    }

    #[test]
    fn spec_without_keys_is_invalid() {
        let spec = InterfaceSpec::new("furto", Vec::new());
        assert!(matches!(
            normalize_interface(&spec, Vec::new()),
            Err(HurricaneError::Validation(_))
        ));
    }
}

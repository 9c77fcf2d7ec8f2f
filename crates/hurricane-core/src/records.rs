//! Records that live next to the street network: region polygons, time
//! buckets, geocoded events and the historic markers of network generations.

use crate::{RegionId, SegmentId, TimeId};
use chrono::{Datelike, NaiveDate};
use geo_types::{Coord, MultiPolygon};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weekday labels, Monday first, as stored in the time ledger.
pub const WEEKDAYS: [&str; 7] = [
    "Segunda-Feira",
    "Terça-Feira",
    "Quarta-Feira",
    "Quinta-Feira",
    "Sexta-Feira",
    "Sábado",
    "Domingo",
];

/// An administrative polygon (zone, district or neighborhood).
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPolygon {
    pub id: RegionId,
    pub geometry: MultiPolygon<f64>,
    /// Lower value wins when zones overlap.
    pub priority: Option<i64>,
    pub name: String,
    pub active: bool,
}

/// The `(period, weekday, day, month, year)` tuple a time bucket stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeKey {
    pub period: String,
    pub weekday: String,
    pub day: u32,
    pub month: u32,
    pub year: i32,
}

impl TimeKey {
    pub fn from_event(period: &str, date: NaiveDate) -> Self {
        Self {
            period: period.to_string(),
            weekday: WEEKDAYS[date.weekday().num_days_from_monday() as usize].to_string(),
            day: date.day(),
            month: date.month(),
            year: date.year(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBucket {
    pub id: TimeId,
    #[serde(flatten)]
    pub key: TimeKey,
}

/// A freshly extracted event row; any required field may still be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCandidate {
    pub key: String,
    pub date: Option<NaiveDate>,
    pub period: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub category: String,
    pub features: BTreeMap<String, String>,
}

impl EventCandidate {
    /// Promote to an [`EventRecord`] when every required field is present.
    pub fn complete(self) -> Option<EventRecord> {
        let period = self.period.filter(|p| !p.is_empty())?;
        Some(EventRecord {
            key: self.key,
            date: self.date?,
            period,
            latitude: self.latitude.filter(|v| v.is_finite())?,
            longitude: self.longitude.filter(|v| v.is_finite())?,
            category: self.category,
            segment_id: None,
            features: self.features,
        })
    }
}

/// A geocoded event as kept in a partition ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub key: String,
    pub date: NaiveDate,
    pub period: String,
    pub latitude: f64,
    pub longitude: f64,
    pub category: String,
    pub segment_id: Option<SegmentId>,
    pub features: BTreeMap<String, String>,
}

/// Field set two ledger rows are compared on when diffing a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComparableFields {
    key: String,
    date: NaiveDate,
    period: String,
    latitude_bits: u64,
    longitude_bits: u64,
    category: String,
}

impl EventRecord {
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }

    pub fn time_key(&self) -> TimeKey {
        TimeKey::from_event(&self.period, self.date)
    }

    pub fn comparable(&self) -> ComparableFields {
        ComparableFields {
            key: self.key.clone(),
            date: self.date,
            period: self.period.clone(),
            latitude_bits: self.latitude.to_bits(),
            longitude_bits: self.longitude.to_bits(),
            category: self.category.clone(),
        }
    }
}

/// One completed network rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HistoricMarker {
    pub date: NaiveDate,
}

impl HistoricMarker {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    /// Directory suffix used when a generation is archived.
    pub fn label(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

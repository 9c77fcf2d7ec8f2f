//! Column layouts of every persisted table and their DataFrame codecs.
//!
//! All integer columns are stored as `Int64`, dates as `YYYY-MM-DD` text.
//!
//! | Table | Columns |
//! |-------|---------|
//! | `vertex` | id, point (WKT), longitude, latitude, zone_id, district_id, neighborhood_id |
//! | `segment` | id, oneway, name[], road_type[], start_vertex_id, end_vertex_id, length |
//! | events | key, date, period, latitude, longitude, category, segment_id, features… |
//! | `time` | id, period, weekday, day, month, year |
//! | markers | historic_date |
//! | fact | time_id, segment_id, features…, one count column per category |

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use geo_types::coord;
use hurricane_algo::{FactRow, FactTable};
use hurricane_core::geodesy::float_text;
use hurricane_core::{
    EventCandidate, EventRecord, HistoricMarker, HurricaneError, RegionId, Segment,
    SegmentId, TimeBucket, TimeId, TimeKey, Vertex, VertexId,
};
use polars::prelude::{
    BooleanChunked, DataFrame, DataType, Float64Chunked, Int64Chunked, IntoSeries, ListChunked,
    NamedFrom, Series, Utf8Chunked,
};
use std::collections::BTreeMap;

const DATE_FORMAT: &str = "%Y-%m-%d";

const EVENT_COLUMNS: [&str; 7] = [
    "key",
    "date",
    "period",
    "latitude",
    "longitude",
    "category",
    "segment_id",
];

fn int_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Int64Chunked> {
    df.column(name)
        .with_context(|| format!("missing '{name}' column"))?
        .i64()
        .with_context(|| format!("'{name}' column must be Int64"))
}

fn float_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Float64Chunked> {
    df.column(name)
        .with_context(|| format!("missing '{name}' column"))?
        .f64()
        .with_context(|| format!("'{name}' column must be Float64"))
}

fn text_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Utf8Chunked> {
    df.column(name)
        .with_context(|| format!("missing '{name}' column"))?
        .utf8()
        .with_context(|| format!("'{name}' column must be Utf8"))
}

fn bool_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a BooleanChunked> {
    df.column(name)
        .with_context(|| format!("missing '{name}' column"))?
        .bool()
        .with_context(|| format!("'{name}' column must be Boolean"))
}

fn required<T>(value: Option<T>, column: &str, row: usize) -> Result<T> {
    value.with_context(|| format!("null '{column}' at row {row}"))
}

fn to_index(value: i64, column: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| HurricaneError::Conversion(format!("negative {column}: {value}")).into())
}

fn parse_stored_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| HurricaneError::Conversion(format!("bad date '{text}': {e}")).into())
}

fn text_list(name: &str, rows: impl Iterator<Item = Vec<String>>) -> Series {
    let mut series =
        ListChunked::from_iter(rows.map(|values| Series::new("", values.as_slice()))).into_series();
    series.rename(name);
    series
}

fn read_text_list(df: &DataFrame, name: &str) -> Result<Vec<Vec<String>>> {
    let column = df
        .column(name)
        .with_context(|| format!("missing '{name}' column"))?
        .list()
        .with_context(|| format!("'{name}' column must be a list"))?;
    let mut out = Vec::with_capacity(column.len());
    for value in column.into_iter() {
        let values = match value {
            Some(series) => series
                .utf8()
                .with_context(|| format!("'{name}' items must be Utf8"))?
                .into_iter()
                .flatten()
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        };
        out.push(values);
    }
    Ok(out)
}

pub fn vertex_frame(vertices: &[Vertex]) -> Result<DataFrame> {
    let point: Vec<String> = vertices
        .iter()
        .map(|v| format!("POINT ({} {})", float_text(v.coord.x), float_text(v.coord.y)))
        .collect();
    let df = DataFrame::new(vec![
        Series::new(
            "id",
            vertices.iter().map(|v| v.id.value() as i64).collect::<Vec<_>>(),
        ),
        Series::new("point", point),
        Series::new(
            "longitude",
            vertices.iter().map(|v| v.coord.x).collect::<Vec<_>>(),
        ),
        Series::new(
            "latitude",
            vertices.iter().map(|v| v.coord.y).collect::<Vec<_>>(),
        ),
        Series::new(
            "zone_id",
            vertices.iter().map(|v| v.zone_id.value()).collect::<Vec<_>>(),
        ),
        Series::new(
            "district_id",
            vertices
                .iter()
                .map(|v| v.district_id.value())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "neighborhood_id",
            vertices
                .iter()
                .map(|v| v.neighborhood_id.value())
                .collect::<Vec<_>>(),
        ),
    ])?;
    Ok(df)
}

pub fn vertices_from_frame(df: &DataFrame) -> Result<Vec<Vertex>> {
    let id = int_column(df, "id")?;
    let lon = float_column(df, "longitude")?;
    let lat = float_column(df, "latitude")?;
    let zone = int_column(df, "zone_id")?;
    let district = int_column(df, "district_id")?;
    let neighborhood = int_column(df, "neighborhood_id")?;

    let mut vertices = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let mut vertex = Vertex::new(
            VertexId::new(to_index(required(id.get(row), "id", row)?, "vertex id")?),
            coord! {
                x: required(lon.get(row), "longitude", row)?,
                y: required(lat.get(row), "latitude", row)?,
            },
        );
        vertex.zone_id = RegionId::new(zone.get(row).unwrap_or(0));
        vertex.district_id = RegionId::new(district.get(row).unwrap_or(0));
        vertex.neighborhood_id = RegionId::new(neighborhood.get(row).unwrap_or(0));
        vertices.push(vertex);
    }
    Ok(vertices)
}

pub fn segment_frame(segments: &[Segment]) -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Series::new(
            "id",
            segments.iter().map(|s| s.id.value() as i64).collect::<Vec<_>>(),
        ),
        Series::new(
            "oneway",
            segments.iter().map(|s| s.oneway).collect::<Vec<_>>(),
        ),
        text_list("name", segments.iter().map(|s| s.name.clone())),
        text_list("road_type", segments.iter().map(|s| s.road_type.clone())),
        Series::new(
            "start_vertex_id",
            segments
                .iter()
                .map(|s| s.start.value() as i64)
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "end_vertex_id",
            segments
                .iter()
                .map(|s| s.end.value() as i64)
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "length",
            segments.iter().map(|s| s.length_m).collect::<Vec<_>>(),
        ),
    ])?;
    Ok(df)
}

pub fn segments_from_frame(df: &DataFrame) -> Result<Vec<Segment>> {
    let id = int_column(df, "id")?;
    let oneway = bool_column(df, "oneway")?;
    let start = int_column(df, "start_vertex_id")?;
    let end = int_column(df, "end_vertex_id")?;
    let length = float_column(df, "length")?;
    let names = read_text_list(df, "name")?;
    let road_types = read_text_list(df, "road_type")?;

    let mut segments = Vec::with_capacity(df.height());
    for (row, (name, road_type)) in names.into_iter().zip(road_types).enumerate() {
        segments.push(Segment {
            id: SegmentId::new(to_index(required(id.get(row), "id", row)?, "segment id")?),
            oneway: oneway.get(row).unwrap_or(false),
            name,
            road_type,
            start: VertexId::new(to_index(
                required(start.get(row), "start_vertex_id", row)?,
                "vertex id",
            )?),
            end: VertexId::new(to_index(
                required(end.get(row), "end_vertex_id", row)?,
                "vertex id",
            )?),
            length_m: required(length.get(row), "length", row)?,
        });
    }
    Ok(segments)
}

fn feature_series<'a>(
    feature_columns: &[String],
    rows: impl Iterator<Item = &'a BTreeMap<String, String>> + Clone,
) -> Vec<Series> {
    feature_columns
        .iter()
        .map(|column| {
            let values: Vec<Option<String>> = rows
                .clone()
                .map(|features| features.get(column).cloned())
                .collect();
            Series::new(column, values)
        })
        .collect()
}

/// Feature columns are every text column beyond the fixed event columns.
fn event_feature_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .filter(|name| !EVENT_COLUMNS.contains(name))
        .map(str::to_string)
        .collect()
}

fn read_features(df: &DataFrame) -> Result<Vec<BTreeMap<String, String>>> {
    let mut rows = vec![BTreeMap::new(); df.height()];
    for name in event_feature_columns(df) {
        let column = text_column(df, &name)?;
        for (row, value) in column.into_iter().enumerate() {
            if let Some(value) = value {
                rows[row].insert(name.clone(), value.to_string());
            }
        }
    }
    Ok(rows)
}

/// Enriched event ledger rows of one partition.
pub fn event_frame(events: &[EventRecord], feature_columns: &[String]) -> Result<DataFrame> {
    let mut columns = vec![
        Series::new(
            "key",
            events.iter().map(|e| e.key.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "date",
            events
                .iter()
                .map(|e| e.date.format(DATE_FORMAT).to_string())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "period",
            events.iter().map(|e| e.period.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "latitude",
            events.iter().map(|e| e.latitude).collect::<Vec<_>>(),
        ),
        Series::new(
            "longitude",
            events.iter().map(|e| e.longitude).collect::<Vec<_>>(),
        ),
        Series::new(
            "category",
            events.iter().map(|e| e.category.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "segment_id",
            events
                .iter()
                .map(|e| e.segment_id.map(|id| id.value() as i64))
                .collect::<Vec<_>>(),
        ),
    ];
    columns.extend(feature_series(
        feature_columns,
        events.iter().map(|e| &e.features),
    ));
    Ok(DataFrame::new(columns)?)
}

pub fn events_from_frame(df: &DataFrame) -> Result<Vec<EventRecord>> {
    let key = text_column(df, "key")?;
    let date = text_column(df, "date")?;
    let period = text_column(df, "period")?;
    let lat = float_column(df, "latitude")?;
    let lon = float_column(df, "longitude")?;
    let category = text_column(df, "category")?;
    let segment = int_column(df, "segment_id")?;
    let features = read_features(df)?;

    let mut events = Vec::with_capacity(df.height());
    for (row, features) in features.into_iter().enumerate() {
        let segment_id = match segment.get(row) {
            Some(value) => Some(SegmentId::new(to_index(value, "segment id")?)),
            None => None,
        };
        events.push(EventRecord {
            key: required(key.get(row), "key", row)?.to_string(),
            date: parse_stored_date(required(date.get(row), "date", row)?)?,
            period: required(period.get(row), "period", row)?.to_string(),
            latitude: required(lat.get(row), "latitude", row)?,
            longitude: required(lon.get(row), "longitude", row)?,
            category: required(category.get(row), "category", row)?.to_string(),
            segment_id,
            features,
        });
    }
    Ok(events)
}

/// Normalized raw batch of one interface. Nulls are kept; completeness is
/// checked at merge time.
pub fn candidate_frame(rows: &[EventCandidate], feature_columns: &[String]) -> Result<DataFrame> {
    let mut columns = vec![
        Series::new("key", rows.iter().map(|e| e.key.as_str()).collect::<Vec<_>>()),
        Series::new(
            "date",
            rows.iter()
                .map(|e| e.date.map(|d| d.format(DATE_FORMAT).to_string()))
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "period",
            rows.iter().map(|e| e.period.clone()).collect::<Vec<_>>(),
        ),
        Series::new("latitude", rows.iter().map(|e| e.latitude).collect::<Vec<_>>()),
        Series::new(
            "longitude",
            rows.iter().map(|e| e.longitude).collect::<Vec<_>>(),
        ),
        Series::new(
            "category",
            rows.iter().map(|e| e.category.as_str()).collect::<Vec<_>>(),
        ),
    ];
    columns.extend(feature_series(feature_columns, rows.iter().map(|e| &e.features)));
    Ok(DataFrame::new(columns)?)
}

pub fn candidates_from_frame(df: &DataFrame) -> Result<Vec<EventCandidate>> {
    let key = text_column(df, "key")?;
    let date = text_column(df, "date")?;
    let period = text_column(df, "period")?;
    let lat = float_column(df, "latitude")?;
    let lon = float_column(df, "longitude")?;
    let category = text_column(df, "category")?;
    let features = read_features(df)?;

    let mut rows = Vec::with_capacity(df.height());
    for (row, features) in features.into_iter().enumerate() {
        let date = match date.get(row) {
            Some(text) => Some(parse_stored_date(text)?),
            None => None,
        };
        rows.push(EventCandidate {
            key: required(key.get(row), "key", row)?.to_string(),
            date,
            period: period.get(row).map(str::to_string),
            latitude: lat.get(row),
            longitude: lon.get(row),
            category: required(category.get(row), "category", row)?.to_string(),
            features,
        });
    }
    Ok(rows)
}

pub fn time_frame(ledger: &[TimeBucket]) -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Series::new(
            "id",
            ledger.iter().map(|b| b.id.value() as i64).collect::<Vec<_>>(),
        ),
        Series::new(
            "period",
            ledger
                .iter()
                .map(|b| b.key.period.as_str())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "weekday",
            ledger
                .iter()
                .map(|b| b.key.weekday.as_str())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "day",
            ledger.iter().map(|b| b.key.day as i64).collect::<Vec<_>>(),
        ),
        Series::new(
            "month",
            ledger.iter().map(|b| b.key.month as i64).collect::<Vec<_>>(),
        ),
        Series::new(
            "year",
            ledger.iter().map(|b| b.key.year as i64).collect::<Vec<_>>(),
        ),
    ])?;
    Ok(df)
}

pub fn time_from_frame(df: &DataFrame) -> Result<Vec<TimeBucket>> {
    let id = int_column(df, "id")?;
    let period = text_column(df, "period")?;
    let weekday = text_column(df, "weekday")?;
    let day = int_column(df, "day")?;
    let month = int_column(df, "month")?;
    let year = int_column(df, "year")?;

    let mut ledger = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let raw_id = required(id.get(row), "id", row)?;
        let id = u64::try_from(raw_id)
            .map_err(|_| HurricaneError::Conversion(format!("negative time id: {raw_id}")))?;
        ledger.push(TimeBucket {
            id: TimeId::new(id),
            key: TimeKey {
                period: required(period.get(row), "period", row)?.to_string(),
                weekday: required(weekday.get(row), "weekday", row)?.to_string(),
                day: required(day.get(row), "day", row)? as u32,
                month: required(month.get(row), "month", row)? as u32,
                year: required(year.get(row), "year", row)? as i32,
            },
        });
    }
    Ok(ledger)
}

pub fn marker_frame(markers: &[HistoricMarker]) -> Result<DataFrame> {
    let df = DataFrame::new(vec![Series::new(
        "historic_date",
        markers.iter().map(HistoricMarker::label).collect::<Vec<_>>(),
    )])?;
    Ok(df)
}

pub fn markers_from_frame(df: &DataFrame) -> Result<Vec<HistoricMarker>> {
    let column = text_column(df, "historic_date")?;
    column
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let text = required(value, "historic_date", row)?;
            Ok(HistoricMarker::new(parse_stored_date(text)?))
        })
        .collect()
}

pub fn fact_frame(table: &FactTable) -> Result<DataFrame> {
    let mut columns = vec![
        Series::new(
            "time_id",
            table
                .rows
                .iter()
                .map(|r| r.time_id.value() as i64)
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "segment_id",
            table
                .rows
                .iter()
                .map(|r| r.segment_id.value() as i64)
                .collect::<Vec<_>>(),
        ),
    ];
    for (index, name) in table.feature_columns.iter().enumerate() {
        let values: Vec<&str> = table
            .rows
            .iter()
            .map(|r| r.features[index].as_str())
            .collect();
        columns.push(Series::new(name, values));
    }
    for (index, name) in table.categories.iter().enumerate() {
        let counts: Vec<i64> = table.rows.iter().map(|r| r.counts[index] as i64).collect();
        columns.push(Series::new(name, counts));
    }
    Ok(DataFrame::new(columns)?)
}

/// Text columns after the ids are features, integer columns are categories.
pub fn fact_from_frame(df: &DataFrame) -> Result<FactTable> {
    let time_id = int_column(df, "time_id")?;
    let segment_id = int_column(df, "segment_id")?;

    let mut feature_columns = Vec::new();
    let mut categories = Vec::new();
    for series in df.get_columns() {
        let name = series.name();
        if name == "time_id" || name == "segment_id" {
            continue;
        }
        match series.dtype() {
            DataType::Utf8 => feature_columns.push(name.to_string()),
            DataType::Int64 => categories.push(name.to_string()),
            other => bail!("unexpected fact column '{name}' of type {other}"),
        }
    }

    let feature_data = feature_columns
        .iter()
        .map(|name| text_column(df, name))
        .collect::<Result<Vec<_>>>()?;
    let count_data = categories
        .iter()
        .map(|name| int_column(df, name))
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let raw_time = required(time_id.get(row), "time_id", row)?;
        rows.push(FactRow {
            time_id: TimeId::new(
                u64::try_from(raw_time)
                    .map_err(|_| HurricaneError::Conversion(format!("negative time id: {raw_time}")))?,
            ),
            segment_id: SegmentId::new(to_index(
                required(segment_id.get(row), "segment_id", row)?,
                "segment id",
            )?),
            features: feature_data
                .iter()
                .map(|column| column.get(row).unwrap_or_default().to_string())
                .collect(),
            counts: count_data
                .iter()
                .map(|column| column.get(row).unwrap_or(0).max(0) as u64)
                .collect(),
        });
    }

    Ok(FactTable {
        feature_columns,
        categories,
        rows,
    })
}

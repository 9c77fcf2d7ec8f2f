//! Raw map source boundary.
//!
//! A map source turns a list of places into the ordered raw edge list the
//! network builder consumes. [`JsonEdgeFile`] serves edges from a JSON file
//! keyed by place label:
//!
//! ```json
//! {
//!   "Niterói, RJ, Brazil": [
//!     { "geometry": [[-43.1, -22.9], [-43.099, -22.9]], "oneway": false,
//!       "name": "Rua A", "highway": ["residential", "service"] },
//!     { "geometry": "LINESTRING(-43.1 -22.9, -43.1 -22.899)", "oneway": true,
//!       "name": null, "highway": "primary" }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use geo_types::{Coord, Geometry, LineString};
use hurricane_algo::RawEdge;
use hurricane_core::HurricaneError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;

/// A place the street network is extracted for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub city: String,
    pub state: String,
    pub country: String,
}

impl Place {
    pub fn new(city: impl Into<String>, state: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
            country: country.into(),
        }
    }

    /// `"<city>, <state>, <country>"`
    pub fn label(&self) -> String {
        format!("{}, {}, {}", self.city, self.state, self.country)
    }

    pub fn validate(&self) -> Result<(), HurricaneError> {
        for (field, value) in [
            ("city", &self.city),
            ("state", &self.state),
            ("country", &self.country),
        ] {
            if value.trim().is_empty() {
                return Err(HurricaneError::Validation(format!(
                    "place {field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Validate a place list: it must be non-empty and every place complete.
pub fn validate_places(places: &[Place]) -> Result<(), HurricaneError> {
    if places.is_empty() {
        return Err(HurricaneError::Validation("no place identifiers".into()));
    }
    places.iter().try_for_each(Place::validate)
}

pub trait MapSource {
    /// Raw edges of every place, in place order then source order.
    fn edges(&self, places: &[Place]) -> Result<Vec<RawEdge>>;

    /// Path of the backing file, when there is one.
    fn source_file(&self) -> Option<&Path> {
        None
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeometryField {
    Coords(Vec<[f64; 2]>),
    Wkt(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextField {
    One(String),
    Many(Vec<String>),
}

impl TextField {
    fn into_vec(field: Option<TextField>) -> Vec<String> {
        match field {
            Some(TextField::One(value)) => vec![value],
            Some(TextField::Many(values)) => values,
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EdgeRow {
    geometry: GeometryField,
    #[serde(default)]
    oneway: bool,
    #[serde(default)]
    name: Option<TextField>,
    #[serde(default)]
    highway: Option<TextField>,
}

impl EdgeRow {
    fn into_raw_edge(self) -> Result<RawEdge> {
        let geometry = match self.geometry {
            GeometryField::Coords(points) => LineString::from(
                points
                    .into_iter()
                    .map(|[x, y]| Coord { x, y })
                    .collect::<Vec<_>>(),
            ),
            GeometryField::Wkt(text) => parse_line_wkt(&text)?,
        };
        if geometry.0.len() < 2 {
            return Err(
                HurricaneError::Conversion("edge geometry needs at least two points".into()).into(),
            );
        }
        Ok(RawEdge {
            geometry,
            oneway: self.oneway,
            names: TextField::into_vec(self.name),
            road_types: TextField::into_vec(self.highway),
        })
    }
}

fn parse_line_wkt(text: &str) -> Result<LineString<f64>> {
    let parsed: wkt::Wkt<f64> = text
        .parse()
        .map_err(|e| HurricaneError::Parse(format!("invalid WKT: {e:?}")))?;
    let geometry: Geometry<f64> = parsed
        .try_into()
        .map_err(|e: wkt::conversion::Error| HurricaneError::Parse(format!("{e:?}")))?;
    match geometry {
        Geometry::LineString(line) => Ok(line),
        other => Err(HurricaneError::Conversion(format!(
            "edge geometry must be a LINESTRING, got {other:?}"
        ))
        .into()),
    }
}

/// Edges stored in a JSON document keyed by place label.
#[derive(Debug, Clone)]
pub struct JsonEdgeFile {
    path: PathBuf,
}

impl JsonEdgeFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MapSource for JsonEdgeFile {
    fn edges(&self, places: &[Place]) -> Result<Vec<RawEdge>> {
        validate_places(places)?;
        if !self.path.exists() {
            return Err(
                HurricaneError::NotFound(format!("map source {}", self.path.display())).into(),
            );
        }
        let file = File::open(&self.path)
            .with_context(|| format!("opening map source {}", self.path.display()))?;
        let mut by_place: BTreeMap<String, Vec<EdgeRow>> =
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("parsing map source {}", self.path.display()))?;

        let mut edges = Vec::new();
        for place in places {
            let label = place.label();
            let rows = by_place
                .remove(&label)
                .ok_or_else(|| HurricaneError::NotFound(format!("no edges for place '{label}'")))?;
            let count = rows.len();
            for (index, row) in rows.into_iter().enumerate() {
                edges.push(
                    row.into_raw_edge()
                        .with_context(|| format!("edge {index} of '{label}'"))?,
                );
            }
            info!(place = %label, edges = count, "map edges loaded");
        }
        Ok(edges)
    }

    fn source_file(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

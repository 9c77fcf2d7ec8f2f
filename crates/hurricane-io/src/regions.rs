//! Region polygon boundary.
//!
//! Region tables are CSV files with the columns `id`, `name`, `priority`,
//! `active` and `wkt` (a `POLYGON` or `MULTIPOLYGON` in lon/lat order).

use anyhow::{Context, Result};
use geo_types::{Geometry, MultiPolygon};
use hurricane_core::{HurricaneError, RegionId, RegionKind, RegionPolygon};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Read-only access to region polygons by kind.
pub trait RegionSource {
    /// Polygons of one kind. With `active_only` inactive rows are left out.
    fn polygons(&self, kind: RegionKind, active_only: bool) -> Result<Vec<RegionPolygon>>;
}

#[derive(Debug, Deserialize)]
struct RegionRow {
    id: i64,
    #[serde(default)]
    name: String,
    priority: Option<i64>,
    active: Option<bool>,
    wkt: String,
}

/// One CSV file per region kind.
#[derive(Debug, Clone, Default)]
pub struct CsvRegionSource {
    files: HashMap<RegionKind, PathBuf>,
}

impl CsvRegionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, kind: RegionKind, path: impl Into<PathBuf>) -> Self {
        self.files.insert(kind, path.into());
        self
    }
}

impl RegionSource for CsvRegionSource {
    fn polygons(&self, kind: RegionKind, active_only: bool) -> Result<Vec<RegionPolygon>> {
        let Some(path) = self.files.get(&kind) else {
            warn!(kind = kind.as_str(), "no region table configured");
            return Ok(Vec::new());
        };
        let polygons = read_region_csv(path)?;
        let total = polygons.len();
        let polygons: Vec<RegionPolygon> = polygons
            .into_iter()
            .filter(|p| !active_only || p.active)
            .collect();
        debug!(
            kind = kind.as_str(),
            total,
            kept = polygons.len(),
            "region polygons loaded"
        );
        Ok(polygons)
    }
}

/// Parse a `POLYGON` or `MULTIPOLYGON` WKT string.
pub fn parse_region_wkt(text: &str) -> Result<MultiPolygon<f64>> {
    let parsed: wkt::Wkt<f64> = text
        .parse()
        .map_err(|e| HurricaneError::Parse(format!("invalid WKT: {e:?}")))?;
    let geometry: Geometry<f64> = parsed
        .try_into()
        .map_err(|e: wkt::conversion::Error| HurricaneError::Parse(format!("{e:?}")))?;
    match geometry {
        Geometry::Polygon(polygon) => Ok(MultiPolygon(vec![polygon])),
        Geometry::MultiPolygon(multi) => Ok(multi),
        other => Err(HurricaneError::Conversion(format!(
            "region geometry must be a polygon, got {other:?}"
        ))
        .into()),
    }
}

pub fn read_region_csv(path: &Path) -> Result<Vec<RegionPolygon>> {
    if !path.exists() {
        return Err(HurricaneError::NotFound(format!("region table {}", path.display())).into());
    }
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening region table {}", path.display()))?;

    let mut polygons = Vec::new();
    for (line, row) in reader.deserialize::<RegionRow>().enumerate() {
        let row = row.with_context(|| format!("parsing {} row {}", path.display(), line + 1))?;
        let geometry = parse_region_wkt(&row.wkt)
            .with_context(|| format!("region {} in {}", row.id, path.display()))?;
        polygons.push(RegionPolygon {
            id: RegionId::new(row.id),
            geometry,
            priority: row.priority,
            name: row.name,
            active: row.active.unwrap_or(true),
        });
    }
    Ok(polygons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const ZONES: &str = "\
id,name,priority,active,wkt
1,Centro,2,true,\"POLYGON((-43.3 -23.0, -43.1 -23.0, -43.1 -22.8, -43.3 -22.8, -43.3 -23.0))\"
2,Norte,,false,\"MULTIPOLYGON(((0 0, 1 0, 1 1, 0 0)),((2 2, 3 2, 3 3, 2 2)))\"
";

    #[test]
    fn reads_polygons_and_filters_inactive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zones.csv");
        fs::write(&path, ZONES).unwrap();
        let source = CsvRegionSource::new().with_file(RegionKind::Zone, &path);

        let all = source.polygons(RegionKind::Zone, false).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].priority, Some(2));
        assert_eq!(all[1].priority, None);
        assert_eq!(all[1].geometry.0.len(), 2);

        let active = source.polygons(RegionKind::Zone, true).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Centro");
    }

    #[test]
    fn unconfigured_kind_is_empty() {
        let source = CsvRegionSource::new();
        assert!(source
            .polygons(RegionKind::District, true)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn missing_file_is_not_found() {
        let source = CsvRegionSource::new().with_file(RegionKind::Zone, "/nonexistent/zones.csv");
        let err = source.polygons(RegionKind::Zone, true).unwrap_err();
        assert!(err
            .downcast_ref::<HurricaneError>()
            .is_some_and(HurricaneError::is_not_found));
    }

    #[test]
    fn non_polygon_wkt_is_rejected() {
        assert!(parse_region_wkt("POINT(1 2)").is_err());
        assert!(parse_region_wkt("not wkt").is_err());
    }
}

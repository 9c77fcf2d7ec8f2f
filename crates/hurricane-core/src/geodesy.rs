//! Coordinate arithmetic shared by network construction and event location.
//!
//! Coordinates are `geo_types::Coord<f64>` with `x = longitude` and
//! `y = latitude`, in geographic degrees.

use crate::{HurricaneError, HurricaneResult};
use geo_types::Coord;

/// Mean Earth diameter used by the great-circle formula, in kilometers.
pub const EARTH_DIAMETER_KM: f64 = 12742.0;

/// Longitude offset applied to the last point of a degenerate (closed) pair.
pub const DEGENERATE_NUDGE: f64 = 1e-6;

/// Number of decimal digits coordinates are rounded to.
pub const COORD_PRECISION: u32 = 7;

/// Great-circle distance in kilometers between two (lat, lon) positions.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let p = std::f64::consts::PI / 180.0;
    let hav = 0.5 - ((lat2 - lat1) * p).cos() / 2.0
        + (lat1 * p).cos() * (lat2 * p).cos() * (1.0 - ((lon2 - lon1) * p).cos()) / 2.0;
    // clamp guards against tiny negative rounding for coincident points
    EARTH_DIAMETER_KM * hav.clamp(0.0, 1.0).sqrt().asin()
}

/// Great-circle distance in meters between two coordinates.
pub fn haversine_m(a: Coord<f64>, b: Coord<f64>) -> f64 {
    haversine_km(a.y, a.x, b.y, b.x) * 1000.0
}

/// Round half away from zero to `digits` decimals.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

/// Round both axes of a coordinate to [`COORD_PRECISION`] digits.
pub fn round_coord(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: round_to(coord.x, COORD_PRECISION),
        y: round_to(coord.y, COORD_PRECISION),
    }
}

/// Shortest round-trip decimal text of a float, always carrying a fractional
/// part (`-43.0`, never `-43`).
///
/// This text feeds both vertex keys and the longitude partition function, so
/// its shape must stay stable across releases.
pub fn float_text(value: f64) -> String {
    let text = format!("{value}");
    if value.is_finite() && !text.contains(['.', 'e', 'E']) {
        format!("{text}.0")
    } else {
        text
    }
}

/// Canonical textual key `"lon,lat"` so coincident points unify by value.
pub fn coord_key(coord: Coord<f64>) -> String {
    format!("{},{}", float_text(coord.x), float_text(coord.y))
}

/// Inverse of [`coord_key`].
pub fn parse_coord_key(key: &str) -> HurricaneResult<Coord<f64>> {
    let (lon, lat) = key
        .split_once(',')
        .ok_or_else(|| HurricaneError::Conversion(format!("malformed vertex key '{key}'")))?;
    let x = lon
        .trim()
        .parse::<f64>()
        .map_err(|e| HurricaneError::Conversion(format!("longitude in '{key}': {e}")))?;
    let y = lat
        .trim()
        .parse::<f64>()
        .map_err(|e| HurricaneError::Conversion(format!("latitude in '{key}': {e}")))?;
    Ok(Coord { x, y })
}

/// Planar distance from `point` to the infinite line through `p1` and `p2`:
/// `|cross(p2 - p1, p1 - point)| / |p2 - p1|`.
///
/// When both endpoints coincide the final longitude is nudged by
/// [`DEGENERATE_NUDGE`] so the direction vector is never zero.
pub fn perpendicular_distance(point: Coord<f64>, p1: Coord<f64>, p2: Coord<f64>) -> f64 {
    let p2 = if p1 == p2 {
        Coord {
            x: p2.x - DEGENERATE_NUDGE,
            y: p2.y,
        }
    } else {
        p2
    };
    let dir = p2 - p1;
    let offset = p1 - point;
    let cross = dir.x * offset.y - dir.y * offset.x;
    cross.abs() / dir.x.hypot(dir.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_matches_known_distance() {
        // two points in Rio de Janeiro roughly 2.9 km apart
        let d = haversine_km(-22.9711, -43.1822, -22.9868, -43.2045);
        assert!((d - 2.88).abs() < 0.1, "got {d}");
    }

    #[test]
    fn haversine_of_same_point_is_zero() {
        let c = Coord { x: -43.2, y: -22.9 };
        assert_eq!(haversine_m(c, c), 0.0);
    }

    #[test]
    fn float_text_keeps_fraction() {
        assert_eq!(float_text(-43.0), "-43.0");
        assert_eq!(float_text(-43.1729), "-43.1729");
        assert_eq!(float_text(0.1), "0.1");
    }

    #[test]
    fn coord_key_roundtrip() {
        let c = Coord {
            x: -43.1729001,
            y: -22.9068467,
        };
        let key = coord_key(c);
        assert_eq!(key, "-43.1729001,-22.9068467");
        assert_eq!(parse_coord_key(&key).unwrap(), c);
    }

    #[test]
    fn malformed_key_is_conversion_error() {
        assert!(matches!(
            parse_coord_key("nope"),
            Err(HurricaneError::Conversion(_))
        ));
    }

    #[test]
    fn round_to_seven_digits() {
        assert_eq!(round_to(-43.17290014, 7), -43.1729001);
        assert_eq!(round_to(1.23456785, 2), 1.23);
    }

    #[test]
    fn perpendicular_distance_to_horizontal_line() {
        let d = perpendicular_distance(
            Coord { x: 0.5, y: 2.0 },
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
        );
        assert!((d - 2.0).abs() < 1e-12);
    }

    #[test]
    fn perpendicular_distance_survives_coincident_endpoints() {
        let p = Coord { x: 1.0, y: 1.0 };
        let d = perpendicular_distance(Coord { x: 1.0, y: 2.0 }, p, p);
        assert!(d.is_finite());
    }
}

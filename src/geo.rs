use serde::{Deserialize, Serialize};

use crate::domain::Building;
use crate::error::{DirectoryError, Result};

/// Mean Earth radius in meters. Circle radii are meters as well, so the
/// haversine output and the query input stay in the same unit.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Rectangular query region given by two corner points, in decimal degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoxArea {
    pub lat1: f64,
    pub lon1: f64,
    pub lat2: f64,
    pub lon2: f64,
}

/// Circular query region: center point in decimal degrees, radius in meters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CircleArea {
    pub lat: f64,
    pub lon: f64,
    pub radius: f64,
}

/// A validated area query. Being a closed enum, an unsupported shape cannot
/// reach the filter; dispatch is an exhaustive match.
#[derive(Debug, Clone, Copy)]
pub enum Area {
    Box(BoxArea),
    Circle(CircleArea),
}

/// Great-circle distance in meters between two points in decimal degrees.
pub fn distance_wgs84(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1) = (lat1.to_radians(), lon1.to_radians());
    let (lat2, lon2) = (lat2.to_radians(), lon2.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

impl BoxArea {
    /// Containment as historically shipped: the point's offset from corner 1
    /// must not exceed the corner-to-corner span, per axis. This is NOT a
    /// conventional bounding-box test — a point past corner 1 on the far
    /// side still matches while the offset magnitude is within the span,
    /// and corner ordering is irrelevant. Kept literal for compatibility.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.lat1 - lat).abs() <= (self.lat1 - self.lat2).abs()
            && (self.lon1 - lon).abs() <= (self.lon1 - self.lon2).abs()
    }
}

impl CircleArea {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        distance_wgs84(lat, lon, self.lat, self.lon) <= self.radius
    }
}

/// Splits a stored "lat,lon" string into a decimal pair. Malformed values are
/// a data-integrity defect in the seeded rows; the error propagates instead
/// of the row being skipped.
pub fn parse_coordinates(raw: &str) -> Result<(f64, f64)> {
    let malformed = |reason: &str| DirectoryError::Coordinates {
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    let mut parts = raw.split(',');
    let lat = parts.next().ok_or_else(|| malformed("missing latitude"))?;
    let lon = parts.next().ok_or_else(|| malformed("missing longitude"))?;
    if parts.next().is_some() {
        return Err(malformed("more than two components"));
    }

    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| malformed("latitude is not a decimal number"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| malformed("longitude is not a decimal number"))?;

    Ok((lat, lon))
}

/// Filters buildings down to those whose parsed coordinates fall inside the
/// area. Fails fast on the first malformed coordinate string.
pub fn buildings_in_area(buildings: Vec<Building>, area: &Area) -> Result<Vec<Building>> {
    let mut matched = Vec::new();
    for building in buildings {
        let (lat, lon) = parse_coordinates(&building.coordinates)?;
        let inside = match area {
            Area::Box(b) => b.contains(lat, lon),
            Area::Circle(c) => c.contains(lat, lon),
        };
        if inside {
            matched.push(building);
        }
    }
    Ok(matched)
}

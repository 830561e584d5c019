//! Point locations and polygon geometries of org units.
//!
//! Coordinates are WGS84 longitude/latitude. Equality used when diffing is
//! tolerance-based ([`Point::same_as`], [`MultiPolygon::same_as`]) because
//! coordinates that went through an import/export round trip rarely compare
//! bit-for-bit.

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Absolute tolerance for coordinate comparison, in degrees.
pub const COORDINATE_TOLERANCE: f64 = 1e-9;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= COORDINATE_TOLERANCE
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
}

impl Point {
    /// Create a point, validating coordinate ranges.
    pub fn new(lon: f64, lat: f64) -> Result<Self, TypeError> {
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(TypeError::InvalidGeometry(format!(
                "coordinates out of range: ({lon}, {lat})"
            )));
        }
        Ok(Self { lon, lat, alt: None })
    }

    pub fn with_altitude(mut self, alt: f64) -> Self {
        self.alt = Some(alt);
        self
    }

    /// Tolerance-based equality. Altitude only counts when both sides have one.
    pub fn same_as(&self, other: &Point) -> bool {
        let alt_matches = match (self.alt, other.alt) {
            (Some(a), Some(b)) => close(a, b),
            _ => true,
        };
        close(self.lon, other.lon) && close(self.lat, other.lat) && alt_matches
    }
}

/// A linear ring of `[lon, lat]` positions.
pub type Ring = Vec<[f64; 2]>;

/// A polygon: an exterior ring followed by optional holes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub rings: Vec<Ring>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiPolygon {
    pub polygons: Vec<Polygon>,
}

impl MultiPolygon {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.iter().all(|p| p.rings.is_empty())
    }

    /// Tolerance-based, order-sensitive structural equality.
    pub fn same_as(&self, other: &MultiPolygon) -> bool {
        self.polygons.len() == other.polygons.len()
            && self
                .polygons
                .iter()
                .zip(&other.polygons)
                .all(|(a, b)| rings_match(&a.rings, &b.rings))
    }
}

fn rings_match(a: &[Ring], b: &[Ring]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(ra, rb)| {
            ra.len() == rb.len()
                && ra
                    .iter()
                    .zip(rb)
                    .all(|(pa, pb)| close(pa[0], pb[0]) && close(pa[1], pb[1]))
        })
}

/// Compare two optional locations.
pub fn same_location(a: Option<&Point>, b: Option<&Point>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_as(b),
        _ => false,
    }
}

/// Compare two optional shapes.
pub fn same_geometry(a: Option<&MultiPolygon>, b: Option<&MultiPolygon>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_as(b),
        _ => false,
    }
}

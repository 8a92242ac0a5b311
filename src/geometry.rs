//! Region of interest and footprint geometry.
//!
//! Coordinates are `[lon, lat]` pairs in degrees, the GeoJSON axis order the
//! platform speaks on both the query and the export side.

use geo::{BoundingRect, Centroid, LineString, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{PullError, Result};

/// A `[lon, lat]` vertex
pub type LonLat = [f64; 2];

/// Closed polygon ring bounding the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LonLat>", into = "Vec<LonLat>")]
pub struct Roi {
    ring: Vec<LonLat>,
}

impl Roi {
    /// Build a region from a closed ring of vertices.
    ///
    /// The ring needs at least four vertices (a triangle plus the closing
    /// vertex), the first and last vertex must coincide, and every vertex must
    /// be a valid longitude/latitude.
    pub fn new(ring: Vec<LonLat>) -> Result<Self> {
        if ring.len() < 4 {
            return Err(PullError::geometry(format!(
                "region needs at least 4 vertices, got {}",
                ring.len()
            )));
        }
        if ring.first() != ring.last() {
            return Err(PullError::geometry(
                "region ring must be closed (first vertex equals last)",
            ));
        }
        for [lon, lat] in &ring {
            if !lon.is_finite() || !(-180.0..=180.0).contains(lon) {
                return Err(PullError::geometry(format!(
                    "longitude {lon} outside [-180, 180]"
                )));
            }
            if !lat.is_finite() || !(-90.0..=90.0).contains(lat) {
                return Err(PullError::geometry(format!(
                    "latitude {lat} outside [-90, 90]"
                )));
            }
        }
        Ok(Self { ring })
    }

    /// Axis-aligned rectangle from `(west, south)` to `(east, north)`
    pub fn rectangle(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        Self::new(vec![
            [west, south],
            [east, south],
            [east, north],
            [west, north],
            [west, south],
        ])
    }

    pub fn vertices(&self) -> &[LonLat] {
        &self.ring
    }

    /// GeoJSON Polygon with this ring as its only (outer) ring
    pub fn to_geojson(&self) -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [self.ring],
        })
    }

    /// `(west, south, east, north)` bounds of the ring
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.to_polygon()
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
            .unwrap_or_default()
    }

    /// The region as a `geo` polygon (x = lon, y = lat)
    pub fn to_polygon(&self) -> Polygon<f64> {
        let exterior: LineString<f64> = self.ring.iter().map(|&[lon, lat]| (lon, lat)).collect();
        Polygon::new(exterior, vec![])
    }
}

impl TryFrom<Vec<LonLat>> for Roi {
    type Error = PullError;

    fn try_from(ring: Vec<LonLat>) -> Result<Self> {
        Self::new(ring)
    }
}

impl From<Roi> for Vec<LonLat> {
    fn from(roi: Roi) -> Self {
        roi.ring
    }
}

/// Centroid `(lon, lat)` of a GeoJSON Polygon or MultiPolygon footprint.
///
/// Planar, area-weighted. A footprint with zero area falls back to the
/// centroid of its outline.
pub fn centroid(geometry: &Value) -> Result<(f64, f64)> {
    let footprint: geojson::Geometry = serde_json::from_value(geometry.clone())
        .map_err(|e| PullError::geometry(format!("invalid footprint: {e}")))?;
    let footprint: geo::Geometry<f64> = footprint
        .try_into()
        .map_err(|e: geojson::Error| PullError::geometry(format!("invalid footprint: {e}")))?;

    let center = match &footprint {
        geo::Geometry::Polygon(polygon) => polygon.centroid(),
        geo::Geometry::MultiPolygon(polygons) => polygons.centroid(),
        _ => {
            let kind = geometry.get("type").and_then(Value::as_str).unwrap_or("?");
            return Err(PullError::geometry(format!(
                "unsupported footprint type {kind}"
            )));
        }
    };

    center
        .map(|point| (point.x(), point.y()))
        .ok_or_else(|| PullError::geometry("footprint has no vertices"))
}

//! GeoJSON FeatureCollection decoding and invariant checks.
//!
//! # Responsibilities
//! - Decode `Polygon` / `MultiPolygon` features (`[lon, lat]` positions)
//! - Require a unique string `properties.name` per feature
//! - Require closed rings of at least 4 positions within WGS84 bounds
//!
//! # Design Decisions
//! - Collects every violation across all features instead of stopping at the first
//! - Positions are swapped to (lat, lon) on the way in

use std::collections::HashSet;
use std::fmt;

use serde::Deserialize;

use crate::context::Coordinates;
use crate::geofence::polygon::{NamedPolygon, Polygon, Ring};

const MIN_RING_POSITIONS: usize = 4;

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
    #[serde(other)]
    Unsupported,
}

/// One invariant broken by one feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureViolation {
    /// Zero-based feature position in the collection.
    pub index: usize,
    pub name: Option<String>,
    pub problem: String,
}

impl fmt::Display for FeatureViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "feature #{} '{}': {}", self.index, name, self.problem),
            None => write!(f, "feature #{}: {}", self.index, self.problem),
        }
    }
}

/// Why a document could not be decoded at all.
#[derive(Debug)]
pub(crate) enum DecodeError {
    Json(serde_json::Error),
    NotACollection(String),
    Invalid(Vec<FeatureViolation>),
}

/// Decode and validate a FeatureCollection document.
pub(crate) fn decode(content: &str) -> Result<Vec<NamedPolygon>, DecodeError> {
    let collection: FeatureCollection = serde_json::from_str(content).map_err(DecodeError::Json)?;
    if collection.kind != "FeatureCollection" {
        return Err(DecodeError::NotACollection(collection.kind));
    }

    let mut polygons = Vec::with_capacity(collection.features.len());
    let mut violations = Vec::new();
    let mut names = HashSet::new();

    for (index, feature) in collection.features.into_iter().enumerate() {
        let name = feature
            .properties
            .as_ref()
            .and_then(|props| props.get("name"))
            .and_then(|value| value.as_str())
            .map(str::to_string);

        let mut report = |problem: String| {
            violations.push(FeatureViolation {
                index,
                name: name.clone(),
                problem,
            });
        };

        match &name {
            None => report("missing string property 'name'".to_string()),
            Some(n) if n.trim().is_empty() => report("empty name".to_string()),
            Some(n) if !names.insert(n.clone()) => report("duplicate name".to_string()),
            Some(_) => {}
        }

        let raw_parts = match feature.geometry {
            Some(Geometry::Polygon { coordinates }) => vec![coordinates],
            Some(Geometry::MultiPolygon { coordinates }) => coordinates,
            Some(Geometry::Unsupported) => {
                report("geometry must be Polygon or MultiPolygon".to_string());
                continue;
            }
            None => {
                report("missing geometry".to_string());
                continue;
            }
        };

        if raw_parts.is_empty() {
            report("geometry has no polygons".to_string());
            continue;
        }

        let mut parts = Vec::with_capacity(raw_parts.len());
        for (part_idx, raw_rings) in raw_parts.into_iter().enumerate() {
            if raw_rings.is_empty() {
                report(format!("polygon {} has no rings", part_idx));
                continue;
            }
            let mut rings = Vec::with_capacity(raw_rings.len());
            for (ring_idx, raw_ring) in raw_rings.into_iter().enumerate() {
                match build_ring(raw_ring) {
                    Ok(ring) => rings.push(ring),
                    Err(problem) => {
                        report(format!("polygon {} ring {}: {}", part_idx, ring_idx, problem))
                    }
                }
            }
            parts.push(Polygon::new(rings));
        }

        if let Some(name) = name {
            polygons.push(NamedPolygon { name, parts });
        }
    }

    if violations.is_empty() {
        Ok(polygons)
    } else {
        Err(DecodeError::Invalid(violations))
    }
}

fn build_ring(positions: Vec<Vec<f64>>) -> Result<Ring, String> {
    if positions.len() < MIN_RING_POSITIONS {
        return Err(format!(
            "{} positions, need at least {}",
            positions.len(),
            MIN_RING_POSITIONS
        ));
    }

    let mut points = Vec::with_capacity(positions.len());
    for (idx, position) in positions.iter().enumerate() {
        let (lon, lat) = match position.as_slice() {
            [lon, lat, ..] => (*lon, *lat),
            _ => return Err(format!("position {} has fewer than 2 values", idx)),
        };
        let point = Coordinates::new(lat, lon);
        if !point.is_valid() {
            return Err(format!("position {} (lon {}, lat {}) is out of range", idx, lon, lat));
        }
        points.push(point);
    }

    let ring = Ring::new(points);
    if !ring.is_closed() {
        return Err("ring is not closed".to_string());
    }
    Ok(ring)
}

//! Loaded, validated polygon set with match accounting.

use std::fs;
use std::path::Path;

use dashmap::DashMap;

use crate::context::Coordinates;
use crate::geofence::geojson::{self, DecodeError, FeatureViolation};
use crate::geofence::polygon::NamedPolygon;
use crate::observability::metrics;

/// Errors raised while loading a polygon set.
#[derive(Debug, thiserror::Error)]
pub enum GeofenceError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid GeoJSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: expected a FeatureCollection, found '{found}'")]
    NotACollection { path: String, found: String },

    #[error("{path}: {} invalid feature(s): {}", .violations.len(), join(.violations))]
    Invalid {
        path: String,
        violations: Vec<FeatureViolation>,
    },
}

fn join(violations: &[FeatureViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Immutable set of named polygons. Only the match counters change after load.
#[derive(Debug)]
pub struct PolygonIndex {
    source: String,
    polygons: Vec<NamedPolygon>,
    match_counts: DashMap<String, u64>,
}

impl PolygonIndex {
    /// Read and validate a GeoJSON FeatureCollection file.
    pub fn load(path: &Path) -> Result<Self, GeofenceError> {
        let source = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| GeofenceError::Io {
            path: source.clone(),
            source: e,
        })?;
        Self::from_geojson(&source, &content)
    }

    /// Validate an in-memory document. `source` labels errors and logs.
    pub fn from_geojson(source: &str, content: &str) -> Result<Self, GeofenceError> {
        let polygons = geojson::decode(content).map_err(|err| match err {
            DecodeError::Json(e) => GeofenceError::Json {
                path: source.to_string(),
                source: e,
            },
            DecodeError::NotACollection(found) => GeofenceError::NotACollection {
                path: source.to_string(),
                found,
            },
            DecodeError::Invalid(violations) => GeofenceError::Invalid {
                path: source.to_string(),
                violations,
            },
        })?;

        tracing::info!(source = %source, polygons = polygons.len(), "Loaded geofence polygons");

        Ok(Self {
            source: source.to_string(),
            polygons,
            match_counts: DashMap::new(),
        })
    }

    /// Names of every polygon containing the point, in file order.
    ///
    /// Each returned name has its match counter incremented once.
    pub fn matches(&self, point: Coordinates) -> Vec<String> {
        let matched: Vec<String> = self
            .polygons
            .iter()
            .filter(|polygon| polygon.contains(point))
            .map(|polygon| polygon.name.clone())
            .collect();

        for name in &matched {
            *self.match_counts.entry(name.clone()).or_insert(0) += 1;
            metrics::record_geofence_match(name);
        }

        matched
    }

    /// Times `name` has been returned by [`matches`](Self::matches).
    pub fn match_count(&self, name: &str) -> u64 {
        self.match_counts.get(name).map(|count| *count).unwrap_or(0)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.polygons.iter().map(|polygon| polygon.name.as_str())
    }

    pub fn polygons(&self) -> &[NamedPolygon] {
        &self.polygons
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

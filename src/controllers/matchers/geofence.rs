//! Geofence matcher.
//!
//! # Responsibilities
//! - Load and validate the polygon set at construction
//! - Match enrichment coordinates against it, listing every containing polygon
//! - Missing coordinates or an empty set are non-matching, never errors

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ControllerConfig;
use crate::context::{MatchVerdict, RequestContext};
use crate::controllers::settings::SettingsReader;
use crate::controllers::{BuildError, ControllerError, MatchController};
use crate::geofence::PolygonIndex;

pub struct GeofenceMatcher {
    name: String,
    index: Arc<PolygonIndex>,
}

impl GeofenceMatcher {
    pub const KIND: &'static str = "geofence";

    pub fn new(name: &str, index: Arc<PolygonIndex>) -> Self {
        Self {
            name: name.to_string(),
            index,
        }
    }

    pub fn from_config(config: &ControllerConfig) -> Result<Self, BuildError> {
        let path = SettingsReader::new(config).required_path("path")?;
        let index = PolygonIndex::load(&path).map_err(|source| BuildError::Geofence {
            controller: config.name.clone(),
            source,
        })?;
        Ok(Self::new(&config.name, Arc::new(index)))
    }

    pub fn index(&self) -> &Arc<PolygonIndex> {
        &self.index
    }
}

#[async_trait]
impl MatchController for GeofenceMatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    async fn evaluate(
        &self,
        ctx: &RequestContext,
        _prior: &[MatchVerdict],
    ) -> Result<MatchVerdict, ControllerError> {
        if self.index.is_empty() {
            return Ok(MatchVerdict::not_matched(&self.name, Self::KIND, "no geofences configured"));
        }

        let point = match ctx.coordinates() {
            Some(point) if point.is_valid() => point,
            _ => {
                return Ok(MatchVerdict::not_matched(
                    &self.name,
                    Self::KIND,
                    "no coordinates for request",
                ))
            }
        };

        let names = self.index.matches(point);
        if names.is_empty() {
            return Ok(MatchVerdict::not_matched(
                &self.name,
                Self::KIND,
                format!("{} is outside every geofence", point),
            ));
        }

        tracing::debug!(controller = %self.name, point = %point, polygons = ?names, "Geofence match");
        Ok(MatchVerdict::matched(
            &self.name,
            Self::KIND,
            format!("inside geofence: {}", names.join(", ")),
        ))
    }
}

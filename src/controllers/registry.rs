//! Controller registry: maps configured type strings to constructors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ControllerConfig;
use crate::controllers::analysis::GeoEnrichment;
use crate::controllers::matchers::{AsnListMatcher, CidrListMatcher, DynamicStoreMatcher, GeofenceMatcher};
use crate::controllers::{AnalysisController, BuildError, MatchController};
use crate::geo::{GeoDatabase, MaxmindDatabase};

/// Analysis kinds known to the built-in registry.
pub const ANALYSIS_KINDS: &[&str] = &[GeoEnrichment::KIND];

/// Match kinds known to the built-in registry.
pub const MATCH_KINDS: &[&str] = &[
    CidrListMatcher::KIND,
    AsnListMatcher::KIND,
    DynamicStoreMatcher::KIND,
    GeofenceMatcher::KIND,
];

pub type AnalysisFactory =
    fn(&ControllerConfig, &mut BuildContext) -> Result<Arc<dyn AnalysisController>, BuildError>;

pub type MatchFactory =
    fn(&ControllerConfig, &mut BuildContext) -> Result<Arc<dyn MatchController>, BuildError>;

/// Resources shared between controllers while the chain is being built.
#[derive(Default)]
pub struct BuildContext {
    geo_databases: HashMap<PathBuf, Arc<dyn GeoDatabase>>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already-open database under `path` (used by tests and embedders).
    pub fn with_geo_database(mut self, path: impl Into<PathBuf>, db: Arc<dyn GeoDatabase>) -> Self {
        self.geo_databases.insert(path.into(), db);
        self
    }

    /// Open a geo database once per path and share it.
    pub fn geo_database(
        &mut self,
        controller: &str,
        path: &Path,
    ) -> Result<Arc<dyn GeoDatabase>, BuildError> {
        if let Some(db) = self.geo_databases.get(path) {
            return Ok(db.clone());
        }
        let db: Arc<dyn GeoDatabase> =
            Arc::new(MaxmindDatabase::open(path).map_err(|source| BuildError::Geo {
                controller: controller.to_string(),
                source,
            })?);
        self.geo_databases.insert(path.to_path_buf(), db.clone());
        Ok(db)
    }
}

/// Type name → constructor tables for both controller stages.
pub struct ControllerRegistry {
    analysis: HashMap<&'static str, AnalysisFactory>,
    matchers: HashMap<&'static str, MatchFactory>,
}

impl ControllerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            analysis: HashMap::new(),
            matchers: HashMap::new(),
        }
    }

    /// A registry with every built-in controller kind.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register_analysis(GeoEnrichment::KIND, build_geo_enrichment);
        registry.register_match(CidrListMatcher::KIND, build_cidr_list);
        registry.register_match(AsnListMatcher::KIND, build_asn_list);
        registry.register_match(DynamicStoreMatcher::KIND, build_dynamic_store);
        registry.register_match(GeofenceMatcher::KIND, build_geofence);
        registry
    }

    pub fn register_analysis(&mut self, kind: &'static str, factory: AnalysisFactory) {
        self.analysis.insert(kind, factory);
    }

    pub fn register_match(&mut self, kind: &'static str, factory: MatchFactory) {
        self.matchers.insert(kind, factory);
    }

    pub fn build_analysis(
        &self,
        config: &ControllerConfig,
        ctx: &mut BuildContext,
    ) -> Result<Arc<dyn AnalysisController>, BuildError> {
        let factory = self
            .analysis
            .get(config.kind.as_str())
            .ok_or_else(|| unknown(config))?;
        let controller = factory(config, ctx)?;
        tracing::info!(controller = %config.name, kind = %config.kind, "Analysis controller ready");
        Ok(controller)
    }

    pub fn build_match(
        &self,
        config: &ControllerConfig,
        ctx: &mut BuildContext,
    ) -> Result<Arc<dyn MatchController>, BuildError> {
        let factory = self
            .matchers
            .get(config.kind.as_str())
            .ok_or_else(|| unknown(config))?;
        let controller = factory(config, ctx)?;
        tracing::info!(
            controller = %config.name,
            kind = %config.kind,
            action = ?config.action,
            "Match controller ready"
        );
        Ok(controller)
    }
}

impl Default for ControllerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn build_geo_enrichment(
    config: &ControllerConfig,
    ctx: &mut BuildContext,
) -> Result<Arc<dyn AnalysisController>, BuildError> {
    Ok(Arc::new(GeoEnrichment::from_config(config, ctx)?))
}

fn build_cidr_list(
    config: &ControllerConfig,
    _ctx: &mut BuildContext,
) -> Result<Arc<dyn MatchController>, BuildError> {
    Ok(Arc::new(CidrListMatcher::from_config(config)?))
}

fn build_asn_list(
    config: &ControllerConfig,
    ctx: &mut BuildContext,
) -> Result<Arc<dyn MatchController>, BuildError> {
    Ok(Arc::new(AsnListMatcher::from_config(config, ctx)?))
}

fn build_dynamic_store(
    config: &ControllerConfig,
    _ctx: &mut BuildContext,
) -> Result<Arc<dyn MatchController>, BuildError> {
    Ok(Arc::new(DynamicStoreMatcher::from_config(config)?))
}

fn build_geofence(
    config: &ControllerConfig,
    _ctx: &mut BuildContext,
) -> Result<Arc<dyn MatchController>, BuildError> {
    Ok(Arc::new(GeofenceMatcher::from_config(config)?))
}

fn unknown(config: &ControllerConfig) -> BuildError {
    BuildError::UnknownType {
        controller: config.name.clone(),
        kind: config.kind.clone(),
    }
}

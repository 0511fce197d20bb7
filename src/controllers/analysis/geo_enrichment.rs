//! Geo enrichment: source IP → location headers and coordinates.
//!
//! # Responsibilities
//! - Look up the source IP in the geo database
//! - Emit `<prefix>country`, `<prefix>latitude`, ... for the fields the record carries
//! - Hand coordinates and ASN to later match controllers
//!
//! # Design Decisions
//! - Found records are cached per IP for the controller's lifetime
//! - Misses and lookup errors are logged and yield an empty report;
//!   enrichment never blocks or denies a request on its own

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ControllerConfig;
use crate::context::{AnalysisReport, RequestContext};
use crate::controllers::settings::SettingsReader;
use crate::controllers::{AnalysisController, BuildContext, BuildError, ControllerCache, ControllerError};
use crate::geo::{GeoDatabase, GeoRecord};

const DEFAULT_HEADER_PREFIX: &str = "x-geo-";

pub struct GeoEnrichment {
    name: String,
    database: Arc<dyn GeoDatabase>,
    header_prefix: String,
    cache: ControllerCache<AnalysisReport>,
}

impl GeoEnrichment {
    pub const KIND: &'static str = "geo_enrichment";

    pub fn new(
        name: &str,
        database: Arc<dyn GeoDatabase>,
        header_prefix: &str,
        cache_capacity: Option<usize>,
    ) -> Self {
        Self {
            name: name.to_string(),
            database,
            header_prefix: header_prefix.to_ascii_lowercase(),
            cache: ControllerCache::new(name, cache_capacity),
        }
    }

    pub fn from_config(config: &ControllerConfig, ctx: &mut BuildContext) -> Result<Self, BuildError> {
        let settings = SettingsReader::new(config);
        let path = settings.required_path("database_path")?;
        let prefix = settings
            .optional_str("header_prefix")?
            .unwrap_or(DEFAULT_HEADER_PREFIX);
        let capacity = settings.cache_capacity()?;
        let database = ctx.geo_database(&config.name, &path)?;

        Ok(Self::new(&config.name, database, prefix, capacity))
    }

    pub fn cache(&self) -> &ControllerCache<AnalysisReport> {
        &self.cache
    }

    fn report_for(&self, record: &GeoRecord) -> AnalysisReport {
        let mut report = AnalysisReport::empty();
        let mut put = |field: &str, value: Option<String>| {
            if let Some(value) = value {
                report
                    .headers
                    .insert(format!("{}{}", self.header_prefix, field), value);
            }
        };

        put("city", record.city.clone());
        put("region", record.region.clone());
        put("country", record.country.clone());
        put("country-code", record.country_code.clone());
        put("continent", record.continent.clone());
        put("timezone", record.time_zone.clone());
        put("latitude", record.coordinates.map(|c| c.latitude.to_string()));
        put("longitude", record.coordinates.map(|c| c.longitude.to_string()));
        put("asn", record.asn.map(|asn| asn.to_string()));
        put("asn-org", record.asn_organization.clone());

        report.coordinates = record.coordinates.filter(|c| c.is_valid());
        report.asn = record.asn;
        report
    }
}

#[async_trait]
impl AnalysisController for GeoEnrichment {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    async fn analyze(&self, ctx: &RequestContext) -> Result<AnalysisReport, ControllerError> {
        let Some(ip) = ctx.source_ip() else {
            tracing::debug!(
                controller = %self.name,
                source = %ctx.source_address(),
                "No usable source address, skipping geo enrichment"
            );
            return Ok(AnalysisReport::empty());
        };

        let key = ip.to_string();
        if let Some(report) = self.cache.get(&key) {
            return Ok(report);
        }

        match self.database.lookup(ip) {
            Ok(Some(record)) => {
                let report = self.report_for(&record);
                self.cache.insert(key, report.clone());
                Ok(report)
            }
            Ok(None) => {
                tracing::debug!(controller = %self.name, ip = %ip, "Address not found in geo database");
                Ok(AnalysisReport::empty())
            }
            Err(e) => {
                tracing::warn!(controller = %self.name, ip = %ip, error = %e, "Geo lookup failed");
                Ok(AnalysisReport::empty())
            }
        }
    }
}

//! ASN list matcher.
//!
//! # Responsibilities
//! - Take the ASN geo enrichment already resolved, else look it up in the geo database
//! - Test it against the configured ASN set
//! - Treat lookup misses and lookup errors as non-matching

use std::collections::HashSet;
use std::fs;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ControllerConfig;
use crate::context::{MatchVerdict, RequestContext};
use crate::controllers::settings::SettingsReader;
use crate::controllers::{BuildContext, BuildError, ControllerCache, ControllerError, MatchController};
use crate::geo::GeoDatabase;

pub struct AsnListMatcher {
    name: String,
    database: Arc<dyn GeoDatabase>,
    asns: HashSet<u32>,
    cache: ControllerCache<MatchVerdict>,
}

impl AsnListMatcher {
    pub const KIND: &'static str = "asn_list";

    pub fn new(
        name: &str,
        database: Arc<dyn GeoDatabase>,
        asns: HashSet<u32>,
        cache_capacity: Option<usize>,
    ) -> Self {
        Self {
            name: name.to_string(),
            database,
            asns,
            cache: ControllerCache::new(name, cache_capacity),
        }
    }

    pub fn from_config(config: &ControllerConfig, ctx: &mut BuildContext) -> Result<Self, BuildError> {
        let settings = SettingsReader::new(config);
        let capacity = settings.cache_capacity()?;

        let (key, entries) = if let Some(list) = settings.optional_raw_list("asns")? {
            ("asns", list)
        } else if settings.contains("path") {
            let path = settings.required_path("path")?;
            let content = fs::read_to_string(&path)
                .map_err(|e| settings.invalid("path", format!("cannot read {}: {}", path.display(), e)))?;
            let lines = content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string)
                .collect();
            ("path", lines)
        } else {
            return Err(settings.missing("asns"));
        };

        let mut asns = HashSet::with_capacity(entries.len());
        for entry in &entries {
            let asn = parse_asn(entry)
                .ok_or_else(|| settings.invalid(key, format!("'{}' is not an ASN", entry)))?;
            asns.insert(asn);
        }
        if asns.is_empty() {
            return Err(settings.invalid(key, "no ASNs configured"));
        }

        let path = settings.required_path("database_path")?;
        let database = ctx.geo_database(&config.name, &path)?;

        Ok(Self::new(&config.name, database, asns, capacity))
    }

    pub fn cache(&self) -> &ControllerCache<MatchVerdict> {
        &self.cache
    }
}

/// `13335`, `AS13335` and `as13335` all parse to 13335.
fn parse_asn(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    let digits = raw
        .strip_prefix("AS")
        .or_else(|| raw.strip_prefix("as"))
        .unwrap_or(raw);
    digits.parse().ok()
}

#[async_trait]
impl MatchController for AsnListMatcher {
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
        let Some(ip) = ctx.source_ip() else {
            return Ok(MatchVerdict::not_matched(
                &self.name,
                Self::KIND,
                format!("invalid source address '{}'", ctx.source_address()),
            ));
        };

        // Geo enrichment earlier in the chain already resolved the ASN.
        if let Some(asn) = ctx.asn() {
            return Ok(self.verdict_for(ip, Some(asn)));
        }

        let key = ip.to_string();
        if let Some(verdict) = self.cache.get(&key) {
            return Ok(verdict);
        }

        let asn = match self.database.lookup(ip) {
            Ok(record) => record.and_then(|r| r.asn),
            Err(e) => {
                tracing::warn!(controller = %self.name, ip = %ip, error = %e, "ASN lookup failed");
                return Ok(MatchVerdict::not_matched(
                    &self.name,
                    Self::KIND,
                    format!("ASN lookup failed for {}", ip),
                ));
            }
        };

        let verdict = self.verdict_for(ip, asn);
        self.cache.insert(key, verdict.clone());
        Ok(verdict)
    }
}

impl AsnListMatcher {
    fn verdict_for(&self, ip: IpAddr, asn: Option<u32>) -> MatchVerdict {
        match asn {
            Some(asn) if self.asns.contains(&asn) => {
                MatchVerdict::matched(&self.name, Self::KIND, format!("{} is in AS{}", ip, asn))
            }
            Some(asn) => MatchVerdict::not_matched(
                &self.name,
                Self::KIND,
                format!("AS{} is not in {}", asn, self.name),
            ),
            None => {
                tracing::debug!(controller = %self.name, ip = %ip, "No ASN for address");
                MatchVerdict::not_matched(&self.name, Self::KIND, format!("no ASN known for {}", ip))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AnalysisReport, CheckRequest};
    use crate::geo::{GeoError, GeoRecord};
    use serde_json::json;
    use std::collections::HashMap;
    use std::io::Write;
    use std::net::IpAddr;

    struct AsnTable(HashMap<IpAddr, u32>);

    impl GeoDatabase for AsnTable {
        fn lookup(&self, ip: IpAddr) -> Result<Option<GeoRecord>, GeoError> {
            Ok(self.0.get(&ip).map(|asn| GeoRecord {
                asn: Some(*asn),
                ..GeoRecord::default()
            }))
        }

        fn edition(&self) -> &str {
            "GeoLite2-ASN"
        }
    }

    fn table() -> Arc<dyn GeoDatabase> {
        let mut map = HashMap::new();
        map.insert("1.1.1.1".parse().unwrap(), 13335);
        map.insert("8.8.8.8".parse().unwrap(), 15169);
        Arc::new(AsnTable(map))
    }

    fn ctx(source: &str) -> RequestContext {
        RequestContext::new(CheckRequest {
            source_address: source.to_string(),
            ..CheckRequest::default()
        })
    }

    #[test]
    fn test_parse_asn() {
        assert_eq!(parse_asn("13335"), Some(13335));
        assert_eq!(parse_asn(" AS15169 "), Some(15169));
        assert_eq!(parse_asn("as64512"), Some(64512));
        assert_eq!(parse_asn("ASX"), None);
        assert_eq!(parse_asn("-1"), None);
    }

    #[tokio::test]
    async fn test_membership() {
        let m = AsnListMatcher::new("cloud", table(), HashSet::from([13335]), None);
        assert!(m.evaluate(&ctx("1.1.1.1"), &[]).await.unwrap().is_match);
        assert!(!m.evaluate(&ctx("8.8.8.8"), &[]).await.unwrap().is_match);
        // Miss in the database is a soft outcome.
        assert!(!m.evaluate(&ctx("203.0.113.9"), &[]).await.unwrap().is_match);
        assert!(!m.evaluate(&ctx("bogus"), &[]).await.unwrap().is_match);
        assert_eq!(m.cache().len(), 3);
    }

    #[tokio::test]
    async fn test_enriched_asn_skips_database() {
        let m = AsnListMatcher::new("cloud", table(), HashSet::from([64500]), None);
        let mut enriched = ctx("203.0.113.9");
        enriched.merge_report(AnalysisReport {
            asn: Some(64500),
            ..AnalysisReport::default()
        });

        let verdict = m.evaluate(&enriched, &[]).await.unwrap();
        assert!(verdict.is_match);
        assert_eq!(verdict.description, "203.0.113.9 is in AS64500");
        assert!(m.cache().is_empty());

        // Without enrichment the database has no ASN for this address.
        assert!(!m.evaluate(&ctx("203.0.113.9"), &[]).await.unwrap().is_match);
    }

    #[test]
    fn test_from_config() {
        let mut list = tempfile::NamedTempFile::new().unwrap();
        writeln!(list, "# hosting\nAS13335\n15169").unwrap();

        let mut ctx = BuildContext::new().with_geo_database("/db/asn.mmdb", table());
        let settings = json!({ "database_path": "/db/asn.mmdb", "path": list.path() });
        let config = ControllerConfig::new("cloud", "asn_list", settings.as_object().cloned().unwrap());
        let m = AsnListMatcher::from_config(&config, &mut ctx).unwrap();
        assert_eq!(m.asns.len(), 2);

        let settings = json!({ "database_path": "/db/asn.mmdb", "asns": ["AS1", "nope"] });
        let config = ControllerConfig::new("cloud", "asn_list", settings.as_object().cloned().unwrap());
        assert!(matches!(
            AsnListMatcher::from_config(&config, &mut ctx),
            Err(BuildError::InvalidSetting { .. })
        ));

        let settings = json!({ "database_path": "/db/asn.mmdb" });
        let config = ControllerConfig::new("cloud", "asn_list", settings.as_object().cloned().unwrap());
        assert!(matches!(
            AsnListMatcher::from_config(&config, &mut ctx),
            Err(BuildError::MissingSetting { .. })
        ));
    }
}

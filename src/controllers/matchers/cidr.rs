//! CIDR list matcher.
//!
//! # Responsibilities
//! - Build the network set once from a list file or inline `cidrs`
//! - Answer containment for the source IP, caching verdicts per literal address
//! - Turn unparseable source addresses into a non-matching verdict

use async_trait::async_trait;

use crate::config::ControllerConfig;
use crate::context::{MatchVerdict, RequestContext};
use crate::controllers::settings::SettingsReader;
use crate::controllers::{BuildError, ControllerCache, ControllerError, MatchController};
use crate::store::FileStore;

pub struct CidrListMatcher {
    name: String,
    networks: FileStore,
    cache: ControllerCache<MatchVerdict>,
}

impl CidrListMatcher {
    pub const KIND: &'static str = "cidr_list";

    pub fn new(name: &str, networks: FileStore, cache_capacity: Option<usize>) -> Self {
        Self {
            name: name.to_string(),
            networks,
            cache: ControllerCache::new(name, cache_capacity),
        }
    }

    pub fn from_config(config: &ControllerConfig) -> Result<Self, BuildError> {
        let settings = SettingsReader::new(config);
        let capacity = settings.cache_capacity()?;
        let store_error = |source| BuildError::Store {
            controller: config.name.clone(),
            source,
        };

        let networks = if settings.contains("path") {
            FileStore::open(&settings.required_path("path")?).map_err(store_error)?
        } else if let Some(cidrs) = settings.optional_str_list("cidrs")? {
            let label = format!("{}.cidrs", config.name);
            FileStore::from_entries(&label, cidrs).map_err(store_error)?
        } else {
            return Err(settings.missing("path"));
        };

        Ok(Self::new(&config.name, networks, capacity))
    }

    pub fn cache(&self) -> &ControllerCache<MatchVerdict> {
        &self.cache
    }

    pub fn networks(&self) -> &FileStore {
        &self.networks
    }
}

#[async_trait]
impl MatchController for CidrListMatcher {
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

        let key = ctx.source_address().to_string();
        if let Some(verdict) = self.cache.get(&key) {
            return Ok(verdict);
        }

        let verdict = if self.networks.contains_ip(ip) {
            MatchVerdict::matched(&self.name, Self::KIND, format!("{} is in {}", ip, self.name))
        } else {
            MatchVerdict::not_matched(&self.name, Self::KIND, format!("{} is not in {}", ip, self.name))
        };
        self.cache.insert(key, verdict.clone());
        Ok(verdict)
    }
}

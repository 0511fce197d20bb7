//! Dynamic store matcher.
//!
//! # Responsibilities
//! - Ask a key-value or relational store whether the source IP is a member
//! - Never cache: the store is the source of truth and may change between calls
//! - Propagate store failures as errors; the engine applies the failure policy

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ControllerConfig;
use crate::context::{MatchVerdict, RequestContext};
use crate::controllers::settings::SettingsReader;
use crate::controllers::{BuildError, ControllerError, MatchController};
use crate::store::{BackingStore, PostgresStore, RedisStore};

const DEFAULT_TIMEOUT_MS: u64 = 50;
const DEFAULT_MAX_CONNECTIONS: u64 = 10;
const DEFAULT_COLUMN: &str = "address";

pub struct DynamicStoreMatcher {
    name: String,
    store: Arc<dyn BackingStore>,
}

impl DynamicStoreMatcher {
    pub const KIND: &'static str = "dynamic_store";

    pub fn new(name: &str, store: Arc<dyn BackingStore>) -> Self {
        Self {
            name: name.to_string(),
            store,
        }
    }

    /// Build the configured store client. Postgres pools connect lazily but
    /// must be created inside a Tokio runtime.
    pub fn from_config(config: &ControllerConfig) -> Result<Self, BuildError> {
        let settings = SettingsReader::new(config);
        let url = settings.required_str("url")?;
        let key_prefix = settings.optional_str("key_prefix")?.unwrap_or_default();
        let timeout = Duration::from_millis(
            settings.optional_u64("timeout_ms")?.unwrap_or(DEFAULT_TIMEOUT_MS),
        );
        if timeout.is_zero() {
            return Err(settings.invalid("timeout_ms", "must be > 0"));
        }
        let store_error = |source| BuildError::Store {
            controller: config.name.clone(),
            source,
        };

        let store: Arc<dyn BackingStore> = match settings.required_str("store")? {
            "redis" => Arc::new(RedisStore::new(url, key_prefix, timeout).map_err(store_error)?),
            "postgres" => {
                let table = settings.required_str("table")?;
                let column = settings.optional_str("column")?.unwrap_or(DEFAULT_COLUMN);
                let max_connections = settings
                    .optional_u64("max_connections")?
                    .unwrap_or(DEFAULT_MAX_CONNECTIONS)
                    .min(u32::MAX as u64) as u32;
                Arc::new(
                    PostgresStore::new(url, table, column, key_prefix, max_connections, timeout)
                        .map_err(store_error)?,
                )
            }
            other => {
                return Err(settings.invalid(
                    "store",
                    format!("unknown store '{}', expected redis or postgres", other),
                ))
            }
        };

        tracing::info!(controller = %config.name, store = %store.describe(), "Dynamic store configured");
        Ok(Self::new(&config.name, store))
    }

    pub fn store(&self) -> &Arc<dyn BackingStore> {
        &self.store
    }
}

#[async_trait]
impl MatchController for DynamicStoreMatcher {
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

        let member = self
            .store
            .contains(&ip.to_string())
            .await
            .map_err(|source| ControllerError::Store {
                store: self.store.describe(),
                source,
            })?;

        Ok(if member {
            MatchVerdict::matched(
                &self.name,
                Self::KIND,
                format!("{} is listed in {}", ip, self.store.describe()),
            )
        } else {
            MatchVerdict::not_matched(
                &self.name,
                Self::KIND,
                format!("{} is not listed in {}", ip, self.store.describe()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CheckRequest;
    use crate::store::{FileStore, StoreError};
    use serde_json::json;

    #[derive(Debug)]
    struct Down;

    #[async_trait]
    impl BackingStore for Down {
        async fn contains(&self, _key: &str) -> Result<bool, StoreError> {
            Err(StoreError::Timeout(Duration::from_millis(5)))
        }

        fn describe(&self) -> String {
            "down".to_string()
        }
    }

    fn ctx(source: &str) -> RequestContext {
        RequestContext::new(CheckRequest {
            source_address: source.to_string(),
            ..CheckRequest::default()
        })
    }

    fn config(settings: serde_json::Value) -> ControllerConfig {
        ControllerConfig::new("trusted", "dynamic_store", settings.as_object().cloned().unwrap())
    }

    #[tokio::test]
    async fn test_membership_via_store() {
        let store = FileStore::from_entries("trusted", ["198.51.100.0/24"]).unwrap();
        let m = DynamicStoreMatcher::new("trusted", Arc::new(store));
        assert!(m.evaluate(&ctx("198.51.100.9"), &[]).await.unwrap().is_match);
        assert!(!m.evaluate(&ctx("203.0.113.9"), &[]).await.unwrap().is_match);
        assert!(!m.evaluate(&ctx(""), &[]).await.unwrap().is_match);
    }

    #[tokio::test]
    async fn test_store_error_propagates() {
        let m = DynamicStoreMatcher::new("trusted", Arc::new(Down));
        let err = m.evaluate(&ctx("198.51.100.9"), &[]).await.unwrap_err();
        assert!(matches!(err, ControllerError::Store { .. }));
        assert_eq!(err.deny_code(), crate::context::DenyCode::DeadlineExceeded);
    }

    #[tokio::test]
    async fn test_from_config_redis() {
        let m = DynamicStoreMatcher::from_config(&config(json!({
            "store": "redis",
            "url": "redis://127.0.0.1:6379",
            "key_prefix": "trusted:",
        })))
        .unwrap();
        assert_eq!(m.store().describe(), "redis:trusted:*");
    }

    #[tokio::test]
    async fn test_from_config_rejects_bad_settings() {
        let cases = [
            json!({ "store": "redis", "url": "" }),
            json!({ "store": "redis" }),
            json!({ "store": "redis", "url": "not a url" }),
            json!({ "store": "memcached", "url": "memcached://x" }),
            json!({ "store": "postgres", "url": "postgres://localhost/authz" }),
            json!({ "store": "postgres", "url": "postgres://localhost/authz", "table": "x; drop" }),
            json!({ "store": "redis", "url": "redis://127.0.0.1", "timeout_ms": 0 }),
        ];
        for case in cases {
            assert!(DynamicStoreMatcher::from_config(&config(case.clone())).is_err(), "{}", case);
        }
    }
}

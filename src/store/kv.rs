//! Redis-backed membership store.
//!
//! Membership keys are namespaced by list, e.g. `trusted:203.0.113.7`.
//! Presence of the key denotes membership regardless of its value.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::OnceCell;

use crate::store::{with_timeout, BackingStore, StoreError};

/// Point lookups against a Redis server over a shared multiplexed connection.
pub struct RedisStore {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
    key_prefix: String,
    timeout: Duration,
}

impl RedisStore {
    /// Validate the URL and prepare a client. The connection is opened on first use.
    pub fn new(url: &str, key_prefix: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
            key_prefix: key_prefix.into(),
            timeout,
        })
    }

    /// The full key looked up for a member.
    pub fn key_for(&self, member: &str) -> String {
        format!("{}{}", self.key_prefix, member)
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                tracing::debug!(prefix = %self.key_prefix, "Opening redis connection");
                ConnectionManager::new(self.client.clone()).await
            })
            .await?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl BackingStore for RedisStore {
    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        let full_key = self.key_for(key);
        with_timeout(self.timeout, async {
            let mut conn = self.connection().await?;
            let present: bool = conn.exists(&full_key).await?;
            Ok(present)
        })
        .await
    }

    fn describe(&self) -> String {
        format!("redis:{}*", self.key_prefix)
    }
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("key_prefix", &self.key_prefix)
            .field("timeout", &self.timeout)
            .field("connected", &self.connection.initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_url() {
        let result = RedisStore::new("not a url", "trusted:", Duration::from_millis(50));
        assert!(matches!(result, Err(StoreError::Redis(_))));
    }

    #[test]
    fn test_key_namespacing() {
        let store = RedisStore::new("redis://127.0.0.1:6379/", "trusted:", Duration::from_millis(50))
            .unwrap();
        assert_eq!(store.key_for("203.0.113.7"), "trusted:203.0.113.7");
        assert_eq!(store.describe(), "redis:trusted:*");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        // Nothing listens on port 1; the lookup must fail rather than report "absent".
        let store = RedisStore::new("redis://127.0.0.1:1/", "trusted:", Duration::from_millis(200))
            .unwrap();
        assert!(store.contains("10.0.0.1").await.is_err());
    }
}

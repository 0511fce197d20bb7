//! Backing store adapters.
//!
//! # Data Flow
//! ```text
//! match controller
//!     → BackingStore::contains(key)
//!         → file.rs   (CIDR/address set parsed once at construction)
//!         → kv.rs     (EXISTS <prefix><key> per call, multiplexed connection)
//!         → sql.rs    (SELECT EXISTS(...) per call, pooled connections)
//!     → Ok(true | false) or Err(StoreError)
//! ```
//!
//! # Design Decisions
//! - One membership question for every storage technology
//! - Network errors are returned, never folded into "not a member";
//!   the calling controller decides fail-open vs fail-closed
//! - Network variants bound every call with their own timeout

use std::time::Duration;

use async_trait::async_trait;

pub mod file;
pub mod kv;
pub mod sql;

pub use self::file::FileStore;
pub use self::kv::RedisStore;
pub use self::sql::PostgresStore;

/// Errors raised by backing stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: '{value}' is not a CIDR or IP address")]
    Parse {
        path: String,
        line: usize,
        value: String,
    },

    #[error("{0} contains no entries")]
    Empty(String),

    #[error("invalid store setting: {0}")]
    InvalidSetting(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("store lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Uniform membership lookup over static and dynamic sources.
#[async_trait]
pub trait BackingStore: Send + Sync + std::fmt::Debug {
    /// Returns whether `key` is present in the store.
    async fn contains(&self, key: &str) -> Result<bool, StoreError>;

    /// Short label for logs and verdict descriptions.
    fn describe(&self) -> String;
}

/// Run a store future under a timeout.
pub(crate) async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: std::future::Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

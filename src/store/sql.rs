//! PostgreSQL-backed membership store.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::store::{with_timeout, BackingStore, StoreError};

/// Parameterized `EXISTS` lookups against one table column.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    query: String,
    table: String,
    key_prefix: String,
    timeout: Duration,
}

impl PostgresStore {
    /// Build a lazily-connecting pool.
    ///
    /// `table` and `column` are interpolated into the query and must be plain
    /// (optionally schema-qualified) identifiers. Must be called from within a
    /// Tokio runtime.
    pub fn new(
        url: &str,
        table: &str,
        column: &str,
        key_prefix: impl Into<String>,
        max_connections: u32,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        if !is_identifier(table) {
            return Err(StoreError::InvalidSetting(format!("table '{}'", table)));
        }
        if !is_identifier(column) || column.contains('.') {
            return Err(StoreError::InvalidSetting(format!("column '{}'", column)));
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(timeout)
            .connect_lazy(url)?;

        Ok(Self {
            pool,
            query: format!("SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1)", table, column),
            table: table.to_string(),
            key_prefix: key_prefix.into(),
            timeout,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

#[async_trait]
impl BackingStore for PostgresStore {
    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        let full_key = format!("{}{}", self.key_prefix, key);
        with_timeout(self.timeout, async {
            let present = sqlx::query_scalar::<_, bool>(&self.query)
                .bind(full_key)
                .fetch_one(&self.pool)
                .await?;
            Ok(present)
        })
        .await
    }

    fn describe(&self) -> String {
        format!("postgres:{}", self.table)
    }
}

fn is_identifier(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_rules() {
        assert!(is_identifier("ip_lists"));
        assert!(is_identifier("authz.ip_lists"));
        assert!(!is_identifier("ip_lists; DROP TABLE x"));
        assert!(!is_identifier("1table"));
        assert!(!is_identifier("a.b.c"));
        assert!(!is_identifier(""));
    }

    #[tokio::test]
    async fn test_builds_parameterized_query() {
        let store = PostgresStore::new(
            "postgres://authz@127.0.0.1:1/authz",
            "ip_lists",
            "member",
            "trusted:",
            4,
            Duration::from_millis(100),
        )
        .unwrap();
        assert_eq!(store.query(), "SELECT EXISTS(SELECT 1 FROM ip_lists WHERE member = $1)");
        assert_eq!(store.describe(), "postgres:ip_lists");
    }

    #[tokio::test]
    async fn test_rejects_injection_in_column() {
        let result = PostgresStore::new(
            "postgres://authz@127.0.0.1:1/authz",
            "ip_lists",
            "member = member OR 1=1 --",
            "",
            4,
            Duration::from_millis(100),
        );
        assert!(matches!(result, Err(StoreError::InvalidSetting(_))));
    }

    #[tokio::test]
    async fn test_unreachable_database_is_an_error() {
        let store = PostgresStore::new(
            "postgres://authz@127.0.0.1:1/authz",
            "ip_lists",
            "member",
            "",
            1,
            Duration::from_millis(200),
        )
        .unwrap();
        assert!(store.contains("10.0.0.1").await.is_err());
    }
}

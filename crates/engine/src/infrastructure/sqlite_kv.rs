//! SQLite-backed key-value store. Performs real database I/O.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hermetic_domain::BindingKind;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use crate::infrastructure::ports::{ClockPort, KvConnectorPort, KvError, KvStorePort};

/// Live store constructor: opens SQLite connection pools.
pub struct SqliteKvConnector {
    clock: Arc<dyn ClockPort>,
}

impl SqliteKvConnector {
    pub fn new(clock: Arc<dyn ClockPort>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl KvConnectorPort for SqliteKvConnector {
    fn kind(&self) -> BindingKind {
        BindingKind::Live
    }

    async fn connect(&self, url: &str) -> Result<Arc<dyn KvStorePort>, KvError> {
        let store = SqliteKvStore::open(url, self.clock.clone()).await?;
        Ok(Arc::new(store))
    }
}

/// Key-value entries in a single SQLite table with optional expiry.
pub struct SqliteKvStore {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
}

impl SqliteKvStore {
    pub async fn open(url: &str, clock: Arc<dyn ClockPort>) -> Result<Self, KvError> {
        let (url, in_memory) = normalize_url(url)?;

        let pool = pool_options(in_memory)
            .connect(&url)
            .await
            .map_err(|e| KvError::Connection(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY NOT NULL,
                value BLOB NOT NULL,
                expires_at INTEGER
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(KvError::database)?;

        tracing::info!(url = %url, "Opened SQLite key-value store");

        Ok(Self { pool, clock })
    }

    fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    /// Remove all expired entries and return how many were removed.
    pub async fn purge_expired(&self) -> Result<u64, KvError> {
        let result = sqlx::query(
            "DELETE FROM kv_entries WHERE expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(self.now_millis())
        .execute(&self.pool)
        .await
        .map_err(KvError::database)?;
        Ok(result.rows_affected())
    }
}

/// Every in-memory connection is its own database: keep exactly one open for
/// the pool's whole life, or the data goes with it.
fn pool_options(in_memory: bool) -> SqlitePoolOptions {
    if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    }
}

fn normalize_url(url: &str) -> Result<(String, bool), KvError> {
    let url = url.trim();
    if !url.starts_with("sqlite:") {
        return Err(KvError::Connection(format!(
            "unsupported store url {url:?}, expected sqlite:"
        )));
    }

    let in_memory = url.contains(":memory:") || url.contains("mode=memory");
    if in_memory || url.contains("mode=") {
        return Ok((url.to_string(), in_memory));
    }

    let separator = if url.contains('?') { '&' } else { '?' };
    Ok((format!("{url}{separator}mode=rwc"), false))
}

#[async_trait]
impl KvStorePort for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let row = sqlx::query(
            "SELECT value FROM kv_entries WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(key)
        .bind(self.now_millis())
        .fetch_optional(&self.pool)
        .await
        .map_err(KvError::database)?;

        Ok(row.map(|row| row.get::<Vec<u8>, _>("value")))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), KvError> {
        let expires_at = ttl.map(|ttl| {
            let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
            self.now_millis().saturating_add(ttl_ms)
        });

        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, expires_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(KvError::database)?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, KvError> {
        let now = self.now_millis();
        let removed = sqlx::query(
            "DELETE FROM kv_entries WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(key)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(KvError::database)?
        .rows_affected();

        if removed == 0 {
            // Drop an expired leftover; only expired rows, so a concurrent set survives.
            sqlx::query(
                "DELETE FROM kv_entries WHERE key = ? AND expires_at IS NOT NULL AND expires_at <= ?",
            )
            .bind(key)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(KvError::database)?;
        }

        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.get(key).await?.is_some())
    }
}

//! SQLite Key/Value Store Implementation
//!
//! Persists entries in a single `kv_entries` table keyed by the full key
//! string. Each row carries an absolute `expires_at` in milliseconds; every
//! read filters on it, so an expired row is gone from the caller's point of
//! view the instant its TTL elapses even before `purge_expired` deletes it.
//!
//! ## Usage
//!
//! ### File-Based
//! ```ignore
//! let store = SqliteKeyValueStore::new("./data/chirps.db").await?;
//! ```
//!
//! ### In-Memory (Testing)
//! ```ignore
//! let store = SqliteKeyValueStore::new_in_memory().await?;
//! ```
//!
//! ## Pattern Matching
//!
//! Enumeration uses SQLite's `GLOB` operator. `?` and `[` are bracketed first
//! so that `*` stays the only wildcard, as in the memory store.
//!
//! ## Schema
//!
//! Managed by `sqlx::migrate!` from `./migrations`, applied on every open.

use crate::{error::Result, expiry_ms, glob, now_ms, KeyValueStore};
use async_trait::async_trait;
use bytes::Bytes;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// SQLite-backed [`KeyValueStore`].
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Open (or create) a SQLite database file.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let options =
            SqliteConnectOptions::from_str(&format!("sqlite://{}", path.as_ref().display()))?
                .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing).
    ///
    /// Every SQLite connection to `:memory:` gets its own database, so the pool
    /// is pinned to one connection that is never recycled.
    pub async fn new_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Check the database answers a trivial query.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn set_with_expiry(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let expires_at = expiry_ms(ttl)?;

        sqlx::query(
            "INSERT INTO kv_entries (key, value, expires_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value.as_ref())
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let value: Option<Vec<u8>> = sqlx::query_scalar(
            "SELECT value FROM kv_entries WHERE key = ? AND expires_at > ?",
        )
        .bind(key)
        .bind(now_ms())
        .fetch_optional(&self.pool)
        .await?;

        Ok(value.map(Bytes::from))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let now = now_ms();

        let keys: Vec<String> = sqlx::query_scalar(
            "SELECT key FROM kv_entries WHERE key GLOB ? AND expires_at > ? ORDER BY key ASC",
        )
        .bind(glob::to_sqlite_glob(pattern))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM kv_entries WHERE expires_at <= ?")
            .bind(now_ms())
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            tracing::debug!(removed, "Purged expired entries from SQLite store");
        }
        Ok(removed)
    }
}

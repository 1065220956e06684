//! Chirp Tracker Key/Value Store
//!
//! This crate defines the storage contract the tracker is written against and
//! ships two backends for it.
//!
//! ## Purpose
//!
//! The tracker never talks to a database directly. Everything it persists is a
//! string key mapped to an opaque value with a time-to-live:
//! - **Payload keys** hold the raw webhook body
//! - **Timestamp keys** hold a decimal Unix timestamp
//!
//! Expiry is owned entirely by the store. Callers only ever set, get, and
//! enumerate keys by glob pattern.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐      ┌────────────────┐
//! │ EventRecorder  │      │  QueryEngine   │
//! └───────┬────────┘      └───────┬────────┘
//!         │ set_with_expiry       │ keys / get
//!         ▼                       ▼
//! ┌─────────────────────────────────────────┐
//! │          dyn KeyValueStore              │ ◄── You are here
//! ├────────────────────┬────────────────────┤
//! │ MemoryKeyValueStore│ SqliteKeyValueStore│
//! └────────────────────┴────────────────────┘
//! ```
//!
//! ## Usage Example
//!
//! ```ignore
//! use chirp_store::{connect, KeyValueStore};
//! use std::time::Duration;
//!
//! let store = connect("sqlite://./data/chirps.db").await?;
//! store.set_with_expiry("github:timestamps:a/b:c1", "100".into(), Duration::from_secs(3600)).await?;
//! let keys = store.keys("github:timestamps:*").await?;
//! ```
//!
//! ## Glob Semantics
//!
//! `*` matches any run of characters; every other character is literal.
//! Enumeration returns keys in ascending lexicographic order on every backend.

pub mod error;
pub mod glob;
pub mod memory;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// TTL-capable key/value store.
///
/// All implementations must be `Send + Sync` so a single instance can be shared
/// across request handlers as `Arc<dyn KeyValueStore>`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value and resetting its TTL.
    ///
    /// # Errors
    ///
    /// - `InvalidTtl`: `ttl` is zero
    /// - `Database`: backend failure
    async fn set_with_expiry(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()>;

    /// Fetch the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key was never written or has expired.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// List every live key matching the glob `pattern`, sorted ascending.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Discard entries whose TTL has elapsed and return how many were removed.
    ///
    /// Expired entries are already invisible to `get` and `keys`; this only
    /// reclaims space.
    async fn purge_expired(&self) -> Result<u64>;
}

/// Open a store from a connection address.
///
/// Accepted forms:
/// - `memory` or `memory://`: process-local [`MemoryKeyValueStore`]
/// - `sqlite::memory:`: in-memory SQLite database
/// - `sqlite://<path>` or a bare filesystem path: SQLite file (created if missing)
pub async fn connect(address: &str) -> Result<Arc<dyn KeyValueStore>> {
    let address = address.trim();
    if address.is_empty() {
        return Err(StoreError::InvalidAddress(
            "store address must not be empty".to_string(),
        ));
    }

    if address == "memory" || address == "memory://" {
        tracing::info!("Using in-process memory store");
        return Ok(Arc::new(MemoryKeyValueStore::new()));
    }

    if address == "sqlite::memory:" || address == ":memory:" {
        tracing::info!("Using in-memory SQLite store");
        return Ok(Arc::new(SqliteKeyValueStore::new_in_memory().await?));
    }

    if address.contains("://") && !address.starts_with("sqlite://") {
        return Err(StoreError::InvalidAddress(format!(
            "unsupported store scheme: {}",
            address
        )));
    }

    let path = address.strip_prefix("sqlite://").unwrap_or(address);
    tracing::info!(path = %path, "Using SQLite store");
    Ok(Arc::new(SqliteKeyValueStore::new(path).await?))
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Absolute expiry for an entry written now with `ttl`.
pub(crate) fn expiry_ms(ttl: Duration) -> Result<i64> {
    if ttl.is_zero() {
        return Err(StoreError::InvalidTtl);
    }
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    Ok(now_ms().saturating_add(ttl_ms))
}

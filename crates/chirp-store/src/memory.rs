//! In-process key/value store
//!
//! Entries live in a `BTreeMap` behind a tokio `RwLock`, so enumeration comes
//! back in key order for free. Expired entries are hidden from every read and
//! physically removed by [`KeyValueStore::purge_expired`].
//!
//! Suitable for development, tests, and single-instance deployments where
//! losing data on restart is acceptable (everything expires anyway).

use crate::{error::Result, expiry_ms, glob, now_ms, KeyValueStore};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// Stored value with its absolute expiry
#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    expires_at: i64, // Timestamp in milliseconds
}

impl Entry {
    fn is_live(&self, now: i64) -> bool {
        now < self.expires_at
    }
}

/// Memory-backed [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn set_with_expiry(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let expires_at = expiry_ms(ttl)?;
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let now = now_ms();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let now = now_ms();
        let entries = self.entries.read().await;

        if glob::is_literal(pattern) {
            return Ok(entries
                .get_key_value(pattern)
                .filter(|(_, entry)| entry.is_live(now))
                .map(|(key, _)| vec![key.clone()])
                .unwrap_or_default());
        }

        Ok(entries
            .iter()
            .filter(|(key, entry)| entry.is_live(now) && glob::matches(pattern, key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let now = now_ms();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let removed = (before - entries.len()) as u64;
        if removed > 0 {
            tracing::debug!(removed, "Purged expired entries from memory store");
        }
        Ok(removed)
    }
}

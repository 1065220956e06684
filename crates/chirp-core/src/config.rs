//! Tracker Configuration
//!
//! ## TrackerConfig
//!
//! Immutable settings shared by the recorder and the query engine:
//!
//! - **store_address**: where to reach the key/value store (default: `memory`)
//! - **retention_secs**: TTL applied to every payload and timestamp key (default: 3600)
//! - **default_query_limit**: report size when the caller gives none (default: 100)
//! - **query_read_concurrency**: in-flight point reads per query (default: 64)
//! - **unknown_partitions**: keep or drop build legs without a partition id (default: store)
//!
//! Built once at startup and handed out as `Arc<TrackerConfig>`.
//!
//! ## Usage
//!
//! ```ignore
//! use chirp_core::TrackerConfig;
//!
//! let config = TrackerConfig {
//!     store_address: "sqlite://./data/chirps.db".to_string(),
//!     retention_secs: 7200,
//!     ..Default::default()
//! };
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do with build legs whose partition id could not be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownPartitionPolicy {
    /// Record the leg under the `"unknown"` partition.
    #[default]
    Store,
    /// Skip the leg entirely.
    Drop,
}

impl std::str::FromStr for UnknownPartitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "store" | "keep" => Ok(UnknownPartitionPolicy::Store),
            "drop" | "skip" => Ok(UnknownPartitionPolicy::Drop),
            other => Err(format!("unknown partition policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Key/value store connection address
    #[serde(default = "default_store_address")]
    pub store_address: String,

    /// TTL in seconds for every stored key (default: 1 hour)
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Report size when no limit is supplied (default: 100)
    #[serde(default = "default_query_limit")]
    pub default_query_limit: usize,

    /// Maximum concurrent point reads while resolving a report (default: 64)
    #[serde(default = "default_query_read_concurrency")]
    pub query_read_concurrency: usize,

    /// Handling of build legs without a partition id
    #[serde(default)]
    pub unknown_partitions: UnknownPartitionPolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            store_address: default_store_address(),
            retention_secs: default_retention_secs(),
            default_query_limit: default_query_limit(),
            query_read_concurrency: default_query_read_concurrency(),
            unknown_partitions: UnknownPartitionPolicy::default(),
        }
    }
}

impl TrackerConfig {
    /// Retention window as a `Duration`; never zero.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs.max(1))
    }

    /// Read concurrency clamped to at least one.
    pub fn read_concurrency(&self) -> usize {
        self.query_read_concurrency.max(1)
    }
}

fn default_store_address() -> String {
    "memory".to_string()
}

fn default_retention_secs() -> u64 {
    3600 // 1 hour
}

fn default_query_limit() -> usize {
    100
}

fn default_query_read_concurrency() -> usize {
    64
}

//! Event and report types

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Partition label for build legs whose id could not be determined.
pub const UNKNOWN_PARTITION: &str = "unknown";

/// A push notification, normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct PushEvent {
    pub repo: String,
    pub commit: String,
    /// Wall-clock time the notification was received
    pub received_at: DateTime<Utc>,
    pub raw_payload: Bytes,
}

/// One finished leg of a build matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionResult {
    pub partition: String,
    pub finished_at: DateTime<Utc>,
}

impl PartitionResult {
    pub fn new(partition: impl Into<String>, finished_at: DateTime<Utc>) -> Self {
        Self {
            partition: partition.into(),
            finished_at,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.partition == UNKNOWN_PARTITION
    }
}

/// A build result notification, normalized.
///
/// One notification fans out into one [`BuildEvent`] per partition.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildNotification {
    pub repo: String,
    pub commit: String,
    pub partitions: Vec<PartitionResult>,
    pub raw_payload: Bytes,
}

impl BuildNotification {
    /// Per-partition events sharing this notification's payload.
    pub fn events(&self) -> impl Iterator<Item = BuildEvent> + '_ {
        self.partitions.iter().map(move |p| BuildEvent {
            repo: self.repo.clone(),
            partition: p.partition.clone(),
            commit: self.commit.clone(),
            finished_at: p.finished_at,
            raw_payload: self.raw_payload.clone(),
        })
    }
}

/// A single build matrix leg, ready to store.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildEvent {
    pub repo: String,
    pub partition: String,
    pub commit: String,
    pub finished_at: DateTime<Utc>,
    pub raw_payload: Bytes,
}

/// Push-to-build latency for one build leg.
///
/// Derived at read time and never stored. Timestamps are Unix seconds; `0`
/// means the side of the join was missing or expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chirp {
    pub repo: String,
    pub partition: String,
    pub commit: String,
    pub push_timestamp: i64,
    pub build_timestamp: i64,
    /// `build_timestamp - push_timestamp`, saturating
    pub delta: i64,
    /// `now - build_timestamp`, saturating
    pub age: i64,
}

impl Chirp {
    pub fn new(
        repo: String,
        partition: String,
        commit: String,
        push_timestamp: i64,
        build_timestamp: i64,
        now: i64,
    ) -> Self {
        Self {
            repo,
            partition,
            commit,
            push_timestamp,
            build_timestamp,
            delta: build_timestamp.saturating_sub(push_timestamp),
            age: now.saturating_sub(build_timestamp),
        }
    }

    /// Both sides of the join resolved and the build did not precede the push.
    pub fn is_complete(&self) -> bool {
        self.push_timestamp != 0 && self.build_timestamp != 0 && self.delta >= 0
    }
}

/// Summary attached to every report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMeta {
    pub repo_filter: String,
    pub partition_filter: String,
    pub limit: usize,
    /// Chirps surviving the filter, before truncation
    pub total_matched: usize,
    /// Highest `build_timestamp` chirp, if any
    pub most_recent: Option<Chirp>,
}

/// Ranked, filtered, truncated chirps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChirpReport {
    pub chirps: Vec<Chirp>,
    pub meta: ReportMeta,
}

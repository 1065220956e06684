//! Chirp Query Engine
//!
//! Turns stored build and push timestamps into a ranked report of
//! push-to-build latencies ("chirps").
//!
//! ## Algorithm
//!
//! 1. Enumerate `travis:timestamps:{repo_filter}:{partition_filter}:*`
//! 2. Decode each key into `(repo, partition, commit)`; undecodable keys are skipped
//! 3. Point-read the build timestamp and the matching push timestamp
//! 4. Derive `delta = build - push` and `age = now - build`
//! 5. Unless unfiltered, drop chirps with a zero side or a negative delta
//! 6. Stable sort, descending by build timestamp
//! 7. Truncate to `limit`
//!
//! Point reads are issued through a bounded buffer of
//! `query_read_concurrency` futures. Results come back in enumeration order,
//! so ties in step 6 keep lexicographic key order.
//!
//! Missing or malformed values read as `0` and never abort a query. Store
//! failures propagate.

use bytes::Bytes;
use chirp_observability::metrics;
use chirp_store::KeyValueStore;
use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;

use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::keys::{self, BuildKey};
use crate::types::{Chirp, ChirpReport, ReportMeta};

/// Filter value meaning "everything".
pub const MATCH_ALL: &str = "*";

/// Trim a user-supplied glob down to its safe prefix.
///
/// Characters are kept while they are ASCII alphanumerics or one of
/// `_ / . * -`. Everything from the first other character on is discarded,
/// so `"foo;bar"` becomes `"foo"` rather than an error. A filter that
/// sanitizes to the empty string is kept as-is and matches no keys.
pub fn sanitize_filter(raw: &str) -> String {
    raw.chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '/' | '.' | '*' | '-'))
        .collect()
}

/// Parse a `limit` query parameter.
///
/// `None` yields `default`. The value is sanitized like a filter before
/// parsing, and anything below 1 is clamped to 1.
pub fn parse_limit(raw: Option<&str>, default: usize) -> Result<usize> {
    let Some(raw) = raw else {
        return Ok(default.max(1));
    };

    let sanitized = sanitize_filter(raw.trim());
    let limit: i64 = sanitized
        .parse()
        .map_err(|_| TrackerError::validation(format!("invalid limit: {}", raw)))?;

    Ok(clamp_limit(limit))
}

fn clamp_limit(limit: i64) -> usize {
    usize::try_from(limit.max(1)).unwrap_or(usize::MAX)
}

/// A request for a chirp report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChirpQuery {
    pub repo_filter: String,
    pub partition_filter: String,
    pub limit: usize,
    /// Keep incomplete and negative-delta chirps
    pub include_unfiltered: bool,
}

impl ChirpQuery {
    /// Build a query, sanitizing both filters and clamping `limit` to at least 1.
    pub fn new(repo_filter: &str, partition_filter: &str, limit: i64, include_unfiltered: bool) -> Self {
        Self {
            repo_filter: sanitize_filter(repo_filter),
            partition_filter: sanitize_filter(partition_filter),
            limit: clamp_limit(limit),
            include_unfiltered,
        }
    }

    /// Every repository and partition, filtered.
    pub fn all(limit: usize) -> Self {
        Self {
            repo_filter: MATCH_ALL.to_string(),
            partition_filter: MATCH_ALL.to_string(),
            limit: limit.max(1),
            include_unfiltered: false,
        }
    }
}

/// Read side of the tracker.
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn KeyValueStore>,
    config: Arc<TrackerConfig>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn KeyValueStore>, config: Arc<TrackerConfig>) -> Self {
        Self { store, config }
    }

    /// Report as of the current wall clock.
    pub async fn query_chirps(&self, query: &ChirpQuery) -> Result<ChirpReport> {
        self.query_chirps_at(query, Utc::now().timestamp()).await
    }

    /// Report as of `now` (Unix seconds).
    pub async fn query_chirps_at(&self, query: &ChirpQuery, now: i64) -> Result<ChirpReport> {
        let start = Instant::now();
        let pattern = keys::build_timestamp_pattern(&query.repo_filter, &query.partition_filter);

        let build_keys = self.store.keys(&pattern).await.map_err(|e| {
            metrics::STORE_ERRORS_TOTAL.with_label_values(&["keys"]).inc();
            e
        })?;

        let decoded: Vec<(String, BuildKey)> = build_keys
            .into_iter()
            .filter_map(|key| match keys::decode_build_timestamp_key(&key) {
                Ok(build_key) => Some((key, build_key)),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Skipping undecodable key");
                    None
                }
            })
            .collect();

        let mut chirps: Vec<Chirp> = stream::iter(decoded)
            .map(|(key, build_key)| self.resolve(key, build_key, now))
            .buffered(self.config.read_concurrency())
            .try_collect()
            .await?;

        tracing::info!(pattern = %pattern, count = chirps.len(), "Resolved chirps");

        if !query.include_unfiltered {
            chirps.retain(Chirp::is_complete);
        }

        tracing::info!(
            pattern = %pattern,
            count = chirps.len(),
            unfiltered = query.include_unfiltered,
            "Filtered chirps"
        );

        // Stable, so equal build timestamps keep key order
        chirps.sort_by(|a, b| b.build_timestamp.cmp(&a.build_timestamp));

        let total_matched = chirps.len();
        let most_recent = chirps.first().cloned();
        chirps.truncate(query.limit);

        metrics::QUERIES_TOTAL.inc();
        metrics::QUERY_LATENCY
            .with_label_values(&[if query.include_unfiltered { "false" } else { "true" }])
            .observe(start.elapsed().as_secs_f64());

        Ok(ChirpReport {
            chirps,
            meta: ReportMeta {
                repo_filter: query.repo_filter.clone(),
                partition_filter: query.partition_filter.clone(),
                limit: query.limit,
                total_matched,
                most_recent,
            },
        })
    }

    async fn resolve(&self, build_key: String, decoded: BuildKey, now: i64) -> Result<Chirp> {
        let push_key = keys::push_timestamp_key(&decoded.repo, &decoded.commit);

        let build_timestamp = self.read_timestamp(&build_key).await?;
        let push_timestamp = self.read_timestamp(&push_key).await?;

        Ok(Chirp::new(
            decoded.repo,
            decoded.partition,
            decoded.commit,
            push_timestamp,
            build_timestamp,
            now,
        ))
    }

    async fn read_timestamp(&self, key: &str) -> Result<i64> {
        let value = self.store.get(key).await.map_err(|e| {
            metrics::STORE_ERRORS_TOTAL.with_label_values(&["get"]).inc();
            e
        })?;

        Ok(match value {
            Some(raw) => decode_timestamp(key, &raw),
            None => 0,
        })
    }
}

/// Decimal seconds; float values written by older producers are truncated.
fn decode_timestamp(key: &str, raw: &Bytes) -> i64 {
    let text = std::str::from_utf8(raw).unwrap_or("").trim();

    if let Ok(seconds) = text.parse::<i64>() {
        return seconds;
    }
    match text.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() => seconds.trunc() as i64,
        _ => {
            tracing::warn!(key = %key, "Malformed timestamp value, reading as 0");
            0
        }
    }
}

//! Webhook body parsing
//!
//! Turns provider-shaped JSON bodies into [`PushEvent`] and
//! [`BuildNotification`] values. Nothing here touches the store, so every
//! validation failure happens before a write.
//!
//! ## Push bodies
//!
//! ```json
//! { "head_commit": { "id": "c1" }, "repository": { "full_name": "owner/name" } }
//! ```
//!
//! ## Build bodies
//!
//! ```json
//! {
//!   "commit": "c1",
//!   "repository": { "owner_name": "owner", "name": "name" },
//!   "matrix": [
//!     { "config": { "env": "QUEUE=fast FOO=bar" }, "finished_at": "2016-01-01T00:02:30Z" }
//!   ]
//! }
//! ```
//!
//! Each matrix leg contributes one partition. The partition id comes from the
//! `QUEUE=` token of the leg's first env string, with surrounding quotes
//! trimmed; legs without one become `"unknown"`. Legs that have not finished
//! (`finished_at` missing or null) are skipped. When two legs share a
//! partition the later one wins.

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, TrackerError};
use crate::types::{BuildNotification, PartitionResult, PushEvent, UNKNOWN_PARTITION};

/// Env token naming the partition.
const PARTITION_TOKEN: &str = "QUEUE";

/// Naive formats accepted for `finished_at`, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S UTC",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

#[derive(Debug, Deserialize)]
struct PushBody {
    head_commit: Option<HeadCommit>,
    repository: Option<PushRepository>,
}

#[derive(Debug, Deserialize)]
struct HeadCommit {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PushRepository {
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BuildBody {
    commit: Option<String>,
    repository: Option<BuildRepository>,
    matrix: Option<Vec<MatrixEntry>>,
}

#[derive(Debug, Deserialize)]
struct BuildRepository {
    owner_name: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatrixEntry {
    config: Option<MatrixConfig>,
    finished_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatrixConfig {
    env: Option<Value>,
}

/// Parse a push notification received at `received_at`.
///
/// # Errors
///
/// - `Parse`: body is not JSON (or not an object)
/// - `Validation`: `head_commit.id` or `repository.full_name` is missing
pub fn parse_push_notification(raw: Bytes, received_at: DateTime<Utc>) -> Result<PushEvent> {
    let body: PushBody = serde_json::from_slice(&raw)?;

    let commit = body
        .head_commit
        .and_then(|c| c.id)
        .ok_or_else(|| TrackerError::validation("missing expected payload keys: head_commit.id"))?;
    let repo = body
        .repository
        .and_then(|r| r.full_name)
        .ok_or_else(|| {
            TrackerError::validation("missing expected payload keys: repository.full_name")
        })?;

    Ok(PushEvent {
        repo,
        commit,
        received_at,
        raw_payload: raw,
    })
}

/// Parse a build result notification into its per-partition results.
///
/// # Errors
///
/// - `Parse`: body is not JSON (or not an object)
/// - `Validation`: `commit`, `repository.owner_name` or `repository.name` is
///   missing, or a leg's `finished_at` cannot be parsed
pub fn parse_build_notification(raw: Bytes) -> Result<BuildNotification> {
    let body: BuildBody = serde_json::from_slice(&raw)?;

    let commit = body
        .commit
        .ok_or_else(|| TrackerError::validation("missing expected payload keys: commit"))?;
    let repository = body
        .repository
        .ok_or_else(|| TrackerError::validation("missing expected payload keys: repository"))?;
    let owner = repository.owner_name.ok_or_else(|| {
        TrackerError::validation("missing expected payload keys: repository.owner_name")
    })?;
    let name = repository
        .name
        .ok_or_else(|| TrackerError::validation("missing expected payload keys: repository.name"))?;

    let mut partitions: Vec<PartitionResult> = Vec::new();
    for (index, entry) in body.matrix.unwrap_or_default().into_iter().enumerate() {
        let Some(finished_at) = entry.finished_at else {
            tracing::debug!(commit = %commit, index, "Skipping unfinished matrix leg");
            continue;
        };
        let finished_at = parse_finished_at(&finished_at)?;
        let partition = extract_partition(entry.config.as_ref().and_then(|c| c.env.as_ref()));

        // Later legs for the same partition win
        match partitions.iter_mut().find(|p| p.partition == partition) {
            Some(existing) => existing.finished_at = finished_at,
            None => partitions.push(PartitionResult::new(partition, finished_at)),
        }
    }

    Ok(BuildNotification {
        repo: format!("{}/{}", owner, name),
        commit,
        partitions,
        raw_payload: raw,
    })
}

/// Derive a partition id from a matrix leg's `config.env`.
///
/// `env` may be a string or a list of strings; only the first string is
/// inspected. Returns `"unknown"` when there is no usable `QUEUE=` token.
pub fn extract_partition(env: Option<&Value>) -> String {
    let first = match env {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Array(items)) => items.first().and_then(Value::as_str),
        _ => None,
    };

    first
        .into_iter()
        .flat_map(str::split_whitespace)
        .filter_map(|token| token.split_once('='))
        .filter(|(key, _)| *key == PARTITION_TOKEN)
        .last()
        .map(|(_, value)| trim_quotes(value))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_PARTITION.to_string())
}

/// Strip at most one leading and one trailing quote character.
fn trim_quotes(value: &str) -> &str {
    let is_quote = |c: char| c == '\'' || c == '"';
    let value = value.strip_suffix(is_quote).unwrap_or(value);
    value.strip_prefix(is_quote).unwrap_or(value)
}

fn parse_finished_at(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| TrackerError::validation(format!("invalid finished_at timestamp: {}", raw)))
}

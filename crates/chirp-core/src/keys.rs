//! Key Scheme
//!
//! Every record the tracker stores is addressed by a colon-delimited key:
//!
//! ```text
//! github:payloads:{repo}:{commit}
//! github:timestamps:{repo}:{commit}
//! travis:payloads:{repo}:{partition}:{commit}
//! travis:timestamps:{repo}:{partition}:{commit}
//! ```
//!
//! Push records join build records on `(repo, commit)`. The layout is shared
//! by the recorder and the query engine and must not change without a
//! migration: records written under an old layout become invisible to queries.
//!
//! Components may not be empty or contain `:`. Repositories contain `/`
//! (`owner/name`), which is fine.

use std::fmt;
use thiserror::Error;

/// Key field delimiter.
pub const DELIMITER: char = ':';

/// Source of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Source-control push notification
    Push,
    /// Continuous-integration build result
    Build,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Push => "github",
            EventKind::Build => "travis",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a key's value holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// The raw notification body
    Payload,
    /// Decimal Unix timestamp in seconds
    Timestamp,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Payload => "payloads",
            RecordKind::Timestamp => "timestamps",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid {field}: {reason}")]
    InvalidComponent { field: &'static str, reason: String },

    #[error("malformed key: {0}")]
    Malformed(String),
}

/// Decoded build timestamp key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildKey {
    pub repo: String,
    pub partition: String,
    pub commit: String,
}

/// Reject values that would break the key layout.
pub fn validate_component(field: &'static str, value: &str) -> Result<(), KeyError> {
    if value.is_empty() {
        return Err(KeyError::InvalidComponent {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    if value.contains(DELIMITER) {
        return Err(KeyError::InvalidComponent {
            field,
            reason: format!("must not contain '{}': {}", DELIMITER, value),
        });
    }
    Ok(())
}

fn push_key(record: RecordKind, repo: &str, commit: &str) -> String {
    format!(
        "{}:{}:{}:{}",
        EventKind::Push.as_str(),
        record.as_str(),
        repo,
        commit
    )
}

fn build_key(record: RecordKind, repo: &str, partition: &str, commit: &str) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        EventKind::Build.as_str(),
        record.as_str(),
        repo,
        partition,
        commit
    )
}

pub fn push_payload_key(repo: &str, commit: &str) -> String {
    push_key(RecordKind::Payload, repo, commit)
}

pub fn push_timestamp_key(repo: &str, commit: &str) -> String {
    push_key(RecordKind::Timestamp, repo, commit)
}

pub fn build_payload_key(repo: &str, partition: &str, commit: &str) -> String {
    build_key(RecordKind::Payload, repo, partition, commit)
}

pub fn build_timestamp_key(repo: &str, partition: &str, commit: &str) -> String {
    build_key(RecordKind::Timestamp, repo, partition, commit)
}

/// Glob pattern enumerating build timestamp keys for the given filters.
///
/// Filters are interpolated verbatim; sanitize them first.
pub fn build_timestamp_pattern(repo_glob: &str, partition_glob: &str) -> String {
    build_key(RecordKind::Timestamp, repo_glob, partition_glob, "*")
}

/// Split a build timestamp key back into its components.
pub fn decode_build_timestamp_key(key: &str) -> Result<BuildKey, KeyError> {
    let mut fields = key.split(DELIMITER);

    let (Some(source), Some(record), Some(repo), Some(partition), Some(commit), None) = (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) else {
        return Err(KeyError::Malformed(format!(
            "expected 5 fields in build timestamp key: {}",
            key
        )));
    };

    if source != EventKind::Build.as_str() || record != RecordKind::Timestamp.as_str() {
        return Err(KeyError::Malformed(format!(
            "not a build timestamp key: {}",
            key
        )));
    }

    for (field, value) in [("repo", repo), ("partition", partition), ("commit", commit)] {
        if value.is_empty() {
            return Err(KeyError::Malformed(format!("empty {} in key: {}", field, key)));
        }
    }

    Ok(BuildKey {
        repo: repo.to_string(),
        partition: partition.to_string(),
        commit: commit.to_string(),
    })
}

//! Event Recorder
//!
//! Persists normalized push and build events under the key scheme in
//! [`crate::keys`]. Every write is `set_with_expiry` with the configured
//! retention, so records disappear on their own; the recorder never deletes.
//!
//! ## Write Path
//!
//! ```text
//! PushEvent          → github:payloads:{repo}:{commit}             (raw body)
//!                    → github:timestamps:{repo}:{commit}           (received_at)
//!
//! BuildNotification  → for each partition:
//!                      travis:payloads:{repo}:{partition}:{commit}   (raw body)
//!                      travis:timestamps:{repo}:{partition}:{commit} (finished_at)
//! ```
//!
//! All validation runs before the first write. Writes across partitions are
//! not atomic: if the store fails halfway through a build, the partitions
//! already written stay written.

use bytes::Bytes;
use chirp_observability::metrics;
use chirp_store::KeyValueStore;
use std::sync::Arc;

use crate::config::{TrackerConfig, UnknownPartitionPolicy};
use crate::error::Result;
use crate::keys::{self, EventKind};
use crate::types::{BuildEvent, BuildNotification, PushEvent};

/// Writes correlatable records into the key/value store.
#[derive(Clone)]
pub struct EventRecorder {
    store: Arc<dyn KeyValueStore>,
    config: Arc<TrackerConfig>,
}

impl EventRecorder {
    pub fn new(store: Arc<dyn KeyValueStore>, config: Arc<TrackerConfig>) -> Self {
        Self { store, config }
    }

    /// Record a push: payload and receipt timestamp under `(repo, commit)`.
    ///
    /// # Errors
    ///
    /// - `Validation`: `repo` or `commit` is empty or contains `:`
    /// - `Store`: a write failed
    pub async fn record_push(&self, event: &PushEvent) -> Result<()> {
        keys::validate_component("repo", &event.repo)?;
        keys::validate_component("commit", &event.commit)?;

        let timestamp = event.received_at.timestamp();

        self.write(
            keys::push_payload_key(&event.repo, &event.commit),
            event.raw_payload.clone(),
        )
        .await?;
        self.write(
            keys::push_timestamp_key(&event.repo, &event.commit),
            timestamp_value(timestamp),
        )
        .await?;

        metrics::EVENTS_RECORDED_TOTAL
            .with_label_values(&[EventKind::Push.as_str()])
            .inc();

        tracing::info!(
            repo = %event.repo,
            commit = %event.commit,
            timestamp,
            "Recorded push"
        );

        Ok(())
    }

    /// Record a build: one payload/timestamp pair per partition.
    ///
    /// Each partition is stamped with its own `finished_at`, so legs of the
    /// same commit resolve to different deltas. Returns the number of
    /// partitions written.
    ///
    /// # Errors
    ///
    /// - `Validation`: `repo`, `commit` or a partition id is empty or contains `:`
    /// - `Store`: a write failed (earlier partitions remain written)
    pub async fn record_build(&self, notification: &BuildNotification) -> Result<usize> {
        keys::validate_component("repo", &notification.repo)?;
        keys::validate_component("commit", &notification.commit)?;
        for partition in &notification.partitions {
            keys::validate_component("partition", &partition.partition)?;
        }

        let drop_unknown = self.config.unknown_partitions == UnknownPartitionPolicy::Drop;
        let mut written = 0;

        for event in notification.events() {
            if drop_unknown && event.partition == crate::types::UNKNOWN_PARTITION {
                metrics::BUILD_PARTITIONS_DROPPED_TOTAL.inc();
                tracing::debug!(
                    repo = %event.repo,
                    commit = %event.commit,
                    "Dropping build leg with unknown partition"
                );
                continue;
            }

            self.write_build_event(&event).await?;
            written += 1;
        }

        metrics::EVENTS_RECORDED_TOTAL
            .with_label_values(&[EventKind::Build.as_str()])
            .inc();

        tracing::info!(
            repo = %notification.repo,
            commit = %notification.commit,
            partitions = written,
            "Recorded build"
        );

        Ok(written)
    }

    async fn write_build_event(&self, event: &BuildEvent) -> Result<()> {
        self.write(
            keys::build_payload_key(&event.repo, &event.partition, &event.commit),
            event.raw_payload.clone(),
        )
        .await?;
        self.write(
            keys::build_timestamp_key(&event.repo, &event.partition, &event.commit),
            timestamp_value(event.finished_at.timestamp()),
        )
        .await?;

        metrics::BUILD_PARTITIONS_RECORDED_TOTAL.inc();

        Ok(())
    }

    async fn write(&self, key: String, value: Bytes) -> Result<()> {
        tracing::debug!(key = %key, bytes = value.len(), "Writing key");
        self.store
            .set_with_expiry(&key, value, self.config.retention())
            .await
            .map_err(|e| {
                metrics::STORE_ERRORS_TOTAL.with_label_values(&["set"]).inc();
                tracing::error!(key = %key, error = %e, "Store write failed");
                e
            })?;
        Ok(())
    }
}

/// Timestamps are stored as decimal integer seconds.
fn timestamp_value(seconds: i64) -> Bytes {
    Bytes::from(seconds.to_string())
}

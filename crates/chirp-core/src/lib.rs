//! Chirp Tracker Core
//!
//! Correlates source-control pushes with continuous-integration build results
//! and reports how long each commit took to build ("chirp delta").
//!
//! ## Overview
//!
//! Two webhook streams arrive independently:
//! - **Push notifications** record when a commit reached the repository
//! - **Build notifications** record when each partition (queue) of a build
//!   matrix finished for a commit
//!
//! Both are written into a TTL key/value store under keys that share
//! `(repo, commit)`. Nothing correlates them on write; the [`QueryEngine`]
//! joins them lazily when a report is requested.
//!
//! ## Architecture
//!
//! ```text
//!  push body ──► parse_push_notification ──┐
//!                                          ├──► EventRecorder ──► KeyValueStore
//! build body ──► parse_build_notification ─┘                           │
//!                                                                      │ keys / get
//!                                     ChirpReport ◄── QueryEngine ◄────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use chirp_core::{ChirpQuery, EventRecorder, QueryEngine, TrackerConfig};
//! use std::sync::Arc;
//!
//! let store = chirp_store::connect("memory").await?;
//! let config = Arc::new(TrackerConfig::default());
//!
//! let recorder = EventRecorder::new(store.clone(), config.clone());
//! recorder.record_push(&push).await?;
//! recorder.record_build(&build).await?;
//!
//! let engine = QueryEngine::new(store, config);
//! let report = engine.query_chirps(&ChirpQuery::all(10)).await?;
//! ```

pub mod config;
pub mod error;
pub mod keys;
pub mod notification;
pub mod query;
pub mod recorder;
pub mod types;

pub use config::{TrackerConfig, UnknownPartitionPolicy};
pub use error::{Result, TrackerError};
pub use keys::{BuildKey, KeyError};
pub use notification::{extract_partition, parse_build_notification, parse_push_notification};
pub use query::{parse_limit, sanitize_filter, ChirpQuery, QueryEngine, MATCH_ALL};
pub use recorder::EventRecorder;
pub use types::{
    BuildEvent, BuildNotification, Chirp, ChirpReport, PartitionResult, PushEvent, ReportMeta,
    UNKNOWN_PARTITION,
};

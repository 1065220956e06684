//! API models for REST endpoints

use chirp_core::{Chirp, ChirpReport};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OkResponse {
    pub ok: String,
    /// Build partitions written (build notifications only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partitions: Option<usize>,
}

impl OkResponse {
    pub fn new(ok: &str) -> Self {
        Self {
            ok: ok.to_string(),
            partitions: None,
        }
    }

    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = Some(partitions);
        self
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Query string of `GET /chirps`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ChirpsParams {
    pub repo: Option<String>,
    pub partition: Option<String>,
    pub queue: Option<String>,
    pub branch: Option<String>,
    pub limit: Option<String>,
    pub nofilter: Option<String>,
    pub unfiltered: Option<String>,
}

impl ChirpsParams {
    /// First of `partition`, `queue`, `branch` that is present.
    pub fn partition_filter(&self) -> Option<&str> {
        self.partition
            .as_deref()
            .or(self.queue.as_deref())
            .or(self.branch.as_deref())
    }

    pub fn include_unfiltered(&self) -> bool {
        [&self.nofilter, &self.unfiltered]
            .into_iter()
            .flatten()
            .any(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChirpResponse {
    pub repo: String,
    pub partition: String,
    pub commit: String,
    pub push_timestamp: i64,
    pub build_timestamp: i64,
    pub delta: i64,
    pub age: i64,
}

impl From<Chirp> for ChirpResponse {
    fn from(chirp: Chirp) -> Self {
        Self {
            repo: chirp.repo,
            partition: chirp.partition,
            commit: chirp.commit,
            push_timestamp: chirp.push_timestamp,
            build_timestamp: chirp.build_timestamp,
            delta: chirp.delta,
            age: chirp.age,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChirpsMeta {
    pub repo_filter: String,
    pub partition_filter: String,
    pub limit: usize,
    pub total_matched: usize,
    pub most_recent: Option<ChirpResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChirpsResponse {
    pub data: Vec<ChirpResponse>,
    pub meta: ChirpsMeta,
}

impl From<ChirpReport> for ChirpsResponse {
    fn from(report: ChirpReport) -> Self {
        Self {
            data: report.chirps.into_iter().map(ChirpResponse::from).collect(),
            meta: ChirpsMeta {
                repo_filter: report.meta.repo_filter,
                partition_filter: report.meta.partition_filter,
                limit: report.meta.limit,
                total_matched: report.meta.total_matched,
                most_recent: report.meta.most_recent.map(ChirpResponse::from),
            },
        }
    }
}

/// One timing sample posted to `/stats`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsRecord {
    #[schema(value_type = Object)]
    pub script: serde_json::Value,
    #[schema(value_type = Object)]
    pub exe_time: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsRequest {
    pub data: Vec<StatsRecord>,
}

//! Build script timing samples
//!
//! Workers post `{"data":[{"script":..,"exe_time":..}]}` and the samples are
//! forwarded to the log stream as l2met measurements, one
//! `sample#chirp.{site}.{queue}.{script}={exe_time}` pair per record, all in
//! a single log line.

use axum::{
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::{json, Value};

use crate::{
    error::{ApiError, ErrorResponse},
    models::*,
};

const QUEUE_HEADER: &str = "travis-queue";
const SITE_HEADER: &str = "travis-site";
const UNKNOWN: &str = "unknown";

#[utoipa::path(
    post,
    path = "/stats",
    request_body = StatsRequest,
    params(
        ("Travis-Queue" = Option<String>, Header, description = "Queue the samples came from"),
        ("Travis-Site" = Option<String>, Header, description = "Site the samples came from")
    ),
    responses(
        (status = 200, description = "Samples logged", body = OkResponse),
        (status = 400, description = "Invalid JSON or record format", body = ErrorResponse)
    ),
    tag = "stats"
)]
pub async fn receive_stats(headers: HeaderMap, body: Bytes) -> Result<Response, ApiError> {
    let queue = header_or_unknown(&headers, QUEUE_HEADER);
    let site = header_or_unknown(&headers, SITE_HEADER);

    let stats: Value =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let data = stats
        .get("data")
        .ok_or_else(|| ApiError::BadRequest("missing data key".to_string()))?;

    let records = data
        .as_array()
        .ok_or_else(|| ApiError::BadRequest("incorrect record format".to_string()))?;

    let measurements = records
        .iter()
        .map(|record| {
            let script = record.get("script");
            let exe_time = record.get("exe_time");
            match (script, exe_time) {
                (Some(script), Some(exe_time)) => Ok(format!(
                    "sample#chirp.{}.{}.{}={}",
                    site,
                    queue,
                    render(script),
                    render(exe_time)
                )),
                _ => Err(ApiError::BadRequest("incorrect record format".to_string())),
            }
        })
        .collect::<Result<Vec<String>, ApiError>>()?;

    if measurements.is_empty() {
        return Ok(Json(json!({"huh": "what"})).into_response());
    }

    tracing::info!(
        target: "chirp::stats",
        samples = measurements.len(),
        "{}",
        measurements.join(" ")
    );

    Ok(Json(OkResponse::new("great")).into_response())
}

fn header_or_unknown(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// Strings render bare, everything else as JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

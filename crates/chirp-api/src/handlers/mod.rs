//! Request handlers

pub mod chirps;
pub mod github;
pub mod health;
pub mod kb;
pub mod stats;
pub mod travis;

use axum::http::{header::CONTENT_TYPE, HeaderMap};
use bytes::Bytes;
use chirp_observability::metrics;

use crate::error::ApiError;

/// Pull the notification JSON out of a webhook request.
///
/// Webhooks arrive either form-encoded with the JSON in a `payload` field,
/// or with the JSON as the whole body under `Content-Type: application/json`.
pub(crate) fn extract_payload(headers: &HeaderMap, body: &Bytes) -> Result<Bytes, ApiError> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    if is_json {
        if body.is_empty() {
            return Err(ApiError::MissingPayload);
        }
        return Ok(body.clone());
    }

    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| Bytes::from(value.into_owned()))
        .ok_or(ApiError::MissingPayload)
}

/// Count a webhook by source and outcome.
pub(crate) fn observe_webhook<T>(source: &str, result: &Result<T, ApiError>) {
    let outcome = match result {
        Ok(_) => "accepted",
        Err(e) if e.status_code().is_server_error() => "failed",
        Err(_) => "rejected",
    };
    metrics::WEBHOOKS_RECEIVED_TOTAL
        .with_label_values(&[source, outcome])
        .inc();
}

//! Byte throughput test endpoints
//!
//! `GET /kb/:kb` streams `kb` kilobytes of `z` in 1000-byte chunks.
//! `POST /kb/:kb` accepts a multipart upload and checks that its `bytes`
//! field is exactly `kb` kilobytes. The upload is counted as it streams in
//! and never buffered whole.

use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use std::convert::Infallible;

use crate::{
    error::{ApiError, ErrorResponse},
    models::*,
    AppState,
};

/// Bytes per kilobyte on these endpoints.
pub const KB: usize = 1000;

/// Allowance for multipart boundaries and part headers on top of `MAX_KB`.
pub const MULTIPART_OVERHEAD: u64 = 16 * 1024;

static CHUNK: [u8; KB] = [b'z'; KB];

#[utoipa::path(
    get,
    path = "/kb/{kb}",
    params(
        ("kb" = f64, Path, description = "Kilobytes to stream")
    ),
    responses(
        (status = 200, description = "Stream of `z` bytes", body = String, content_type = "application/octet-stream"),
        (status = 400, description = "Invalid or too large kb", body = ErrorResponse)
    ),
    tag = "kb"
)]
pub async fn download_kb(
    State(state): State<AppState>,
    Path(kb): Path<String>,
) -> Result<Response, ApiError> {
    let kilobytes: f64 = kb
        .trim()
        .parse()
        .ok()
        .filter(|k: &f64| k.is_finite() && *k >= 0.0)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid kb: {}", kb)))?;

    if kilobytes > state.config.max_kb as f64 {
        return Err(ApiError::BadRequest("too much kb".to_string()));
    }

    let chunks = kilobytes.ceil() as u64;
    tracing::debug!(kilobytes, chunks, "Streaming kb");

    let stream = futures::stream::iter(
        (0..chunks).map(|_| Ok::<_, Infallible>(Bytes::from_static(&CHUNK))),
    );

    Ok((
        [(CONTENT_TYPE, "application/octet-stream")],
        Body::from_stream(stream),
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/kb/{kb}",
    params(
        ("kb" = u64, Path, description = "Expected upload size in kilobytes")
    ),
    request_body(content = String, description = "Multipart form with a `bytes` file field", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Upload matched the expected size", body = OkResponse),
        (status = 400, description = "Missing field, too much kb or size mismatch", body = ErrorResponse)
    ),
    tag = "kb"
)]
pub async fn upload_kb(
    State(state): State<AppState>,
    Path(kb): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    let expected: u64 = kb
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid kb: {}", kb)))?;

    if expected > state.config.max_kb {
        return Err(ApiError::BadRequest("too much kb".to_string()));
    }

    let mut multipart = multipart.map_err(|_| missing_bytes())?;
    let expected_bytes = expected.saturating_mul(KB as u64);

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("bytes") {
            continue;
        }

        // Count chunks as they arrive; stop as soon as the upload overshoots.
        let mut received: u64 = 0;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            received += chunk.len() as u64;
            if received > expected_bytes {
                tracing::info!(expected, received, "Upload exceeded expected size");
                return Err(ApiError::BadRequest(format!(
                    "mismatched size: expected={} actual>{}",
                    expected, expected
                )));
            }
        }

        let size_kb = received as f64 / KB as f64;
        tracing::info!(size_kb, "Received file upload");

        if received != expected_bytes {
            return Err(ApiError::BadRequest(format!(
                "mismatched size: expected={} actual={}",
                expected, size_kb
            )));
        }

        return Ok(Json(OkResponse::new("wow")));
    }

    Err(missing_bytes())
}

fn missing_bytes() -> ApiError {
    ApiError::BadRequest("missing bytes param".to_string())
}

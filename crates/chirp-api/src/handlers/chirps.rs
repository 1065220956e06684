//! Chirp report endpoint

use axum::{
    extract::{Query, State},
    Json,
};
use chirp_core::{parse_limit, ChirpQuery, MATCH_ALL};

use crate::{
    error::{ApiError, ErrorResponse},
    models::*,
    AppState,
};

#[utoipa::path(
    get,
    path = "/chirps",
    params(
        ("repo" = Option<String>, Query, description = "Repository glob (default: *)"),
        ("partition" = Option<String>, Query, description = "Partition glob (default: *); `queue` and `branch` are aliases"),
        ("limit" = Option<String>, Query, description = "Maximum chirps returned (default: 100, minimum: 1)"),
        ("nofilter" = Option<String>, Query, description = "`1` or `true` keeps incomplete and negative chirps")
    ),
    responses(
        (status = 200, description = "Ranked chirps", body = ChirpsResponse),
        (status = 400, description = "Invalid limit", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    ),
    tag = "chirps"
)]
pub async fn list_chirps(
    State(state): State<AppState>,
    Query(params): Query<ChirpsParams>,
) -> Result<Json<ChirpsResponse>, ApiError> {
    let limit = parse_limit(
        params.limit.as_deref(),
        state.config.tracker.default_query_limit,
    )?;

    let query = ChirpQuery::new(
        params.repo.as_deref().unwrap_or(MATCH_ALL),
        params.partition_filter().unwrap_or(MATCH_ALL),
        i64::try_from(limit).unwrap_or(i64::MAX),
        params.include_unfiltered(),
    );

    let report = state.query.query_chirps(&query).await?;

    Ok(Json(ChirpsResponse::from(report)))
}

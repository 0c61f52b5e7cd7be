//! Handler for link statistics.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::api::dto::stats::{LinkStatsResponse, StatsQuery};
use crate::error::AppError;
use crate::state::AppState;

/// Returns the reconciled statistics of a link.
///
/// # Endpoint
///
/// `GET /api/shortlink/{id}/stats?from=2024-05-01&to=2024-05-31`
///
/// Values are those written by the last reconciliation, so they trail live
/// traffic by up to one reconciliation interval.
///
/// # Errors
///
/// Returns 400 Bad Request if `from` is after `to`.
/// Returns 404 Not Found if the link doesn't exist.
pub async fn link_stats_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<LinkStatsResponse>, AppError> {
    let stats = state
        .stats_service
        .link_stats(id, query.from, query.to)
        .await?;

    Ok(Json(stats.into()))
}

//! Handlers for link management endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use validator::Validate;

use crate::api::dto::links::{
    CreateLinkRequest, LinkListResponse, LinkResponse, LinkStatusRequest, ListLinksQuery,
    UpdateLinkRequest,
};
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short link.
///
/// # Endpoint
///
/// `POST /api/shortlink`
///
/// # Request Body
///
/// ```json
/// {
///   "shortCode": "promo",
///   "targetUrl": "https://example.com/a",
///   "redirectCode": 302,   // optional, 301 or 302
///   "disabled": false      // optional
/// }
/// ```
///
/// # Errors
///
/// Returns 400 Bad Request if validation fails.
/// Returns 409 Conflict if the code is already taken.
pub async fn create_link_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    payload.validate()?;

    let link = state.link_service.create(payload.into()).await?;

    Ok((StatusCode::CREATED, Json(link.into())))
}

/// Lists short links, newest first.
///
/// # Endpoint
///
/// `GET /api/shortlink?page=1&size=10&shortCode=pro&targetUrl=example&redirectCode=302&disabled=false`
///
/// All filters are optional. `shortCode` and `targetUrl` match substrings.
///
/// # Errors
///
/// Returns 400 Bad Request for `page < 1` or `size` outside `1..=100`.
pub async fn list_links_handler(
    State(state): State<AppState>,
    Query(query): Query<ListLinksQuery>,
) -> Result<Json<LinkListResponse>, AppError> {
    let (page, size) = query.pagination.page_and_size();

    let result = state.link_service.list(query.filter(), page, size).await?;

    Ok(Json(result.into()))
}

/// Fetches one link.
///
/// `GET /api/shortlink/{id}`
pub async fn get_link_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<LinkResponse>, AppError> {
    let link = state.link_service.get(id).await?;
    Ok(Json(link.into()))
}

/// Replaces the destination and redirect type of a link.
///
/// # Endpoint
///
/// `PUT /api/shortlink/{id}`
///
/// When `disabled` is present and differs from the stored flag, the
/// disable or enable transition runs first: statistics are flushed and the
/// unique-visitor sketch is backed up (disable) or restored (enable).
///
/// # Errors
///
/// Returns 404 Not Found if the link doesn't exist.
/// Returns 409 Conflict if the link was modified concurrently.
/// Returns 500 Internal Server Error if statistics could not be synchronized.
pub async fn update_link_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateLinkRequest>,
) -> Result<Json<LinkResponse>, AppError> {
    payload.validate()?;

    let link = state.sync_service.update_link(id, payload.into()).await?;

    Ok(Json(link.into()))
}

/// Enables or disables a link.
///
/// # Endpoint
///
/// `PUT /api/shortlink/status/{id}`
///
/// ```json
/// { "disabled": true }
/// ```
///
/// Setting the current value again is a no-op.
pub async fn update_status_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<LinkStatusRequest>,
) -> Result<Json<LinkResponse>, AppError> {
    let link = state.sync_service.set_disabled(id, payload.disabled).await?;

    Ok(Json(link.into()))
}

/// Deletes a link together with its daily statistics and live counters.
///
/// # Endpoint
///
/// `DELETE /api/shortlink/{id}`
///
/// Deleting a link that no longer exists succeeds.
pub async fn delete_link_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.sync_service.delete_link(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

//! Handler for short URL redirect.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::net::SocketAddr;

use crate::domain::entities::ShortLink;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::client_ip;

const NO_CACHE: HeaderValue = HeaderValue::from_static("no-cache, no-store, must-revalidate");

/// Redirects a short code to its destination.
///
/// # Endpoint
///
/// `GET /{*code}`
///
/// The whole path after the leading slash is the code, so codes containing `/`
/// resolve as one unit.
///
/// # Request Flow
///
/// 1. Determine the visitor address (peer socket, or forwarding headers when
///    running behind a proxy)
/// 2. Resolve through the redirect service (cache, then database)
/// 3. Answer with the link's own redirect code and a `Location` header
///
/// Temporary redirects carry `Cache-Control: no-cache` so browsers come back and
/// every visit is counted.
///
/// # Errors
///
/// Returns 404 Not Found for unknown, disabled or malformed codes.
/// Returns 500 Internal Server Error if the database is unreachable on a cache miss.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Response, AppError> {
    let visitor = client_ip(&headers, addr, state.behind_proxy);

    let link = state
        .redirect_service
        .resolve(&code, &visitor)
        .await?
        .ok_or_else(|| AppError::not_found("Short link not found", json!({ "code": code })))?;

    redirect_response(&link)
}

fn redirect_response(link: &ShortLink) -> Result<Response, AppError> {
    let location = HeaderValue::from_str(&link.target_url).map_err(|_| {
        tracing::error!(link_id = link.id, "Stored destination is not a valid header value");
        AppError::internal("Invalid redirect destination", json!({ "code": link.short_code }))
    })?;

    let response = if link.redirect_code == 301 {
        (
            StatusCode::MOVED_PERMANENTLY,
            [(header::LOCATION, location)],
        )
            .into_response()
    } else {
        (
            StatusCode::FOUND,
            [(header::LOCATION, location), (header::CACHE_CONTROL, NO_CACHE)],
        )
            .into_response()
    };

    Ok(response)
}

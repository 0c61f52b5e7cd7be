//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /{*code}`     - Short link redirect
//! - `GET  /health`      - Health check: DB, cache, counters, visit queue
//! - `/api/shortlink*`   - Link management and statistics
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::{health_handler, redirect_handler};
use crate::api::middleware::tracing;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

/// All routes with access logging, without path normalization.
///
/// The redirect route is a catch-all; `/health` and `/api/...` take precedence
/// because static segments match first.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api::routes::shortlink_routes())
        .route("/{*code}", get(redirect_handler))
        .with_state(state)
        .layer(tracing::layer())
}

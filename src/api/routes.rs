//! API route configuration.

use crate::api::handlers::{
    create_link_handler, delete_link_handler, get_link_handler, link_stats_handler,
    list_links_handler, update_link_handler, update_status_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, put},
};

/// Short link management routes, mounted under `/api`.
///
/// # Endpoints
///
/// - `POST   /shortlink`               - Create a link
/// - `GET    /shortlink`               - List links (paged, filterable)
/// - `GET    /shortlink/{id}`          - Fetch one link
/// - `PUT    /shortlink/{id}`          - Update destination, redirect code and optionally the flag
/// - `DELETE /shortlink/{id}`          - Delete a link with its statistics
/// - `PUT    /shortlink/status/{id}`   - Enable or disable a link
/// - `GET    /shortlink/{id}/stats`    - Reconciled daily statistics
pub fn shortlink_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/shortlink",
            get(list_links_handler).post(create_link_handler),
        )
        .route(
            "/shortlink/{id}",
            get(get_link_handler)
                .put(update_link_handler)
                .delete(delete_link_handler),
        )
        .route("/shortlink/status/{id}", put(update_status_handler))
        .route("/shortlink/{id}/stats", get(link_stats_handler))
}

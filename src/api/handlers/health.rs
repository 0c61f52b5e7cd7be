//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::domain::entities::LinkFilter;
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Components Checked
///
/// 1. **Database**: Counts stored links
/// 2. **Cache**: Redirect cache ping
/// 3. **Counters**: Counter store ping
/// 4. **Visit Queue**: Checks the channel is open and reports free slots
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "database": { "status": "ok", "message": "Connected, 42 links" },
///     "cache": { "status": "ok", "message": "Cache reachable" },
///     "counters": { "status": "ok", "message": "Counter store reachable" },
///     "visit_queue": { "status": "ok", "message": "Free slots: 10000" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let (database, cache, counters) = tokio::join!(
        check_database(&state),
        check_cache(&state),
        check_counters(&state)
    );
    let visit_queue = check_visit_queue(&state);

    let all_healthy = database.is_ok() && cache.is_ok() && counters.is_ok() && visit_queue.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            database,
            cache,
            counters,
            visit_queue,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_database(state: &AppState) -> CheckStatus {
    match state.link_service.list(LinkFilter::default(), 1, 1).await {
        Ok(page) => CheckStatus::ok(format!("Connected, {} links", page.total)),
        Err(e) => CheckStatus::error(format!("Database error: {}", e)),
    }
}

async fn check_cache(state: &AppState) -> CheckStatus {
    if state.cache.health_check().await {
        CheckStatus::ok("Cache reachable")
    } else {
        CheckStatus::error("Cache unreachable")
    }
}

async fn check_counters(state: &AppState) -> CheckStatus {
    if state.counters.health_check().await {
        CheckStatus::ok("Counter store reachable")
    } else {
        CheckStatus::error("Counter store unreachable")
    }
}

/// Checks if the visit queue is operational.
fn check_visit_queue(state: &AppState) -> CheckStatus {
    if state.visit_sender.is_closed() {
        CheckStatus::error("Visit queue is closed")
    } else {
        CheckStatus::ok(format!("Free slots: {}", state.visit_sender.capacity()))
    }
}

//! HTTP access logging.

use tower_http::LatencyUnit;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub type AccessLogLayer = TraceLayer<SharedClassifier<ServerErrorsAsFailures>>;

/// Access log layer: one `INFO` span per request (method, uri, version), one
/// `INFO` event per response with status and latency in milliseconds, and an
/// `ERROR` event for 5xx responses.
///
/// ```text
/// INFO request{method=GET uri=/promo version=HTTP/1.1}: finished processing request latency=1 ms status=302
/// ```
///
/// Redirect responses are logged like any other; their visits are counted
/// separately by the visit worker.
pub fn layer() -> AccessLogLayer {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
        .on_failure(
            DefaultOnFailure::new()
                .level(Level::ERROR)
                .latency_unit(LatencyUnit::Millis),
        )
}

//! Background worker turning visit events into counter updates.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::visit_event::VisitEvent;
use crate::infrastructure::counters::CounterStore;

/// Consumes visit events until every sender is dropped.
pub async fn run_visit_worker(mut rx: mpsc::Receiver<VisitEvent>, counters: Arc<dyn CounterStore>) {
    while let Some(event) = rx.recv().await {
        record_visit(counters.as_ref(), &event).await;
    }

    info!("Visit queue closed, worker exiting");
}

/// Applies the four counter updates of one visit.
///
/// Each update is independent: a failure is logged and the remaining updates still
/// run. Nothing is retried, so a store outage loses the affected increments.
/// Returns the number of updates that succeeded.
pub async fn record_visit(counters: &dyn CounterStore, event: &VisitEvent) -> usize {
    let code = event.code.as_str();
    let visitor = event.visitor.as_str();
    let mut recorded = 0;

    match counters.increment_daily_pv(code, event.day).await {
        Ok(()) => recorded += 1,
        Err(e) => warn!(code, error = %e, "Failed to record daily PV"),
    }

    match counters.add_daily_uv(code, event.day, visitor).await {
        Ok(()) => recorded += 1,
        Err(e) => warn!(code, error = %e, "Failed to record daily UV"),
    }

    match counters.increment_total_pv(code).await {
        Ok(()) => recorded += 1,
        Err(e) => warn!(code, error = %e, "Failed to record total PV"),
    }

    match counters.add_total_uv(code, visitor).await {
        Ok(()) => recorded += 1,
        Err(e) => warn!(code, error = %e, "Failed to record total UV"),
    }

    debug!(code, recorded, "Visit recorded");
    recorded
}

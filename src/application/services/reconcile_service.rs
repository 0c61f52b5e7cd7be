//! Periodic flush of counter state into the database.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use metrics::counter;
use serde_json::json;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::domain::entities::{ShortLink, StatsSnapshot};
use crate::domain::keys;
use crate::domain::repositories::{LinkRepository, StatsRepository};
use crate::error::AppError;
use crate::infrastructure::counters::{CounterError, CounterStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Time between two sweeps.
    pub interval: Duration,
    /// Disabled links last modified longer ago than this are skipped.
    pub stale_disabled_after: Duration,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(crate::config::DEFAULT_RECONCILE_INTERVAL_SECONDS),
            stale_disabled_after: Duration::from_secs(
                crate::config::DEFAULT_STALE_DISABLED_SECONDS,
            ),
        }
    }
}

/// Result of one sweep over all links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Copies counter values into daily rows and cumulative link totals.
///
/// Runs sequentially; one link's failure is logged and the sweep moves on.
/// Cumulative totals written to the database never decrease, so a counter key
/// that is missing or was reset cannot roll them back.
pub struct ReconcileService<L, S>
where
    L: LinkRepository + ?Sized,
    S: StatsRepository + ?Sized,
{
    link_repository: Arc<L>,
    stats_repository: Arc<S>,
    counters: Arc<dyn CounterStore>,
    settings: ReconcileSettings,
}

impl<L, S> ReconcileService<L, S>
where
    L: LinkRepository + ?Sized,
    S: StatsRepository + ?Sized,
{
    pub fn new(
        link_repository: Arc<L>,
        stats_repository: Arc<S>,
        counters: Arc<dyn CounterStore>,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            link_repository,
            stats_repository,
            counters,
            settings,
        }
    }

    pub fn settings(&self) -> ReconcileSettings {
        self.settings
    }

    /// Reconciles every link once.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] only if the link list cannot be loaded.
    pub async fn sweep(&self) -> Result<SweepReport, AppError> {
        let started = Instant::now();
        let links = self.link_repository.list_all().await?;

        let stale_after = chrono::Duration::from_std(self.settings.stale_disabled_after)
            .unwrap_or(chrono::Duration::days(1));
        let cutoff = Utc::now() - stale_after;
        let day = keys::today();

        let mut report = SweepReport::default();

        for link in &links {
            if link.is_stale_disabled(cutoff) {
                debug!(code = %link.short_code, "Skipping stale disabled link");
                counter!("reconcile_links_total", "outcome" => "skipped").increment(1);
                report.skipped += 1;
                continue;
            }

            match self.reconcile_link(link, day).await {
                Ok(_) => {
                    counter!("reconcile_links_total", "outcome" => "synced").increment(1);
                    report.synced += 1;
                }
                Err(e) => {
                    warn!(link_id = link.id, code = %link.short_code, error = %e, "Failed to reconcile link");
                    counter!("reconcile_links_total", "outcome" => "failed").increment(1);
                    report.failed += 1;
                }
            }
        }

        info!(
            synced = report.synced,
            skipped = report.skipped,
            failed = report.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Reconciliation sweep finished"
        );

        Ok(report)
    }

    /// Raises the live total page-view counter of every enabled link to the total
    /// recorded in the database.
    ///
    /// Meant for counter stores that start out empty, such as the in-process one
    /// after a restart. Counters already at or above the recorded total are left
    /// alone. Returns the number of links seeded.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] only if the link list cannot be loaded.
    pub async fn seed_counters(&self) -> Result<usize, AppError> {
        let links = self.link_repository.list_all().await?;
        let mut seeded = 0;

        for link in links.iter().filter(|l| !l.disabled && l.total_pv > 0) {
            let code = link.short_code.as_str();
            let result = match self.counters.get_total_pv(code).await {
                Ok(Some(live)) if live >= link.total_pv => continue,
                Ok(_) => self.counters.set_total_pv(code, link.total_pv).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => seeded += 1,
                Err(e) => warn!(code, error = %e, "Failed to seed total PV counter"),
            }
        }

        info!(seeded, "Counters seeded from recorded totals");
        Ok(seeded)
    }

    /// Reads the counters of one link for `day` and writes them to the database.
    ///
    /// Returns the snapshot as written. A missing cumulative key (for instance on a
    /// recently disabled link) keeps the recorded total.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the counter store or the database fails.
    pub async fn reconcile_link(
        &self,
        link: &ShortLink,
        day: NaiveDate,
    ) -> Result<StatsSnapshot, AppError> {
        let snapshot = self
            .read_snapshot(link, day)
            .await
            .map_err(|e| {
                error!(link_id = link.id, code = %link.short_code, error = %e, "Counter read failed");
                AppError::internal(
                    "Counter store unavailable",
                    json!({ "shortCode": link.short_code }),
                )
            })?;

        self.stats_repository.record_snapshot(snapshot).await?;

        debug!(
            code = %link.short_code,
            daily_pv = snapshot.daily_pv,
            total_pv = snapshot.total_pv,
            "Link reconciled"
        );
        Ok(snapshot)
    }

    async fn read_snapshot(
        &self,
        link: &ShortLink,
        day: NaiveDate,
    ) -> Result<StatsSnapshot, CounterError> {
        let code = link.short_code.as_str();

        let daily_pv = self.counters.get_daily_pv(code, day).await?;
        let daily_uv = self.counters.get_daily_uv(code, day).await?;
        let total_pv = self.counters.get_total_pv(code).await?;
        let total_uv = self.counters.get_total_uv(code).await?;

        Ok(StatsSnapshot {
            short_link_id: link.id,
            date: day,
            daily_pv,
            daily_uv,
            total_pv: total_pv.map_or(link.total_pv, |live| live.max(link.total_pv)),
            total_uv: total_uv.map_or(link.total_uv, |live| live.max(link.total_uv)),
        })
    }
}

/// Runs [`ReconcileService::sweep`] every `settings.interval` until `shutdown`
/// flips to `true` or its sender is dropped.
///
/// The first sweep happens one interval after start. Ticks missed while a sweep
/// is still running are skipped rather than bunched up.
pub async fn run_reconcile_scheduler<L, S>(
    service: Arc<ReconcileService<L, S>>,
    mut shutdown: watch::Receiver<bool>,
) where
    L: LinkRepository + ?Sized,
    S: StatsRepository + ?Sized,
{
    let period = service.settings().interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(interval_secs = period.as_secs(), "Reconciliation scheduler started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = service.sweep().await {
                    error!(error = %e, "Reconciliation sweep failed");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("Reconciliation scheduler stopped");
}

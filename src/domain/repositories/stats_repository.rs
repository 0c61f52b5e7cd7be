//! Repository trait for daily statistics.

use crate::domain::entities::{DailyStat, StatsSnapshot};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Repository interface for reconciled analytics.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgStatsRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// Writes one reconciliation result in a single transaction.
    ///
    /// Upserts the `(link, day)` daily row and raises the link's cumulative totals
    /// to the snapshot values. Neither the daily figures nor the totals ever
    /// decrease, so counters that restarted from zero cannot shrink them. The link's
    /// `updated_at` and `version` are left untouched so that reconciliation never
    /// counts as a modification.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn record_snapshot(&self, snapshot: StatsSnapshot) -> Result<(), AppError>;

    /// Daily rows for a link, oldest first, optionally bounded (inclusive).
    async fn list_daily(
        &self,
        short_link_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DailyStat>, AppError>;
}

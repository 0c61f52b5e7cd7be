//! Reconciled statistics read service.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use crate::domain::entities::{DailyStat, ShortLink};
use crate::domain::repositories::{LinkRepository, StatsRepository};
use crate::error::AppError;

/// Daily rows and cumulative totals of a link.
#[derive(Debug, Clone)]
pub struct LinkStats {
    pub link: ShortLink,
    pub daily: Vec<DailyStat>,
}

/// Service for reading reconciled statistics.
///
/// Values lag live counters by at most one reconciliation interval.
pub struct StatsService<L, S>
where
    L: LinkRepository + ?Sized,
    S: StatsRepository + ?Sized,
{
    link_repository: Arc<L>,
    stats_repository: Arc<S>,
}

impl<L, S> StatsService<L, S>
where
    L: LinkRepository + ?Sized,
    S: StatsRepository + ?Sized,
{
    /// Creates a new statistics service.
    pub fn new(link_repository: Arc<L>, stats_repository: Arc<S>) -> Self {
        Self {
            link_repository,
            stats_repository,
        }
    }

    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `from` is after `to` and
    /// [`AppError::NotFound`] if the link does not exist.
    pub async fn link_stats(
        &self,
        id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<LinkStats, AppError> {
        if let (Some(from), Some(to)) = (from, to)
            && from > to
        {
            return Err(AppError::bad_request(
                "'from' must not be after 'to'",
                json!({ "from": from, "to": to }),
            ));
        }

        let link = self
            .link_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "id": id })))?;

        let daily = self.stats_repository.list_daily(id, from, to).await?;

        Ok(LinkStats { link, daily })
    }
}

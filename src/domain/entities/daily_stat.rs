//! Per-day statistics row.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Page views and unique-visitor estimate of one link on one calendar day.
///
/// At most one row exists per `(short_link_id, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub id: i64,
    pub short_link_id: i64,
    pub date: NaiveDate,
    pub pv: i64,
    pub uv: i64,
    pub updated_at: DateTime<Utc>,
}

/// Counter values read from the counter store for a single link.
///
/// Written to the durable store in one go: today's row is upserted and the link's
/// cumulative fields are overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub short_link_id: i64,
    pub date: NaiveDate,
    pub daily_pv: i64,
    pub daily_uv: i64,
    pub total_pv: i64,
    pub total_uv: i64,
}

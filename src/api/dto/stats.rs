//! DTOs for the link statistics endpoint.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::application::services::LinkStats;

/// Optional inclusive date range, `YYYY-MM-DD` in UTC.
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatItem {
    pub date: NaiveDate,
    pub pv: i64,
    pub uv: i64,
}

/// Reconciled statistics of one link.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStatsResponse {
    pub id: i64,
    pub short_code: String,
    pub total_pv: i64,
    pub total_uv: i64,
    pub daily: Vec<DailyStatItem>,
}

impl From<LinkStats> for LinkStatsResponse {
    fn from(stats: LinkStats) -> Self {
        Self {
            id: stats.link.id,
            short_code: stats.link.short_code,
            total_pv: stats.link.total_pv,
            total_uv: stats.link.total_uv,
            daily: stats
                .daily
                .into_iter()
                .map(|row| DailyStatItem {
                    date: row.date,
                    pv: row.pv,
                    uv: row.uv,
                })
                .collect(),
        }
    }
}

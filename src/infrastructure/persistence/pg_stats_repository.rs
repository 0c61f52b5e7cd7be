//! PostgreSQL implementation of statistics repository.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{DailyStat, StatsSnapshot};
use crate::domain::repositories::StatsRepository;
use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct DailyStatRow {
    id: i64,
    short_link_id: i64,
    date: NaiveDate,
    pv: i64,
    uv: i64,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<DailyStatRow> for DailyStat {
    fn from(row: DailyStatRow) -> Self {
        DailyStat {
            id: row.id,
            short_link_id: row.short_link_id,
            date: row.date,
            pv: row.pv,
            uv: row.uv,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL repository for daily statistics and reconciled totals.
pub struct PgStatsRepository {
    pool: Arc<PgPool>,
}

impl PgStatsRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsRepository for PgStatsRepository {
    async fn record_snapshot(&self, snapshot: StatsSnapshot) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO daily_stats (short_link_id, date, pv, uv)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (short_link_id, date)
            DO UPDATE SET pv = GREATEST(daily_stats.pv, EXCLUDED.pv),
                          uv = GREATEST(daily_stats.uv, EXCLUDED.uv), updated_at = now()
            "#,
        )
        .bind(snapshot.short_link_id)
        .bind(snapshot.date)
        .bind(snapshot.daily_pv)
        .bind(snapshot.daily_uv)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE short_links \
             SET total_pv = GREATEST(total_pv, $2), total_uv = GREATEST(total_uv, $3) \
             WHERE id = $1",
        )
        .bind(snapshot.short_link_id)
        .bind(snapshot.total_pv)
        .bind(snapshot.total_uv)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_daily(
        &self,
        short_link_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DailyStat>, AppError> {
        let rows = sqlx::query_as::<_, DailyStatRow>(
            r#"
            SELECT id, short_link_id, date, pv, uv, updated_at
            FROM daily_stats
            WHERE short_link_id = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY date
            "#,
        )
        .bind(short_link_id)
        .bind(from)
        .bind(to)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(DailyStat::from).collect())
    }
}

//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{LinkFilter, NewShortLink, ShortLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

const LINK_COLUMNS: &str = "id, short_code, target_url, redirect_code, disabled, \
     total_pv, total_uv, uv_backup, version, created_at, updated_at";

// Placeholders $1..$4 are shared by `list` and `count`.
const FILTER_CLAUSE: &str = "($1::text IS NULL OR POSITION($1 IN short_code) > 0) \
     AND ($2::text IS NULL OR POSITION($2 IN target_url) > 0) \
     AND ($3::int IS NULL OR redirect_code = $3) \
     AND ($4::bool IS NULL OR disabled = $4)";

#[derive(sqlx::FromRow)]
struct ShortLinkRow {
    id: i64,
    short_code: String,
    target_url: String,
    redirect_code: i32,
    disabled: bool,
    total_pv: i64,
    total_uv: i64,
    uv_backup: Option<Vec<u8>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ShortLinkRow> for ShortLink {
    fn from(row: ShortLinkRow) -> Self {
        ShortLink {
            id: row.id,
            short_code: row.short_code,
            target_url: row.target_url,
            redirect_code: row.redirect_code,
            disabled: row.disabled,
            total_pv: row.total_pv,
            total_uv: row.total_uv,
            uv_backup: row.uv_backup,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL repository for short links.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_link: NewShortLink) -> Result<ShortLink, AppError> {
        let sql = format!(
            "INSERT INTO short_links (short_code, target_url, redirect_code, disabled) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {LINK_COLUMNS}"
        );

        let row = sqlx::query_as::<_, ShortLinkRow>(&sql)
            .bind(&new_link.short_code)
            .bind(&new_link.target_url)
            .bind(new_link.redirect_code)
            .bind(new_link.disabled)
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::conflict(
                    "Short code already exists",
                    json!({ "shortCode": new_link.short_code }),
                ),
                other => AppError::from(other),
            })?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ShortLink>, AppError> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM short_links WHERE id = $1");
        let row = sqlx::query_as::<_, ShortLinkRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(ShortLink::from))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>, AppError> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM short_links WHERE short_code = $1");
        let row = sqlx::query_as::<_, ShortLinkRow>(&sql)
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(ShortLink::from))
    }

    async fn find_enabled_by_code(&self, code: &str) -> Result<Option<ShortLink>, AppError> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM short_links WHERE short_code = $1 AND NOT disabled"
        );
        let row = sqlx::query_as::<_, ShortLinkRow>(&sql)
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(ShortLink::from))
    }

    async fn list(
        &self,
        filter: LinkFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ShortLink>, AppError> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM short_links \
             WHERE {FILTER_CLAUSE} \
             ORDER BY created_at DESC, id DESC \
             LIMIT $5 OFFSET $6"
        );

        let rows = sqlx::query_as::<_, ShortLinkRow>(&sql)
            .bind(filter.short_code)
            .bind(filter.target_url)
            .bind(filter.redirect_code)
            .bind(filter.disabled)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().map(ShortLink::from).collect())
    }

    async fn count(&self, filter: LinkFilter) -> Result<i64, AppError> {
        let sql = format!("SELECT COUNT(*) FROM short_links WHERE {FILTER_CLAUSE}");

        let count: i64 = sqlx::query_scalar(&sql)
            .bind(filter.short_code)
            .bind(filter.target_url)
            .bind(filter.redirect_code)
            .bind(filter.disabled)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn list_all(&self) -> Result<Vec<ShortLink>, AppError> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM short_links ORDER BY id");

        let rows = sqlx::query_as::<_, ShortLinkRow>(&sql)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().map(ShortLink::from).collect())
    }

    async fn update(&self, link: &ShortLink) -> Result<ShortLink, AppError> {
        let sql = format!(
            "UPDATE short_links SET \
                 target_url = $2, redirect_code = $3, disabled = $4, \
                 total_pv = GREATEST(total_pv, $5), total_uv = GREATEST(total_uv, $6), uv_backup = $7, \
                 version = version + 1, updated_at = now() \
             WHERE id = $1 AND version = $8 \
             RETURNING {LINK_COLUMNS}"
        );

        let row = sqlx::query_as::<_, ShortLinkRow>(&sql)
            .bind(link.id)
            .bind(&link.target_url)
            .bind(link.redirect_code)
            .bind(link.disabled)
            .bind(link.total_pv)
            .bind(link.total_uv)
            .bind(link.uv_backup.as_deref())
            .bind(link.version)
            .fetch_optional(self.pool.as_ref())
            .await?;

        if let Some(row) = row {
            return Ok(row.into());
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM short_links WHERE id = $1)")
            .bind(link.id)
            .fetch_one(self.pool.as_ref())
            .await?;

        if exists {
            Err(AppError::conflict(
                "Link was modified concurrently",
                json!({ "id": link.id, "version": link.version }),
            ))
        } else {
            Err(AppError::not_found(
                "Link not found",
                json!({ "id": link.id }),
            ))
        }
    }

    async fn delete_with_stats(&self, id: i64) -> Result<Option<ShortLink>, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM daily_stats WHERE short_link_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let sql = format!("DELETE FROM short_links WHERE id = $1 RETURNING {LINK_COLUMNS}");
        let row = sqlx::query_as::<_, ShortLinkRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(row.map(ShortLink::from))
    }
}

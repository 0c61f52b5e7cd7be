//! PostgreSQL repository tests. Each test gets a fresh migrated database from
//! `DATABASE_URL`; run with `cargo test -- --ignored`.

use chrono::NaiveDate;
use sqlx::PgPool;
use std::sync::Arc;

use shortlink::domain::entities::{LinkFilter, NewShortLink, StatsSnapshot};
use shortlink::domain::repositories::{LinkRepository, StatsRepository};
use shortlink::error::AppError;
use shortlink::infrastructure::persistence::{PgLinkRepository, PgStatsRepository};

fn new_link(code: &str) -> NewShortLink {
    NewShortLink {
        short_code: code.to_string(),
        target_url: format!("https://example.com/{code}"),
        redirect_code: 302,
        disabled: false,
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_create_and_find(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));

    let link = repo.create(new_link("promo")).await.unwrap();
    assert_eq!(link.short_code, "promo");
    assert_eq!(link.version, 0);
    assert_eq!((link.total_pv, link.total_uv), (0, 0));

    let by_id = repo.find_by_id(link.id).await.unwrap().unwrap();
    assert_eq!(by_id.target_url, "https://example.com/promo");

    let by_code = repo.find_by_code("promo").await.unwrap().unwrap();
    assert_eq!(by_code.id, link.id);

    assert!(repo.find_by_code("missing").await.unwrap().is_none());
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_duplicate_code_is_conflict(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));
    repo.create(new_link("promo")).await.unwrap();

    let result = repo.create(new_link("promo")).await;

    assert!(matches!(result, Err(AppError::Conflict { .. })));
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_find_enabled_skips_disabled(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));
    let mut hidden = new_link("hidden");
    hidden.disabled = true;
    repo.create(hidden).await.unwrap();
    repo.create(new_link("shown")).await.unwrap();

    assert!(repo.find_enabled_by_code("hidden").await.unwrap().is_none());
    assert!(repo.find_enabled_by_code("shown").await.unwrap().is_some());
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_list_and_count_with_filter(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));
    for code in ["promo-1", "promo-2", "docs"] {
        repo.create(new_link(code)).await.unwrap();
    }

    let filter = LinkFilter {
        short_code: Some("promo".to_string()),
        ..LinkFilter::default()
    };
    let page = repo.list(filter.clone(), 0, 1).await.unwrap();
    let total = repo.count(filter).await.unwrap();

    assert_eq!(total, 2);
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].short_code, "promo-2");
    assert_eq!(repo.list_all().await.unwrap().len(), 3);
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_update_checks_version(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));
    let link = repo.create(new_link("promo")).await.unwrap();

    let mut changed = link.clone();
    changed.target_url = "https://example.com/b".to_string();
    changed.uv_backup = Some(vec![1, 2, 3]);
    let updated = repo.update(&changed).await.unwrap();
    assert_eq!(updated.version, 1);
    assert_eq!(updated.uv_backup.as_deref(), Some(&[1u8, 2, 3][..]));

    // Same stale version again.
    let stale = repo.update(&changed).await;
    assert!(matches!(stale, Err(AppError::Conflict { .. })));

    let mut gone = updated.clone();
    gone.id = 9999;
    assert!(matches!(repo.update(&gone).await, Err(AppError::NotFound { .. })));
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_record_snapshot_upserts_and_keeps_max(pool: PgPool) {
    let pool = Arc::new(pool);
    let links = PgLinkRepository::new(pool.clone());
    let stats = PgStatsRepository::new(pool);
    let link = links.create(new_link("promo")).await.unwrap();

    let snapshot = |daily_pv, total_pv| StatsSnapshot {
        short_link_id: link.id,
        date: day(1),
        daily_pv,
        daily_uv: 1,
        total_pv,
        total_uv: 1,
    };

    stats.record_snapshot(snapshot(5, 5)).await.unwrap();
    stats.record_snapshot(snapshot(7, 7)).await.unwrap();
    stats.record_snapshot(snapshot(2, 2)).await.unwrap();

    let rows = stats.list_daily(link.id, None, None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].pv, 7);

    let stored = links.find_by_id(link.id).await.unwrap().unwrap();
    assert_eq!(stored.total_pv, 7);
    assert_eq!(stored.version, link.version);
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_update_from_stale_copy_keeps_reconciled_totals(pool: PgPool) {
    let pool = Arc::new(pool);
    let links = PgLinkRepository::new(pool.clone());
    let stats = PgStatsRepository::new(pool);
    let link = links.create(new_link("promo")).await.unwrap();
    let mut stale = link.clone();

    stats
        .record_snapshot(StatsSnapshot {
            short_link_id: link.id,
            date: day(1),
            daily_pv: 3,
            daily_uv: 2,
            total_pv: 3,
            total_uv: 2,
        })
        .await
        .unwrap();

    stale.target_url = "https://example.com/b".to_string();
    let updated = links.update(&stale).await.unwrap();

    assert_eq!(updated.target_url, "https://example.com/b");
    assert_eq!((updated.total_pv, updated.total_uv), (3, 2));
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_list_daily_range(pool: PgPool) {
    let pool = Arc::new(pool);
    let links = PgLinkRepository::new(pool.clone());
    let stats = PgStatsRepository::new(pool);
    let link = links.create(new_link("promo")).await.unwrap();

    for d in [3, 1, 2] {
        stats
            .record_snapshot(StatsSnapshot {
                short_link_id: link.id,
                date: day(d),
                daily_pv: i64::from(d),
                daily_uv: 1,
                total_pv: 6,
                total_uv: 3,
            })
            .await
            .unwrap();
    }

    let all = stats.list_daily(link.id, None, None).await.unwrap();
    let dates: Vec<_> = all.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![day(1), day(2), day(3)]);

    let bounded = stats.list_daily(link.id, Some(day(2)), Some(day(2))).await.unwrap();
    assert_eq!(bounded.len(), 1);
    assert_eq!(bounded[0].pv, 2);
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_delete_with_stats(pool: PgPool) {
    let pool = Arc::new(pool);
    let links = PgLinkRepository::new(pool.clone());
    let stats = PgStatsRepository::new(pool.clone());
    let link = links.create(new_link("promo")).await.unwrap();
    stats
        .record_snapshot(StatsSnapshot {
            short_link_id: link.id,
            date: day(1),
            daily_pv: 1,
            daily_uv: 1,
            total_pv: 1,
            total_uv: 1,
        })
        .await
        .unwrap();

    let deleted = links.delete_with_stats(link.id).await.unwrap();
    assert_eq!(deleted.unwrap().short_code, "promo");

    let remaining: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM daily_stats WHERE short_link_id = $1")
            .bind(link.id)
            .fetch_one(pool.as_ref())
            .await
            .unwrap();
    assert_eq!(remaining, 0);

    assert!(links.delete_with_stats(link.id).await.unwrap().is_none());
}

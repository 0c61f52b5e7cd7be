//! Disable, enable and delete transitions across the database, cache and counters.
//!
//! The database is written first in every transition; cache and counter cleanup
//! follow and are best-effort. A failed cleanup leaves a stale derived key that the
//! next transition or TTL removes, never a lost durable value.

use std::sync::Arc;

use serde_json::json;
use tracing::{error, info, warn};

use super::reconcile_service::ReconcileService;
use crate::domain::entities::{LinkUpdate, ShortLink};
use crate::domain::keys;
use crate::domain::repositories::{LinkRepository, StatsRepository};
use crate::error::AppError;
use crate::infrastructure::cache::RedirectCache;
use crate::infrastructure::counters::CounterStore;
use crate::utils::validation::{validate_redirect_code, validate_target_url};

/// Keeps derived state consistent with a link's lifecycle.
///
/// Concurrent transitions on one link are fenced by the repository's version
/// check: the slower writer receives [`AppError::Conflict`] before it has
/// deleted anything.
pub struct SyncService<L, S>
where
    L: LinkRepository + ?Sized,
    S: StatsRepository + ?Sized,
{
    link_repository: Arc<L>,
    reconciler: Arc<ReconcileService<L, S>>,
    cache: Arc<dyn RedirectCache>,
    counters: Arc<dyn CounterStore>,
}

impl<L, S> SyncService<L, S>
where
    L: LinkRepository + ?Sized,
    S: StatsRepository + ?Sized,
{
    pub fn new(
        link_repository: Arc<L>,
        reconciler: Arc<ReconcileService<L, S>>,
        cache: Arc<dyn RedirectCache>,
        counters: Arc<dyn CounterStore>,
    ) -> Self {
        Self {
            link_repository,
            reconciler,
            cache,
            counters,
        }
    }

    /// Applies an update to a link, running the disable or enable transition when
    /// the flag changes.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] for an invalid destination or redirect code
    /// - [`AppError::NotFound`] if the link does not exist
    /// - [`AppError::Conflict`] if the link changed concurrently
    /// - [`AppError::Internal`] if statistics could not be flushed before disabling,
    ///   or the sketch could not be restored when enabling
    pub async fn update_link(&self, id: i64, update: LinkUpdate) -> Result<ShortLink, AppError> {
        validate_target_url(&update.target_url)?;
        validate_redirect_code(update.redirect_code)?;

        let mut link = self.find(id).await?;
        link.target_url = update.target_url;
        link.redirect_code = update.redirect_code;

        match update.disabled {
            Some(true) if !link.disabled => self.disable(link).await,
            Some(false) if link.disabled => self.enable(link).await,
            _ => {
                let saved = self.link_repository.update(&link).await?;
                self.invalidate_cache(&saved.short_code).await;
                info!(link_id = saved.id, code = %saved.short_code, "Link updated");
                Ok(saved)
            }
        }
    }

    /// Changes only the disabled flag.
    ///
    /// # Errors
    ///
    /// See [`Self::update_link`].
    pub async fn set_disabled(&self, id: i64, disabled: bool) -> Result<ShortLink, AppError> {
        let link = self.find(id).await?;

        match (link.disabled, disabled) {
            (false, true) => self.disable(link).await,
            (true, false) => self.enable(link).await,
            _ => Ok(link),
        }
    }

    /// Deletes a link, its daily statistics and every derived key.
    ///
    /// Deleting a link that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the database transaction fails; nothing
    /// is deleted in that case.
    pub async fn delete_link(&self, id: i64) -> Result<(), AppError> {
        let Some(link) = self.link_repository.delete_with_stats(id).await? else {
            info!(link_id = id, "Delete of missing link ignored");
            return Ok(());
        };

        self.invalidate_cache(&link.short_code).await;
        self.delete_counter_keys(&link.short_code, keys::cumulative_keys(&link.short_code))
            .await;

        info!(link_id = id, code = %link.short_code, "Link deleted");
        Ok(())
    }

    async fn find(&self, id: i64) -> Result<ShortLink, AppError> {
        self.link_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "id": id })))
    }

    async fn disable(&self, mut link: ShortLink) -> Result<ShortLink, AppError> {
        let code = link.short_code.clone();

        let snapshot = self
            .reconciler
            .reconcile_link(&link, keys::today())
            .await
            .map_err(|e| {
                error!(link_id = link.id, code = %code, error = %e, "Statistics flush before disable failed");
                AppError::internal(
                    "Failed to synchronize statistics",
                    json!({ "id": link.id }),
                )
            })?;
        link.total_pv = link.total_pv.max(snapshot.total_pv);
        link.total_uv = link.total_uv.max(snapshot.total_uv);

        let uv_key = keys::total_uv_key(&code);
        let (backup, keep_uv_key) = match self.counters.dump_sketch(&uv_key).await {
            Ok(backup) => (backup, false),
            Err(e) => {
                warn!(code = %code, error = %e, "Sketch backup failed, keeping live sketch");
                (None, true)
            }
        };

        link.disabled = true;
        link.uv_backup = backup;
        let saved = self.link_repository.update(&link).await?;

        self.invalidate_cache(&code).await;
        let keys = if keep_uv_key {
            vec![keys::total_pv_key(&code)]
        } else {
            keys::cumulative_keys(&code)
        };
        self.delete_counter_keys(&code, keys).await;

        info!(
            link_id = saved.id,
            code = %code,
            total_pv = saved.total_pv,
            backed_up = saved.has_uv_backup(),
            "Link disabled"
        );
        Ok(saved)
    }

    async fn enable(&self, mut link: ShortLink) -> Result<ShortLink, AppError> {
        let code = link.short_code.clone();

        if link.total_pv > 0 {
            self.counters
                .set_total_pv(&code, link.total_pv)
                .await
                .map_err(|e| {
                    error!(code = %code, error = %e, "Failed to reseed page-view counter");
                    AppError::internal("Failed to restore counters", json!({ "id": link.id }))
                })?;
        }

        let uv_key = keys::total_uv_key(&code);
        match link.uv_backup.take().filter(|b| !b.is_empty()) {
            Some(backup) => {
                self.counters
                    .restore_sketch(&uv_key, &backup)
                    .await
                    .map_err(|e| {
                        error!(code = %code, error = %e, "Failed to restore sketch backup");
                        AppError::internal("Failed to restore counters", json!({ "id": link.id }))
                    })?;
            }
            None => {
                if let Err(e) = self.counters.init_sketch(&uv_key).await {
                    warn!(code = %code, error = %e, "Failed to initialize empty sketch");
                }
            }
        }

        link.disabled = false;
        let saved = self.link_repository.update(&link).await?;

        // Drops a negative entry cached while the link was disabled.
        self.invalidate_cache(&code).await;

        info!(link_id = saved.id, code = %code, total_pv = saved.total_pv, "Link enabled");
        Ok(saved)
    }

    async fn invalidate_cache(&self, code: &str) {
        if let Err(e) = self.cache.invalidate(code).await {
            warn!(code, error = %e, "Failed to invalidate cache entry");
        }
    }

    async fn delete_counter_keys(&self, code: &str, keys: Vec<String>) {
        if let Err(e) = self.counters.delete_keys(&keys).await {
            warn!(code, error = %e, "Failed to delete counter keys");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::ReconcileSettings;
    use crate::domain::repositories::{MockLinkRepository, MockStatsRepository};
    use crate::infrastructure::cache::MockRedirectCache;
    use crate::infrastructure::counters::{CounterError, MemoryCounterStore, MockCounterStore};
    use chrono::Utc;

    fn link(disabled: bool) -> ShortLink {
        let now = Utc::now();
        ShortLink {
            id: 1,
            short_code: "promo".to_string(),
            target_url: "https://example.com/a".to_string(),
            redirect_code: 302,
            disabled,
            total_pv: 0,
            total_uv: 0,
            uv_backup: None,
            version: 3,
            created_at: now,
            updated_at: now,
        }
    }

    fn ok_cache() -> MockRedirectCache {
        let mut cache = MockRedirectCache::new();
        cache.expect_invalidate().returning(|_| Ok(()));
        cache
    }

    fn service(
        repo: MockLinkRepository,
        stats: MockStatsRepository,
        cache: MockRedirectCache,
        counters: Arc<dyn CounterStore>,
    ) -> SyncService<MockLinkRepository, MockStatsRepository> {
        let repo = Arc::new(repo);
        let reconciler = Arc::new(ReconcileService::new(
            repo.clone(),
            Arc::new(stats),
            counters.clone(),
            ReconcileSettings::default(),
        ));
        SyncService::new(repo, reconciler, Arc::new(cache), counters)
    }

    fn saving_repo(current: ShortLink) -> MockLinkRepository {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(current.clone())));
        repo.expect_update().returning(|l| {
            let mut saved = l.clone();
            saved.version += 1;
            Ok(saved)
        });
        repo
    }

    #[tokio::test]
    async fn test_disable_backs_up_and_removes_cumulative_keys() {
        let counters = Arc::new(MemoryCounterStore::new(3600));
        for i in 0..10 {
            counters.increment_total_pv("promo").await.unwrap();
            counters
                .add_total_uv("promo", &format!("10.0.0.{}", i % 4))
                .await
                .unwrap();
        }

        let mut stats = MockStatsRepository::new();
        stats
            .expect_record_snapshot()
            .withf(|s| s.total_pv == 10 && s.total_uv == 4)
            .times(1)
            .returning(|_| Ok(()));

        let service = service(saving_repo(link(false)), stats, ok_cache(), counters.clone());

        let saved = service.set_disabled(1, true).await.unwrap();

        assert!(saved.disabled);
        assert_eq!(saved.total_pv, 10);
        assert!(saved.has_uv_backup());
        assert!(!counters.contains_key(&keys::total_pv_key("promo")));
        assert!(!counters.contains_key(&keys::total_uv_key("promo")));
    }

    #[tokio::test]
    async fn test_disable_aborts_when_flush_fails() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_id()
            .returning(|_| Ok(Some(link(false))));
        repo.expect_update().times(0);

        let mut stats = MockStatsRepository::new();
        stats
            .expect_record_snapshot()
            .returning(|_| Err(AppError::internal("Database error", json!({}))));

        let mut cache = MockRedirectCache::new();
        cache.expect_invalidate().times(0);

        let counters = Arc::new(MemoryCounterStore::new(3600));
        counters.increment_total_pv("promo").await.unwrap();

        let service = service(repo, stats, cache, counters.clone());

        let result = service.set_disabled(1, true).await;
        assert!(matches!(result, Err(AppError::Internal { .. })));
        assert!(counters.contains_key(&keys::total_pv_key("promo")));
    }

    #[tokio::test]
    async fn test_disable_keeps_sketch_when_dump_fails() {
        let mut counters = MockCounterStore::new();
        counters.expect_get_daily_pv().returning(|_, _| Ok(0));
        counters.expect_get_daily_uv().returning(|_, _| Ok(0));
        counters.expect_get_total_pv().returning(|_| Ok(Some(5)));
        counters.expect_get_total_uv().returning(|_| Ok(Some(2)));
        counters
            .expect_dump_sketch()
            .returning(|_| Err(CounterError::Backend("timeout".to_string())));
        counters
            .expect_delete_keys()
            .withf(|keys| keys.len() == 1 && keys[0] == "redirect:total_pv:promo")
            .times(1)
            .returning(|_| Ok(()));

        let mut stats = MockStatsRepository::new();
        stats.expect_record_snapshot().returning(|_| Ok(()));

        let service = service(
            saving_repo(link(false)),
            stats,
            ok_cache(),
            Arc::new(counters),
        );

        let saved = service.set_disabled(1, true).await.unwrap();
        assert!(saved.disabled);
        assert!(!saved.has_uv_backup());
    }

    #[tokio::test]
    async fn test_disable_conflict_leaves_counters_intact() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_id()
            .returning(|_| Ok(Some(link(false))));
        repo.expect_update()
            .returning(|l| Err(AppError::conflict("Link was modified concurrently", json!({ "id": l.id }))));

        let mut stats = MockStatsRepository::new();
        stats.expect_record_snapshot().returning(|_| Ok(()));

        let mut cache = MockRedirectCache::new();
        cache.expect_invalidate().times(0);

        let counters = Arc::new(MemoryCounterStore::new(3600));
        counters.increment_total_pv("promo").await.unwrap();
        counters.add_total_uv("promo", "1.1.1.1").await.unwrap();

        let service = service(repo, stats, cache, counters.clone());

        let result = service.set_disabled(1, true).await;
        assert!(matches!(result, Err(AppError::Conflict { .. })));
        assert!(counters.contains_key(&keys::total_pv_key("promo")));
        assert!(counters.contains_key(&keys::total_uv_key("promo")));
    }

    #[tokio::test]
    async fn test_enable_reseeds_and_restores() {
        let source = MemoryCounterStore::new(3600);
        for i in 0..3 {
            source
                .add_total_uv("promo", &format!("10.0.0.{i}"))
                .await
                .unwrap();
        }
        let backup = source
            .dump_sketch(&keys::total_uv_key("promo"))
            .await
            .unwrap();

        let mut disabled = link(true);
        disabled.total_pv = 10;
        disabled.total_uv = 3;
        disabled.uv_backup = backup;

        let counters = Arc::new(MemoryCounterStore::new(3600));
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(disabled.clone())));
        repo.expect_update()
            .withf(|l| !l.disabled && l.uv_backup.is_none())
            .times(1)
            .returning(|l| Ok(l.clone()));

        let service = service(repo, MockStatsRepository::new(), ok_cache(), counters.clone());

        let saved = service.set_disabled(1, false).await.unwrap();

        assert!(!saved.disabled);
        assert_eq!(counters.get_total_pv("promo").await.unwrap(), Some(10));
        assert_eq!(counters.get_total_uv("promo").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_enable_without_backup_initializes_empty_sketch() {
        let counters = Arc::new(MemoryCounterStore::new(3600));

        let service = service(
            saving_repo(link(true)),
            MockStatsRepository::new(),
            ok_cache(),
            counters.clone(),
        );

        service.set_disabled(1, false).await.unwrap();

        assert_eq!(counters.get_total_pv("promo").await.unwrap(), None);
        assert_eq!(counters.get_total_uv("promo").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_enable_aborts_when_restore_fails() {
        let mut disabled = link(true);
        disabled.uv_backup = Some(b"not a sketch".to_vec());

        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(disabled.clone())));
        repo.expect_update().times(0);

        let service = service(
            repo,
            MockStatsRepository::new(),
            MockRedirectCache::new(),
            Arc::new(MemoryCounterStore::new(3600)),
        );

        let result = service.set_disabled(1, false).await;
        assert!(matches!(result, Err(AppError::Internal { .. })));
    }

    #[tokio::test]
    async fn test_plain_update_invalidates_cache() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_id()
            .returning(|_| Ok(Some(link(false))));
        repo.expect_update()
            .withf(|l| l.target_url == "https://example.com/b" && l.redirect_code == 301)
            .times(1)
            .returning(|l| Ok(l.clone()));

        let mut cache = MockRedirectCache::new();
        cache
            .expect_invalidate()
            .withf(|code| code == "promo")
            .times(1)
            .returning(|_| Ok(()));

        let mut stats = MockStatsRepository::new();
        stats.expect_record_snapshot().times(0);

        let service = service(
            repo,
            stats,
            cache,
            Arc::new(MemoryCounterStore::new(3600)),
        );

        let update = LinkUpdate {
            target_url: "https://example.com/b".to_string(),
            redirect_code: 301,
            disabled: Some(false),
        };
        let saved = service.update_link(1, update).await.unwrap();
        assert_eq!(saved.target_url, "https://example.com/b");
    }

    #[tokio::test]
    async fn test_update_validates_before_loading() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_id().times(0);

        let service = service(
            repo,
            MockStatsRepository::new(),
            MockRedirectCache::new(),
            Arc::new(MemoryCounterStore::new(3600)),
        );

        let update = LinkUpdate {
            target_url: "ftp://example.com".to_string(),
            redirect_code: 302,
            disabled: None,
        };
        assert!(matches!(
            service.update_link(1, update).await,
            Err(AppError::Validation { .. })
        ));

        let update = LinkUpdate {
            target_url: "https://example.com".to_string(),
            redirect_code: 307,
            disabled: None,
        };
        assert!(matches!(
            service.update_link(1, update).await,
            Err(AppError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_missing_link_is_not_found() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let service = service(
            repo,
            MockStatsRepository::new(),
            MockRedirectCache::new(),
            Arc::new(MemoryCounterStore::new(3600)),
        );

        assert!(matches!(
            service.set_disabled(99, true).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_link_succeeds() {
        let mut repo = MockLinkRepository::new();
        repo.expect_delete_with_stats().returning(|_| Ok(None));

        let mut cache = MockRedirectCache::new();
        cache.expect_invalidate().times(0);

        let service = service(
            repo,
            MockStatsRepository::new(),
            cache,
            Arc::new(MemoryCounterStore::new(3600)),
        );

        assert!(service.delete_link(42).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_cleans_up_derived_keys() {
        let mut repo = MockLinkRepository::new();
        repo.expect_delete_with_stats()
            .times(1)
            .returning(|_| Ok(Some(link(false))));

        let counters = Arc::new(MemoryCounterStore::new(3600));
        counters.increment_total_pv("promo").await.unwrap();
        counters.add_total_uv("promo", "1.1.1.1").await.unwrap();

        let service = service(repo, MockStatsRepository::new(), ok_cache(), counters.clone());

        service.delete_link(1).await.unwrap();

        assert!(!counters.contains_key(&keys::total_pv_key("promo")));
        assert!(!counters.contains_key(&keys::total_uv_key("promo")));
    }

    #[tokio::test]
    async fn test_delete_cleanup_failure_is_not_an_error() {
        let mut repo = MockLinkRepository::new();
        repo.expect_delete_with_stats()
            .returning(|_| Ok(Some(link(false))));

        let mut cache = MockRedirectCache::new();
        cache
            .expect_invalidate()
            .returning(|_| Err(crate::infrastructure::cache::CacheError::ConnectionError("down".to_string())));

        let mut counters = MockCounterStore::new();
        counters
            .expect_delete_keys()
            .returning(|_| Err(CounterError::Connection("down".to_string())));

        let service = service(repo, MockStatsRepository::new(), cache, Arc::new(counters));

        assert!(service.delete_link(1).await.is_ok());
    }
}

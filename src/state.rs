//! Shared application state injected into every handler.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::application::services::{
    LinkService, ReconcileService, ReconcileSettings, RedirectService, ResolverSettings,
    StatsService, SyncService,
};
use crate::domain::repositories::{LinkRepository, StatsRepository};
use crate::domain::visit_event::VisitEvent;
use crate::infrastructure::cache::RedirectCache;
use crate::infrastructure::counters::CounterStore;

pub type DynLinkService = LinkService<dyn LinkRepository>;
pub type DynRedirectService = RedirectService<dyn LinkRepository>;
pub type DynSyncService = SyncService<dyn LinkRepository, dyn StatsRepository>;
pub type DynStatsService = StatsService<dyn LinkRepository, dyn StatsRepository>;
pub type DynReconcileService = ReconcileService<dyn LinkRepository, dyn StatsRepository>;

#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<DynLinkService>,
    pub redirect_service: Arc<DynRedirectService>,
    pub sync_service: Arc<DynSyncService>,
    pub stats_service: Arc<DynStatsService>,
    pub reconcile_service: Arc<DynReconcileService>,
    pub cache: Arc<dyn RedirectCache>,
    pub counters: Arc<dyn CounterStore>,
    pub visit_sender: mpsc::Sender<VisitEvent>,
    /// Read the client address from forwarding headers.
    pub behind_proxy: bool,
}

/// Everything [`AppState::new`] needs to wire the services together.
pub struct StateParts {
    pub link_repository: Arc<dyn LinkRepository>,
    pub stats_repository: Arc<dyn StatsRepository>,
    pub cache: Arc<dyn RedirectCache>,
    pub counters: Arc<dyn CounterStore>,
    pub visit_sender: mpsc::Sender<VisitEvent>,
    pub resolver: ResolverSettings,
    pub reconcile: ReconcileSettings,
    pub behind_proxy: bool,
}

impl AppState {
    pub fn new(parts: StateParts) -> Self {
        let StateParts {
            link_repository,
            stats_repository,
            cache,
            counters,
            visit_sender,
            resolver,
            reconcile,
            behind_proxy,
        } = parts;

        let reconcile_service = Arc::new(ReconcileService::new(
            link_repository.clone(),
            stats_repository.clone(),
            counters.clone(),
            reconcile,
        ));

        Self {
            link_service: Arc::new(LinkService::new(link_repository.clone())),
            redirect_service: Arc::new(RedirectService::new(
                link_repository.clone(),
                cache.clone(),
                visit_sender.clone(),
                resolver,
            )),
            sync_service: Arc::new(SyncService::new(
                link_repository.clone(),
                reconcile_service.clone(),
                cache.clone(),
                counters.clone(),
            )),
            stats_service: Arc::new(StatsService::new(link_repository, stats_repository)),
            reconcile_service,
            cache,
            counters,
            visit_sender,
            behind_proxy,
        }
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::ConnectInfo;
use axum_test::TestServer;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tower::Layer;

use shortlink::application::services::{ReconcileSettings, ResolverSettings};
use shortlink::domain::entities::{
    DailyStat, LinkFilter, NewShortLink, ShortLink, StatsSnapshot,
};
use shortlink::domain::repositories::{LinkRepository, StatsRepository};
use shortlink::domain::visit_event::VisitEvent;
use shortlink::domain::visit_worker::record_visit;
use shortlink::error::AppError;
use shortlink::infrastructure::cache::MemoryCache;
use shortlink::infrastructure::counters::MemoryCounterStore;
use shortlink::routes;
use shortlink::state::{AppState, StateParts};

pub const TEST_PEER: &str = "127.0.0.1:12345";

/// Durable store stand-in implementing both repositories over shared tables.
#[derive(Default)]
pub struct InMemoryDb {
    links: Mutex<Vec<ShortLink>>,
    daily: Mutex<Vec<DailyStat>>,
    next_id: AtomicUsize,
    enabled_lookups: AtomicUsize,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `find_enabled_by_code` calls, i.e. durable reads on the redirect path.
    pub fn enabled_lookups(&self) -> usize {
        self.enabled_lookups.load(Ordering::SeqCst)
    }

    pub fn link(&self, id: i64) -> Option<ShortLink> {
        self.links.lock().unwrap().iter().find(|l| l.id == id).cloned()
    }

    pub fn daily_rows(&self, id: i64) -> Vec<DailyStat> {
        self.daily
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.short_link_id == id)
            .cloned()
            .collect()
    }

    pub fn set_updated_at(&self, id: i64, updated_at: DateTime<Utc>) {
        let mut links = self.links.lock().unwrap();
        if let Some(link) = links.iter_mut().find(|l| l.id == id) {
            link.updated_at = updated_at;
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1
    }
}

fn matches(link: &ShortLink, filter: &LinkFilter) -> bool {
    filter
        .short_code
        .as_deref()
        .is_none_or(|s| link.short_code.contains(s))
        && filter
            .target_url
            .as_deref()
            .is_none_or(|s| link.target_url.contains(s))
        && filter.redirect_code.is_none_or(|c| link.redirect_code == c)
        && filter.disabled.is_none_or(|d| link.disabled == d)
}

#[async_trait]
impl LinkRepository for InMemoryDb {
    async fn create(&self, new_link: NewShortLink) -> Result<ShortLink, AppError> {
        let mut links = self.links.lock().unwrap();
        if links.iter().any(|l| l.short_code == new_link.short_code) {
            return Err(AppError::conflict(
                "Short code already exists",
                json!({ "shortCode": new_link.short_code }),
            ));
        }

        let now = Utc::now();
        let link = ShortLink {
            id: self.next_id(),
            short_code: new_link.short_code,
            target_url: new_link.target_url,
            redirect_code: new_link.redirect_code,
            disabled: new_link.disabled,
            total_pv: 0,
            total_uv: 0,
            uv_backup: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        links.push(link.clone());
        Ok(link)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ShortLink>, AppError> {
        Ok(self.link(id))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>, AppError> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.short_code == code)
            .cloned())
    }

    async fn find_enabled_by_code(&self, code: &str) -> Result<Option<ShortLink>, AppError> {
        self.enabled_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.short_code == code && !l.disabled)
            .cloned())
    }

    async fn list(
        &self,
        filter: LinkFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ShortLink>, AppError> {
        let mut links: Vec<ShortLink> = self
            .links
            .lock()
            .unwrap()
            .iter()
            .filter(|l| matches(l, &filter))
            .cloned()
            .collect();
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(links
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self, filter: LinkFilter) -> Result<i64, AppError> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .filter(|l| matches(l, &filter))
            .count() as i64)
    }

    async fn list_all(&self) -> Result<Vec<ShortLink>, AppError> {
        Ok(self.links.lock().unwrap().clone())
    }

    async fn update(&self, link: &ShortLink) -> Result<ShortLink, AppError> {
        let mut links = self.links.lock().unwrap();
        let stored = links
            .iter_mut()
            .find(|l| l.id == link.id)
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "id": link.id })))?;

        if stored.version != link.version {
            return Err(AppError::conflict(
                "Short link was modified concurrently",
                json!({ "id": link.id }),
            ));
        }

        *stored = ShortLink {
            total_pv: stored.total_pv.max(link.total_pv),
            total_uv: stored.total_uv.max(link.total_uv),
            version: link.version + 1,
            updated_at: Utc::now(),
            created_at: stored.created_at,
            short_code: stored.short_code.clone(),
            ..link.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_with_stats(&self, id: i64) -> Result<Option<ShortLink>, AppError> {
        let mut links = self.links.lock().unwrap();
        let Some(pos) = links.iter().position(|l| l.id == id) else {
            return Ok(None);
        };
        let removed = links.remove(pos);
        self.daily.lock().unwrap().retain(|row| row.short_link_id != id);
        Ok(Some(removed))
    }
}

#[async_trait]
impl StatsRepository for InMemoryDb {
    async fn record_snapshot(&self, snapshot: StatsSnapshot) -> Result<(), AppError> {
        {
            let mut daily = self.daily.lock().unwrap();
            match daily
                .iter_mut()
                .find(|r| r.short_link_id == snapshot.short_link_id && r.date == snapshot.date)
            {
                Some(row) => {
                    row.pv = row.pv.max(snapshot.daily_pv);
                    row.uv = row.uv.max(snapshot.daily_uv);
                    row.updated_at = Utc::now();
                }
                None => {
                    let id = daily.len() as i64 + 1;
                    daily.push(DailyStat {
                        id,
                        short_link_id: snapshot.short_link_id,
                        date: snapshot.date,
                        pv: snapshot.daily_pv,
                        uv: snapshot.daily_uv,
                        updated_at: Utc::now(),
                    });
                }
            }
        }

        let mut links = self.links.lock().unwrap();
        if let Some(link) = links.iter_mut().find(|l| l.id == snapshot.short_link_id) {
            link.total_pv = link.total_pv.max(snapshot.total_pv);
            link.total_uv = link.total_uv.max(snapshot.total_uv);
        }
        Ok(())
    }

    async fn list_daily(
        &self,
        short_link_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DailyStat>, AppError> {
        let mut rows: Vec<DailyStat> = self
            .daily_rows(short_link_id)
            .into_iter()
            .filter(|r| from.is_none_or(|f| r.date >= f) && to.is_none_or(|t| r.date <= t))
            .collect();
        rows.sort_by_key(|r| r.date);
        Ok(rows)
    }
}

/// Fully wired application over in-memory stores.
///
/// Visits are not processed in the background: call [`TestApp::drain_visits`]
/// to apply the queued ones.
pub struct TestApp {
    pub state: AppState,
    pub db: Arc<InMemoryDb>,
    pub cache: Arc<MemoryCache>,
    pub counters: Arc<MemoryCounterStore>,
    pub visits: mpsc::Receiver<VisitEvent>,
}

impl TestApp {
    pub async fn drain_visits(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(event) = self.visits.try_recv() {
            record_visit(self.counters.as_ref(), &event).await;
            drained += 1;
        }
        drained
    }

    /// Creates an enabled link through the link service.
    pub async fn create_link(&self, code: &str, target_url: &str, redirect_code: i32) -> ShortLink {
        self.state
            .link_service
            .create(NewShortLink {
                short_code: code.to_string(),
                target_url: target_url.to_string(),
                redirect_code,
                disabled: false,
            })
            .await
            .unwrap()
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with_queue(100)
}

pub fn create_test_app_with_queue(capacity: usize) -> TestApp {
    build_test_app(Arc::new(InMemoryDb::new()), capacity)
}

/// A freshly started app over an existing database: empty cache and counters.
pub fn restart_over(db: Arc<InMemoryDb>) -> TestApp {
    build_test_app(db, 100)
}

fn build_test_app(db: Arc<InMemoryDb>, capacity: usize) -> TestApp {
    let cache = Arc::new(MemoryCache::new());
    let counters = Arc::new(MemoryCounterStore::default());
    let (tx, rx) = mpsc::channel(capacity);

    let state = AppState::new(StateParts {
        link_repository: db.clone(),
        stats_repository: db.clone(),
        cache: cache.clone(),
        counters: counters.clone(),
        visit_sender: tx,
        resolver: ResolverSettings::default(),
        reconcile: ReconcileSettings::default(),
        behind_proxy: false,
    });

    TestApp {
        state,
        db,
        cache,
        counters,
        visits: rx,
    }
}

/// Inserts a fixed peer address, standing in for `into_make_service_with_connect_info`.
#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = TEST_PEER.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}

/// Test server over the full router.
pub fn test_server(state: AppState) -> TestServer {
    let app = routes::router(state).layer(MockConnectInfoLayer);
    TestServer::new(app).unwrap()
}

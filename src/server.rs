//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, store selection, background task spawning, and
//! the Axum server lifecycle.

use crate::application::services::run_reconcile_scheduler;
use crate::config::Config;
use crate::domain::visit_worker::run_visit_worker;
use crate::infrastructure::cache::{MemoryCache, RedirectCache, RedisCache};
use crate::infrastructure::connect_redis;
use crate::infrastructure::counters::{CounterStore, MemoryCounterStore, RedisCounterStore};
use crate::infrastructure::persistence::{PgLinkRepository, PgStatsRepository};
use crate::routes::app_router;
use crate::state::{AppState, DynReconcileService, StateParts};

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Redis cache and counters (or in-memory fallback)
/// - Background visit worker
/// - Reconciliation scheduler
/// - Axum HTTP server
///
/// With in-memory stores the total page-view counters are first seeded from the
/// database. On Ctrl-C or SIGTERM the server stops accepting connections, the
/// scheduler is stopped, queued visits are drained and a last sweep writes the
/// counters to the database before returning.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_database(&config).await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let stores = build_stores(&config).await;

    let (visit_tx, visit_rx) = mpsc::channel(config.visit_queue_capacity);
    let worker = tokio::spawn(run_visit_worker(visit_rx, stores.counters.clone()));
    tracing::info!("Visit worker started");

    let pool = Arc::new(pool);
    let state = AppState::new(StateParts {
        link_repository: Arc::new(PgLinkRepository::new(pool.clone())),
        stats_repository: Arc::new(PgStatsRepository::new(pool.clone())),
        cache: stores.cache,
        counters: stores.counters,
        visit_sender: visit_tx,
        resolver: config.resolver_settings(),
        reconcile: config.reconcile_settings(),
        behind_proxy: config.behind_proxy,
    });

    let reconcile = state.reconcile_service.clone();
    if stores.in_memory {
        reconcile
            .seed_counters()
            .await
            .context("Failed to seed counters from the database")?;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = tokio::spawn(run_reconcile_scheduler(reconcile.clone(), shutdown_rx));

    let app = app_router(state);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("HTTP server stopped, shutting down background tasks");

    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler.await {
        tracing::error!(error = %e, "Reconciliation scheduler panicked");
    }

    // The router, and with it every visit sender, is gone.
    drain_and_flush(worker, &reconcile, WORKER_DRAIN_TIMEOUT).await;

    Ok(())
}

/// Opens the PostgreSQL pool with the configured limits.
pub async fn connect_database(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

/// Redirect cache and counter store picked at startup.
pub struct Stores {
    pub cache: Arc<dyn RedirectCache>,
    pub counters: Arc<dyn CounterStore>,
    /// True when both live in process memory and start out empty.
    pub in_memory: bool,
}

/// Connects the Redis-backed stores, failing when Redis is not configured or
/// not reachable.
///
/// # Errors
///
/// Returns an error if `redis_url` is `None` or the connection check fails.
pub async fn connect_redis_stores(
    redis_url: Option<&str>,
    counter_ttl_seconds: u64,
) -> Result<Stores> {
    let redis_url = redis_url
        .context("Redis is not configured (set REDIS_URL or REDIS_HOST)")?;
    let conn = connect_redis(redis_url)
        .await
        .context("Failed to connect to Redis")?;

    Ok(Stores {
        cache: Arc::new(RedisCache::new(conn.clone())),
        counters: Arc::new(RedisCounterStore::new(conn, counter_ttl_seconds)),
        in_memory: false,
    })
}

/// Picks Redis-backed stores when configured and reachable, in-memory ones otherwise.
///
/// In-memory stores are per process; they are only consistent for a single
/// instance.
pub async fn build_stores(config: &Config) -> Stores {
    if config.redis_url.is_some() {
        match connect_redis_stores(config.redis_url.as_deref(), config.counter_ttl_seconds).await {
            Ok(stores) => {
                tracing::info!("Cache and counters enabled (Redis)");
                return stores;
            }
            Err(e) => {
                tracing::warn!("{:#}. Using in-memory cache and counters.", e);
            }
        }
    } else {
        tracing::info!("Redis not configured, using in-memory cache and counters");
    }

    Stores {
        cache: Arc::new(MemoryCache::with_capacity(config.memory_cache_capacity)),
        counters: Arc::new(MemoryCounterStore::new(config.counter_ttl_seconds)),
        in_memory: true,
    }
}

/// Waits for the visit worker to empty the queue, then writes the counters to
/// the database one last time.
///
/// The worker only exits once every visit sender is dropped. If it does not
/// finish within `drain_timeout` the sweep still runs with whatever was recorded.
pub async fn drain_and_flush(
    worker: JoinHandle<()>,
    reconcile: &DynReconcileService,
    drain_timeout: Duration,
) {
    match tokio::time::timeout(drain_timeout, worker).await {
        Ok(Ok(())) => tracing::info!("Visit queue drained"),
        Ok(Err(e)) => tracing::error!(error = %e, "Visit worker panicked"),
        Err(_) => tracing::warn!("Timed out draining visit queue"),
    }

    match reconcile.sweep().await {
        Ok(report) => tracing::info!(
            synced = report.synced,
            failed = report.failed,
            "Final reconciliation sweep finished"
        ),
        Err(e) => tracing::error!(error = %e, "Final reconciliation sweep failed"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

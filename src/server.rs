//! HTTP server initialization and runtime setup.
//!
//! Selects storage and cache backends, spawns the click worker and the
//! counter reconciliation task, and runs Axum until Ctrl-C.

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use crate::application::services::LinkService;
use crate::config::{Config, StorageBackend};
use crate::domain::click_ingestor::ClickIngestor;
use crate::domain::click_worker::ClickWorker;
use crate::infrastructure::cache::{CacheService, MemoryCache, NullCache, RedisCache};
use crate::infrastructure::geo::{GeoLookup, MaxMindGeoLookup, NoGeoLookup};
use crate::routes::{RouterOptions, app_router};
use crate::state::{AppState, Repositories};

/// How long shutdown waits for the click worker to flush.
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `log_level`. `log_format` is `text` or
/// `json`.
pub fn init_tracing(log_level: &str, log_format: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Storage (PostgreSQL with migrations, or the in-memory store)
/// - Cache (Redis, in-process, or NullCache)
/// - Click ingest queue and background worker
/// - Periodic click counter reconciliation
/// - Axum HTTP server with graceful shutdown
///
/// On shutdown the listener stops accepting, in-flight requests finish,
/// and queued clicks are flushed before returning.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let repositories = connect_storage(&config).await?;

    if config.rebuild_rollups_on_start {
        let rows = repositories
            .clicks
            .rebuild_rollups()
            .await
            .context("Failed to rebuild click rollups")?;
        tracing::info!(rows, "Click rollups rebuilt");
    }

    let cache = connect_cache(&config).await;

    let (ingestor, click_rx) = ClickIngestor::new(config.click_queue_capacity);
    let worker = ClickWorker::new(
        repositories.clicks.clone(),
        repositories.links.clone(),
        open_geo_lookup(config.geoip_db_path.as_deref()),
        config.worker_config(),
    );
    let worker_handle = tokio::spawn(worker.run(click_rx));
    tracing::info!(
        capacity = config.click_queue_capacity,
        concurrency = config.click_worker_concurrency,
        "Click worker started"
    );

    let state = AppState::new(repositories, cache, ingestor, config.service_settings());
    let reconcile_handle = spawn_reconciler(
        state.link_service.clone(),
        Duration::from_secs(config.click_reconcile_interval_seconds),
    );

    let app = app_router(
        state,
        RouterOptions {
            behind_proxy: config.behind_proxy,
            rate_limit: config.rate_limit_enabled,
        },
    );

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(handle) = reconcile_handle {
        handle.abort();
    }

    // The router owned the last ingestor handles; the worker now drains.
    match tokio::time::timeout(WORKER_DRAIN_TIMEOUT, worker_handle).await {
        Ok(Ok(())) => tracing::info!("Click worker drained"),
        Ok(Err(e)) => tracing::error!("Click worker panicked: {}", e),
        Err(_) => tracing::warn!(
            timeout_secs = WORKER_DRAIN_TIMEOUT.as_secs(),
            "Click worker did not drain in time; queued clicks lost"
        ),
    }

    Ok(())
}

async fn connect_storage(config: &Config) -> Result<Repositories> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Repositories::memory())
        }
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for postgres storage")?;

            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
                .idle_timeout(Duration::from_secs(config.db_idle_timeout))
                .max_lifetime(Duration::from_secs(config.db_max_lifetime))
                .connect(database_url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to migrate")?;

            Ok(Repositories::postgres(Arc::new(pool)))
        }
    }
}

async fn connect_cache(config: &Config) -> Arc<dyn CacheService> {
    if !config.cache_enabled {
        tracing::info!("Cache disabled (NullCache)");
        return Arc::new(NullCache::new());
    }

    match &config.redis_url {
        Some(redis_url) => match RedisCache::connect(redis_url).await {
            Ok(redis) => {
                tracing::info!("Cache enabled (Redis)");
                Arc::new(redis)
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                Arc::new(NullCache::new())
            }
        },
        None => {
            tracing::info!(capacity = config.cache_capacity, "Cache enabled (in-process)");
            Arc::new(MemoryCache::new(config.cache_capacity))
        }
    }
}

/// MaxMind lookup when `GEOIP_DB_PATH` opens, otherwise header-only countries.
fn open_geo_lookup(path: Option<&str>) -> Arc<dyn GeoLookup> {
    let Some(path) = path else {
        return Arc::new(NoGeoLookup);
    };

    match MaxMindGeoLookup::open(path) {
        Ok(lookup) => {
            tracing::info!(path = %path, "GeoIP database loaded");
            Arc::new(lookup)
        }
        Err(e) => {
            tracing::warn!(path = %path, "Failed to open GeoIP database: {}. Countries from headers only.", e);
            Arc::new(NoGeoLookup)
        }
    }
}

/// Periodically resets link click counters to their event counts.
/// An interval of zero disables the task.
fn spawn_reconciler(links: Arc<LinkService>, every: Duration) -> Option<JoinHandle<()>> {
    if every.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = links.reconcile_click_counts().await {
                tracing::warn!("Click counter reconciliation failed: {}", e);
            }
        }
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

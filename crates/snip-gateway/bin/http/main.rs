mod cli;

use crate::cli::{CacheBackendArg, StorageBackendArg, CLI};
use clap::Parser;
use snip_cache::{MokaUrlCache, RateLimiter, RedisUrlCache};
use snip_core::{Repository, UrlCache};
use snip_gateway::{App, AppState};
use snip_generator::DigestGenerator;
use snip_redirector::RedirectorService;
use snip_shortener::{Reaper, ShortenerService, StatsService};
use snip_storage::{InMemoryRepository, MySqlRepository};
use snip_telemetry::TelemetryConfig;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = CLI::parse();

    let _telemetry = snip_telemetry::init(
        &TelemetryConfig::new("snip-gateway")
            .with_log_format(config.log_format)
            .with_otlp_endpoint(config.otlp_endpoint.clone()),
    )?;

    info!(
        listen_addr = %config.listen_addr,
        base_url = %config.base_url,
        storage_backend = %config.storage,
        cache_backend = %config.cache,
        "starting snip gateway"
    );

    match config.storage {
        StorageBackendArg::InMemory => {
            with_storage(config, Arc::new(InMemoryRepository::new())).await
        }
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .clone()
                .ok_or("mysql dsn is required when storage backend is mysql")?;
            let repository = MySqlRepository::connect(&mysql_dsn).await?;
            repository.ensure_schema().await?;
            with_storage(config, Arc::new(repository)).await
        }
    }
}

async fn with_storage<R: Repository>(config: CLI, repository: Arc<R>) -> Result<(), Box<dyn Error>> {
    match config.cache {
        CacheBackendArg::Moka => {
            let cache = MokaUrlCache::with_capacity(config.moka_capacity);
            serve(config, repository, Arc::new(cache)).await
        }
        CacheBackendArg::Redis => {
            let redis_url = config
                .redis_url
                .clone()
                .ok_or("redis url is required when cache backend is redis")?;
            let cache = RedisUrlCache::connect(&redis_url, config.cache_key_prefix.clone()).await?;
            serve(config, repository, Arc::new(cache)).await
        }
    }
}

async fn serve<R: Repository, C: UrlCache>(
    config: CLI,
    repository: Arc<R>,
    cache: Arc<C>,
) -> Result<(), Box<dyn Error>> {
    let shortener = ShortenerService::new(
        Arc::clone(&repository),
        Arc::clone(&cache),
        DigestGenerator::new(),
    )
    .with_max_attempts(config.max_attempts);
    let redirector = RedirectorService::new(Arc::clone(&repository), Arc::clone(&cache));
    let stats = StatsService::new(Arc::clone(&repository));
    let rate_limit = RateLimiter::new(
        Arc::clone(&cache),
        config.rate_limit,
        Duration::from_secs(config.rate_limit_window_secs),
    );

    let state = AppState::builder()
        .shortener(Arc::new(shortener))
        .redirector(Arc::new(redirector))
        .stats(Arc::new(stats))
        .rate_limit(Arc::new(rate_limit))
        .base_url(config.base_url.clone())
        .build();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper = (config.reaper_interval_secs > 0).then(|| {
        let reaper = Reaper::new(
            Arc::clone(&repository),
            Duration::from_secs(config.reaper_interval_secs),
        );
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(reaper.run(async move {
            let _ = shutdown_rx.changed().await;
        }))
    });

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "starting gateway server");

    axum::serve(
        listener,
        App::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let _ = shutdown_tx.send(true);
    if let Some(reaper) = reaper {
        reaper.await?;
    }

    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => warn!(error = %e, "failed to listen for shutdown signal"),
    }
}

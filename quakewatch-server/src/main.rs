use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

use quakewatch_server::config::Config;
use quakewatch_server::module::quake::{
    QuakeFetcher, QuakeMonitor, QuakeUpdater, SnapshotCache, SubscriberRegistry,
};
use quakewatch_server::{logging, server};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load("config.toml")?;

    let _logging_guard = logging::init_logging("logs", "quakewatch-server", &config.log_level);

    tracing::info!("Quakewatch server starting...");
    tracing::info!("Bulletin source: {}", config.bulletin_url);

    let bulletin_url = Url::parse(&config.bulletin_url)
        .with_context(|| format!("Invalid bulletin_url: {}", config.bulletin_url))?;

    let fetcher = QuakeFetcher::new(bulletin_url)
        .context("Failed to build bulletin fetcher")?
        .with_retry_policy(
            config.fetch_max_attempts,
            Duration::from_secs(config.retry_delay_secs),
        );

    let cache = Arc::new(SnapshotCache::new(
        Arc::new(fetcher),
        Duration::from_secs(config.cache_ttl_secs),
    ));
    let registry = Arc::new(SubscriberRegistry::new());
    let monitor = Arc::new(QuakeMonitor::new(registry.clone()));

    // Warm the cache once before serving, then poll forever in the background
    let updater = Arc::new(QuakeUpdater::new(
        cache.clone(),
        monitor,
        Duration::from_secs(config.poll_interval_secs),
    ));
    let _poller = updater.start_with_initial_update().await;

    let state = server::AppState {
        cache,
        registry,
        client: reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build pass-through HTTP client")?,
    };
    let app = server::build_router(state);

    let addr = config.server_address();
    tracing::info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

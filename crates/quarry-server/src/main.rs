use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use quarry_client::{BrowserFetcher, DefaultFetcher, SelectorExtractor, StaticFetcher};
use quarry_core::{SearchService, SiteCatalog};
use quarry_server::cache::{CacheBackend, PURGE_INTERVAL};
use quarry_server::config::ServerConfig;
use quarry_server::state::AppState;
use quarry_server::{cors_layer, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("quarry=info".parse()?))
        .with_target(false)
        .init();

    let config = ServerConfig::from_env()?;
    let catalog = Arc::new(SiteCatalog::load(&config.sites_path)?);
    let cache = CacheBackend::open(config.cache).await;

    let purge = cache.as_ref().and_then(|c| c.spawn_purge(PURGE_INTERVAL));

    let fetcher = DefaultFetcher::new(
        StaticFetcher::new()?,
        BrowserFetcher::new(config.max_browsers),
    );
    let extractor = SelectorExtractor::new();
    let service = match cache.clone() {
        Some(cache) => SearchService::with_cache(catalog, fetcher, extractor, cache),
        None => SearchService::new(catalog, fetcher, extractor),
    };

    let state = Arc::new(AppState {
        search: Box::new(service),
        cache: cache.clone(),
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors));

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(purge) = purge {
        purge.abort();
    }
    if let Some(cache) = &cache {
        cache.close().await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

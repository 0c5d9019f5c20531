//! Binary entrypoint: boots the Axum HTTP server, wiring the store, the
//! source registry, the aggregation/analysis services, metrics, and the
//! periodic sync scheduler.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ai_news_aggregator::api;
use ai_news_aggregator::config::{load_sources_file, EngineConfig};
use ai_news_aggregator::metrics::Metrics;
use ai_news_aggregator::{build_state, SqliteStore};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ai_news_aggregator=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = EngineConfig::load()?;
    tracing::info!(db = %cfg.db_path, addr = %cfg.bind_addr, "starting ai-news-aggregator");

    if let Some(parent) = std::path::Path::new(&cfg.db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = SqliteStore::open(&cfg.db_path)?;

    let state = build_state(store.clone());

    // Seed the registry up front and layer any configured sources on top.
    state.registry.list_sources(false).await?;
    if let Some(path) = &cfg.sources_path {
        for source in load_sources_file(path)? {
            store.upsert_source_by_name(&source)?;
        }
    }

    let metrics = Metrics::init();
    let router = api::create_router(state.clone()).merge(metrics.router());

    let sync_handle = cfg
        .sync_interval_minutes
        .map(|minutes| Arc::clone(&state.sync).start_periodic_sync(minutes));

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    if let Some(handle) = sync_handle {
        handle.abort();
    }
    Ok(())
}

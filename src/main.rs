//! newswire — Binary Entrypoint
//! Loads config, starts the ingestion loop and serves the viewer API.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newswire::ingest::providers::providers_from_config;
use newswire::ingest::scheduler::spawn_scheduler;
use newswire::metrics::Metrics;
use newswire::{build_app, AppConfig};

/// `RUST_LOG` wins over the default filter; `NEWSWIRE_LOG_FORMAT=json`
/// switches to one JSON object per line.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newswire=info,ingest=info,warn"));

    let json = std::env::var("NEWSWIRE_LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "failed to listen for ctrl-c");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default()?;
    if cfg.sources.is_empty() {
        tracing::warn!("no feed sources configured; the cache will stay empty");
    }
    let metrics = Metrics::init(&cfg)?;

    let providers = providers_from_config(&cfg)?;
    let app = build_app(&cfg, providers);
    let scheduler = spawn_scheduler(app.ingestor.clone(), cfg.poll_interval());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    tracing::info!(
        addr = %cfg.bind_addr,
        sources = cfg.sources.len(),
        interval_secs = cfg.poll_interval_secs,
        "newswire listening"
    );

    let router = app.router.merge(metrics.router());
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;

    scheduler.abort();
    tracing::info!("newswire stopped");
    Ok(())
}

// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod hub;
pub mod ingest;
pub mod metrics;
pub mod news;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::AppConfig;
pub use crate::hub::NewsHub;
pub use crate::ingest::{FeedState, Ingestor};
pub use crate::news::NewsItem;

use std::sync::Arc;

use crate::ingest::types::SourceProvider;

/// Everything the server needs, wired from one config.
pub struct App {
    pub router: axum::Router,
    pub ingestor: Arc<Ingestor>,
    pub hub: NewsHub,
}

/// Build hub, ingestor and HTTP router. Nothing is spawned here; start the
/// ingestion loop with [`ingest::scheduler::spawn_scheduler`].
pub fn build_app(cfg: &AppConfig, providers: Vec<Box<dyn SourceProvider>>) -> App {
    let hub = NewsHub::new(
        FeedState::new(cfg.cache_capacity, cfg.compaction_threshold),
        cfg.broadcast_capacity,
    );
    let ingestor = Arc::new(Ingestor::new(
        providers,
        cfg.classifier(),
        hub.clone(),
        cfg.fetch_timeout(),
    ));
    let state = api::AppState {
        hub: hub.clone(),
        static_dir: cfg.static_dir.clone(),
    };
    App {
        router: api::router(state),
        ingestor,
        hub,
    }
}

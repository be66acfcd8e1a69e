use std::convert::Infallible;
use std::path::PathBuf;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::Serialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::hub::{NewsHub, Viewer};
use crate::news::SharedItem;

/// SSE event name carrying one news item.
pub const NEWS_EVENT: &str = "news";

#[derive(Clone)]
pub struct AppState {
    pub hub: NewsHub,
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(hub: NewsHub) -> Self {
        Self {
            hub,
            static_dir: None,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let static_dir = state.static_dir.clone();
    let router = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/news", get(news_snapshot))
        .route("/events", get(news_stream))
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

/// `None` (logged) when the payload does not serialize; the viewer simply
/// misses that event.
fn news_event<T: Serialize + ?Sized>(item: &T) -> Option<Event> {
    match serde_json::to_string(item) {
        Ok(data) => Some(Event::default().event(NEWS_EVENT).data(data)),
        Err(e) => {
            tracing::error!(error = %e, "news item not serializable, event skipped");
            None
        }
    }
}

async fn news_snapshot(State(state): State<AppState>) -> Json<Vec<SharedItem>> {
    Json(state.hub.snapshot().await)
}

/// Replay the cache (newest first), then stream items as they are found.
async fn news_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let Viewer {
        id,
        snapshot,
        rx,
        guard,
    } = state.hub.connect().await;

    let replay = stream::iter(
        snapshot
            .into_iter()
            .filter_map(|item| news_event(item.as_ref()).map(Ok)),
    );

    let live = BroadcastStream::new(rx).filter_map(move |res| {
        // dropped with the stream, which marks the viewer as gone
        let _viewer = &guard;
        match res {
            Ok(item) => news_event(item.as_ref()).map(Ok),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(viewer = id, skipped, "viewer lagging, items dropped");
                None
            }
        }
    });

    Sse::new(replay.chain(live)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

//! # News Hub
//! Fan-out point between the ingestion cycle and connected viewers.
//!
//! The hub owns the shared [`FeedState`] lock and the broadcast channel.
//! [`NewsHub::connect`] takes the cache snapshot and subscribes while holding
//! the read lock, and the ingestion cycle publishes and caches while holding
//! the write lock, so every viewer gets each item exactly once: either in its
//! replay or live.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use metrics::gauge;
use tokio::sync::{broadcast, RwLock};

use crate::ingest::FeedState;
use crate::news::SharedItem;

pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct NewsHub {
    state: Arc<RwLock<FeedState>>,
    tx: broadcast::Sender<SharedItem>,
    viewers: Arc<AtomicUsize>,
    next_viewer: Arc<AtomicU64>,
}

/// A freshly connected viewer: replay first, then the live channel.
pub struct Viewer {
    pub id: u64,
    pub snapshot: Vec<SharedItem>,
    pub rx: broadcast::Receiver<SharedItem>,
    /// Keep alive for as long as the connection is open.
    pub guard: ViewerGuard,
}

/// Counts the viewer as connected until dropped.
pub struct ViewerGuard {
    id: u64,
    viewers: Arc<AtomicUsize>,
}

impl Drop for ViewerGuard {
    fn drop(&mut self) {
        let left = self.viewers.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        gauge!("viewers_connected").set(left as f64);
        tracing::info!(viewer = self.id, viewers = left, "viewer disconnected");
    }
}

impl NewsHub {
    pub fn new(state: FeedState, broadcast_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(broadcast_capacity.max(1));
        Self {
            state: Arc::new(RwLock::new(state)),
            tx,
            viewers: Arc::new(AtomicUsize::new(0)),
            next_viewer: Arc::new(AtomicU64::new(1)),
        }
    }

    pub async fn connect(&self) -> Viewer {
        let (snapshot, rx) = {
            let st = self.state.read().await;
            (st.cache.snapshot(), self.tx.subscribe())
        };
        let id = self.next_viewer.fetch_add(1, Ordering::Relaxed);
        let now = self.viewers.fetch_add(1, Ordering::SeqCst) + 1;
        gauge!("viewers_connected").set(now as f64);
        tracing::info!(viewer = id, viewers = now, replay = snapshot.len(), "viewer connected");

        Viewer {
            id,
            snapshot,
            rx,
            guard: ViewerGuard {
                id,
                viewers: self.viewers.clone(),
            },
        }
    }

    /// Fire-and-forget send; returns how many viewers were subscribed.
    pub fn publish(&self, item: &SharedItem) -> usize {
        // Err only means nobody is listening right now.
        self.tx.send(item.clone()).unwrap_or(0)
    }

    pub async fn snapshot(&self) -> Vec<SharedItem> {
        self.state.read().await.cache.snapshot()
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.load(Ordering::SeqCst)
    }

    pub(crate) fn state(&self) -> &Arc<RwLock<FeedState>> {
        &self.state
    }
}

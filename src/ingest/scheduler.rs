// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ingest::{CycleReport, Ingestor};

/// Run one cycle in its own task so a panic anywhere in it ends only that
/// cycle. Items already broadcast stay broadcast.
pub async fn run_guarded_cycle(ingestor: &Arc<Ingestor>) -> Option<CycleReport> {
    let ing = Arc::clone(ingestor);
    match tokio::spawn(async move { ing.run_cycle().await }).await {
        Ok(report) => {
            tracing::info!(
                target: "ingest",
                sources = report.sources,
                failed = report.failed_sources,
                fetched = report.fetched,
                new = report.new_items,
                cached = report.cache_len,
                seen = report.seen_len,
                compacted = report.compacted,
                ms = report.elapsed.as_millis() as u64,
                "ingest cycle"
            );
            Some(report)
        }
        Err(e) => {
            tracing::error!(target: "ingest", error = %e, "ingest cycle aborted");
            counter!("ingest_cycle_failures_total").increment(1);
            None
        }
    }
}

/// Spawn the ingestion loop: one cycle right away, then one per `interval`.
///
/// Cycles run back to back on this task and never overlap; ticks that fall
/// due while a cycle is still running are skipped.
pub fn spawn_scheduler(ingestor: Arc<Ingestor>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            run_guarded_cycle(&ingestor).await;
        }
    })
}

// tests/ingest_scheduler.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use newswire::ingest::scheduler::{run_guarded_cycle, spawn_scheduler};
use newswire::ingest::types::{RawItem, SourceProvider};
use newswire::{build_app, AppConfig};
use tokio::time::Instant;

/// Counts fetches; panics on the calls listed in `panic_on`.
struct CountingProvider {
    calls: Arc<AtomicUsize>,
    panic_on: Vec<usize>,
}

#[async_trait]
impl SourceProvider for CountingProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.panic_on.contains(&n) {
            panic!("provider blew up on call {n}");
        }
        Ok(vec![RawItem {
            guid: Some(format!("call-{n}")),
            title: Some(format!("Update {n}")),
            link: None,
            pub_date: None,
            source: "counting".into(),
        }])
    }
    fn name(&self) -> &str {
        "counting"
    }
}

fn cfg() -> AppConfig {
    AppConfig {
        sources: vec![],
        ..AppConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn first_cycle_runs_immediately_then_on_interval() {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = CountingProvider {
        calls: calls.clone(),
        panic_on: vec![],
    };
    let app = build_app(&cfg(), vec![Box::new(provider)]);
    let handle = spawn_scheduler(app.ingestor.clone(), Duration::from_secs(10));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1, "startup cycle");

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 3, "cycles at 0s, 10s and 20s");
    assert_eq!(app.hub.snapshot().await.len(), 3);

    handle.abort();
}

#[tokio::test]
async fn panicking_cycle_is_contained_and_next_cycle_recovers() {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = CountingProvider {
        calls: calls.clone(),
        panic_on: vec![1],
    };
    let app = build_app(&cfg(), vec![Box::new(provider)]);

    assert!(run_guarded_cycle(&app.ingestor).await.is_none());

    let report = run_guarded_cycle(&app.ingestor)
        .await
        .expect("second cycle completes");
    assert_eq!(report.new_items, 1);
    assert_eq!(app.hub.snapshot().await[0].id, "call-2");
}

/// First fetch takes `first`, later ones `rest`; records start offsets and
/// the highest number of fetches in flight at once.
struct SlowProvider {
    base: Instant,
    first: Duration,
    rest: Duration,
    starts: Arc<Mutex<Vec<u64>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

#[async_trait]
impl SourceProvider for SlowProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>> {
        let n = {
            let mut starts = self.starts.lock().unwrap();
            starts.push(self.base.elapsed().as_secs());
            starts.len()
        };
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(if n == 1 { self.first } else { self.rest }).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![])
    }
    fn name(&self) -> &str {
        "slow"
    }
}

#[tokio::test(start_paused = true)]
async fn long_cycle_never_overlaps_and_missed_ticks_are_skipped() {
    let starts = Arc::new(Mutex::new(Vec::new()));
    let max_in_flight = Arc::new(AtomicUsize::new(0));
    let base = Instant::now();
    let provider = SlowProvider {
        base,
        first: Duration::from_secs(25),
        rest: Duration::from_secs(1),
        starts: starts.clone(),
        in_flight: Arc::new(AtomicUsize::new(0)),
        max_in_flight: max_in_flight.clone(),
    };
    let cfg = AppConfig {
        fetch_timeout_secs: 60,
        ..cfg()
    };
    let app = build_app(&cfg, vec![Box::new(provider)]);
    let handle = spawn_scheduler(app.ingestor.clone(), Duration::from_secs(10));

    tokio::time::sleep(Duration::from_secs(45)).await;
    handle.abort();

    // The 10s and 20s ticks fall inside the first cycle. The late tick fires
    // once when it ends, then the schedule resumes on the 10s grid.
    assert_eq!(*starts.lock().unwrap(), vec![0, 25, 30, 40]);
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
}

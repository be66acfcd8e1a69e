// tests/ingest_cycle.rs
//
// Full cycles against fixture feeds, without sockets.
//
// Covered:
// - fault isolation (erroring and hanging sources)
// - idempotence across consecutive cycles
// - cache order after a cycle
// - cache bound with a small capacity

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use newswire::ingest::providers::feed::FeedProvider;
use newswire::ingest::types::{RawItem, SourceProvider};
use newswire::{build_app, AppConfig};

const DEALS_XML: &str = include_str!("fixtures/deals_rss.xml");
const VENTURE_XML: &str = include_str!("fixtures/venture_atom.xml");

struct BrokenProvider;

#[async_trait]
impl SourceProvider for BrokenProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>> {
        Err(anyhow!("connection reset by peer"))
    }
    fn name(&self) -> &str {
        "broken"
    }
}

struct HangingProvider;

#[async_trait]
impl SourceProvider for HangingProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(vec![])
    }
    fn name(&self) -> &str {
        "hanging"
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        sources: vec![],
        fetch_timeout_secs: 1,
        ..AppConfig::default()
    }
}

fn fixture_providers() -> Vec<Box<dyn SourceProvider>> {
    vec![
        Box::new(FeedProvider::from_fixture("deals", DEALS_XML)),
        Box::new(FeedProvider::from_fixture("venture", VENTURE_XML)),
    ]
}

#[tokio::test]
async fn failing_sources_do_not_block_the_others() {
    let mut providers: Vec<Box<dyn SourceProvider>> = vec![Box::new(BrokenProvider)];
    providers.extend(fixture_providers());
    providers.push(Box::new(HangingProvider));

    let app = build_app(&test_config(), providers);
    let mut viewer = app.hub.connect().await;

    let report = app.ingestor.run_cycle().await;
    assert_eq!(report.sources, 4);
    assert_eq!(report.failed_sources, 2);
    assert_eq!(report.fetched, 5);
    assert_eq!(report.new_items, 5);
    assert_eq!(report.cache_len, 5);

    let mut live = Vec::new();
    while let Ok(item) = viewer.rx.try_recv() {
        live.push(item.source.clone());
    }
    assert_eq!(live.len(), 5, "every new item is broadcast in the same cycle");
    assert!(live.iter().any(|s| s == "deals"));
    assert!(live.iter().any(|s| s == "venture"));
}

#[tokio::test]
async fn same_feed_twice_is_broadcast_once() {
    let app = build_app(&test_config(), fixture_providers());
    let mut viewer = app.hub.connect().await;

    let first = app.ingestor.run_cycle().await;
    let second = app.ingestor.run_cycle().await;
    assert_eq!(first.new_items, 5);
    assert_eq!(second.new_items, 0);
    assert_eq!(second.cache_len, 5);

    let mut count = 0;
    while viewer.rx.try_recv().is_ok() {
        count += 1;
    }
    assert_eq!(count, 5);
}

#[tokio::test]
async fn cache_is_newest_first_with_undated_last() {
    let app = build_app(&test_config(), fixture_providers());
    app.ingestor.run_cycle().await;

    let snap = app.hub.snapshot().await;
    let ids: Vec<&str> = snap.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "urn:venture-notes:42",
            "dealsdesk-1001",
            "https://www.dealsdesk.test/2025/09/people-moves",
            "urn:venture-notes:41",
            "https://www.dealsdesk.test/2025/09/lp-letter",
        ]
    );
    assert!(snap[4].date.is_none());

    let merger = &snap[1];
    assert_eq!(merger.title, "Buyout firm closes \u{20AC}2bn merger of logistics groups");
    assert_eq!(merger.event_type, "Deal Event");
    assert_eq!(merger.source_host, "dealsdesk.test");
    assert_eq!(snap[0].event_type, "Tech News");
    assert_eq!(snap[2].event_type, "Advisor Update");
    assert_eq!(snap[4].event_type, "Other");
}

#[tokio::test]
async fn cache_never_exceeds_capacity() {
    let cfg = AppConfig {
        cache_capacity: 2,
        compaction_threshold: 3,
        ..test_config()
    };
    let app = build_app(&cfg, fixture_providers());
    for _ in 0..3 {
        let report = app.ingestor.run_cycle().await;
        assert!(report.cache_len <= 2);
    }
    let snap = app.hub.snapshot().await;
    assert_eq!(snap.len(), 2);
    assert!(snap[0].date >= snap[1].date);
}

#[tokio::test]
async fn ingestor_is_shareable_across_tasks() {
    let app = build_app(&test_config(), fixture_providers());
    let ing = Arc::clone(&app.ingestor);
    let report = tokio::spawn(async move { ing.run_cycle().await })
        .await
        .expect("cycle task");
    assert_eq!(report.new_items, 5);
}

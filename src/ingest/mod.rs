// src/ingest/mod.rs
pub mod providers;
pub mod scheduler;
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;

use crate::cache::NewsCache;
use crate::classify::Classifier;
use crate::dedup::SeenIds;
use crate::hub::NewsHub;
use crate::ingest::types::{RawItem, SourceProvider};
use crate::news::{item_id, parse_date, source_host, NewsItem, SharedItem};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_items_parsed_total", "Raw items parsed from feeds.");
        describe_counter!("feed_fetch_errors_total", "Feed fetch/parse failures and timeouts.");
        describe_counter!("news_items_broadcast_total", "New items announced to viewers.");
        describe_counter!("ingest_cycles_total", "Ingestion cycles that ran to completion.");
        describe_counter!(
            "ingest_cycle_failures_total",
            "Ingestion cycles aborted by an unexpected failure."
        );
        describe_counter!("seen_ids_compactions_total", "Seen-ID set compactions.");
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
        describe_histogram!("ingest_cycle_ms", "Ingestion cycle duration in milliseconds.");
        describe_gauge!("news_cache_len", "Items currently held in the cache.");
        describe_gauge!("seen_ids_len", "Ids currently held in the seen set.");
        describe_gauge!("viewers_connected", "Viewers currently subscribed.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when the ingestion cycle last completed."
        );
    });
}

/// Normalize headline text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Map a raw feed entry to the canonical item. Never fails: missing fields
/// become empty strings and an unreadable date becomes `None`.
pub fn normalize_item(raw: &RawItem, classifier: &Classifier) -> NewsItem {
    let title = normalize_text(raw.title.as_deref().unwrap_or_default());
    let link = raw.link.as_deref().unwrap_or_default().trim().to_string();
    NewsItem {
        id: item_id(raw.guid.as_deref(), raw.link.as_deref(), raw.title.as_deref()),
        event_type: classifier.classify(&title).to_string(),
        source_host: source_host(&link),
        date: raw.pub_date.as_deref().and_then(parse_date),
        title,
        link,
        source: raw.source.clone(),
    }
}

/// Cache plus seen ids; written only by the ingestion cycle.
#[derive(Debug, Clone, Default)]
pub struct FeedState {
    pub cache: NewsCache,
    pub seen: SeenIds,
}

impl FeedState {
    pub fn new(cache_capacity: usize, compaction_threshold: usize) -> Self {
        Self {
            cache: NewsCache::with_capacity(cache_capacity),
            seen: SeenIds::with_threshold(compaction_threshold),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub new_items: usize,
    pub compacted: bool,
}

/// Commit one cycle's normalized items to `state`.
///
/// Each unseen item is emitted, then cached, then marked seen, in discovery
/// order. An id that shows up twice in the same batch is emitted once. The
/// cache is resorted and trimmed and the seen set compacted at the end.
pub fn apply_new_items<F>(state: &mut FeedState, items: Vec<SharedItem>, mut emit: F) -> ApplyStats
where
    F: FnMut(&SharedItem),
{
    let fresh = state.seen.filter_new(items);
    let mut new_items = 0usize;
    for item in fresh {
        if state.seen.contains(&item.id) {
            continue;
        }
        emit(&item);
        let id = item.id.clone();
        state.cache.insert_all([item]);
        state.seen.mark_seen([id]);
        new_items += 1;
    }

    state.cache.trim();
    let compacted = state.seen.compact(state.cache.ids());
    ApplyStats {
        new_items,
        compacted,
    }
}

/// Raw items from every source that answered, plus the names of those that
/// did not.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub items: Vec<RawItem>,
    pub failed: Vec<String>,
}

/// Fetch every provider concurrently, each bounded by `timeout`.
/// A failing or slow provider contributes zero items; it never fails the batch.
pub async fn fetch_all(providers: &[Box<dyn SourceProvider>], timeout: Duration) -> FetchOutcome {
    let futs = providers.iter().map(|p| async move {
        let res = tokio::time::timeout(timeout, p.fetch_latest()).await;
        (p.name(), res)
    });

    let mut out = FetchOutcome::default();
    for (name, res) in futures::future::join_all(futs).await {
        match res {
            Ok(Ok(mut v)) => out.items.append(&mut v),
            Ok(Err(e)) => {
                tracing::warn!(error = ?e, provider = name, "provider error");
                counter!("feed_fetch_errors_total").increment(1);
                out.failed.push(name.to_string());
            }
            Err(_) => {
                tracing::warn!(provider = name, timeout_ms = timeout.as_millis() as u64, "provider timed out");
                counter!("feed_fetch_errors_total").increment(1);
                out.failed.push(name.to_string());
            }
        }
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub sources: usize,
    pub failed_sources: usize,
    pub fetched: usize,
    pub new_items: usize,
    pub cache_len: usize,
    pub seen_len: usize,
    pub compacted: bool,
    pub elapsed: Duration,
}

/// Owns the feed providers and drives fetch → normalize → dedupe → broadcast
/// → cache against the hub's state.
pub struct Ingestor {
    providers: Vec<Box<dyn SourceProvider>>,
    classifier: Classifier,
    hub: NewsHub,
    fetch_timeout: Duration,
}

impl Ingestor {
    pub fn new(
        providers: Vec<Box<dyn SourceProvider>>,
        classifier: Classifier,
        hub: NewsHub,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            providers,
            classifier,
            hub,
            fetch_timeout,
        }
    }

    pub fn hub(&self) -> &NewsHub {
        &self.hub
    }

    /// Run one full cycle. Must not be called concurrently with itself;
    /// the scheduler guarantees that.
    pub async fn run_cycle(&self) -> CycleReport {
        ensure_metrics_described();
        let t0 = Instant::now();

        let fetched = fetch_all(&self.providers, self.fetch_timeout).await;
        let items: Vec<SharedItem> = fetched
            .items
            .iter()
            .map(|raw| Arc::new(normalize_item(raw, &self.classifier)))
            .collect();
        let fetched_cnt = items.len();

        // Held across broadcast + insert so a connecting viewer sees each item
        // either in its snapshot or on its channel, never both or neither.
        let mut guard = self.hub.state().write().await;
        let state = &mut *guard;
        let stats = apply_new_items(state, items, |item| {
            self.hub.publish(item);
        });
        let (cache_len, seen_len) = (state.cache.len(), state.seen.len());
        drop(guard);

        let elapsed = t0.elapsed();
        counter!("ingest_cycles_total").increment(1);
        counter!("news_items_broadcast_total").increment(stats.new_items as u64);
        if stats.compacted {
            counter!("seen_ids_compactions_total").increment(1);
        }
        gauge!("news_cache_len").set(cache_len as f64);
        gauge!("seen_ids_len").set(seen_len as f64);
        gauge!("ingest_pipeline_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        histogram!("ingest_cycle_ms").record(elapsed.as_secs_f64() * 1_000.0);

        CycleReport {
            sources: self.providers.len(),
            failed_sources: fetched.failed.len(),
            fetched: fetched_cnt,
            new_items: stats.new_items,
            cache_len,
            seen_len,
            compacted: stats.compacted,
            elapsed,
        }
    }
}

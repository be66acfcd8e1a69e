// src/ingest/providers/mod.rs
pub mod feed;

use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::ingest::types::SourceProvider;

/// Shared client for every HTTP feed; one connection pool per process.
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .context("building feed http client")
}

/// One HTTP provider per configured source URL.
pub fn providers_from_config(cfg: &AppConfig) -> Result<Vec<Box<dyn SourceProvider>>> {
    let client = build_http_client(&cfg.user_agent, cfg.fetch_timeout())?;
    Ok(cfg
        .sources
        .iter()
        .map(|url| {
            Box::new(feed::FeedProvider::from_url(url, client.clone())) as Box<dyn SourceProvider>
        })
        .collect())
}

// src/config.rs
//! Runtime configuration: feed list, timings, bounds and the keyword table.
//!
//! Lookup order:
//! 1) `$NEWSWIRE_CONFIG` (must exist when set)
//! 2) `config/newswire.toml`
//! 3) built-in defaults
//!
//! `NEWSWIRE_BIND` and `NEWSWIRE_POLL_INTERVAL_SECS` override the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::classify::{default_rules, CategoryRule, Classifier, OTHER};
use crate::dedup::DEFAULT_COMPACTION_THRESHOLD;
use crate::hub::DEFAULT_BROADCAST_CAPACITY;

pub const ENV_CONFIG_PATH: &str = "NEWSWIRE_CONFIG";
pub const ENV_BIND: &str = "NEWSWIRE_BIND";
pub const ENV_POLL_INTERVAL: &str = "NEWSWIRE_POLL_INTERVAL_SECS";
pub const DEFAULT_CONFIG_PATH: &str = "config/newswire.toml";

/// Private-equity and venture feeds polled when no config says otherwise.
pub const DEFAULT_SOURCES: &[&str] = &[
    "https://www.altassets.net/feed",
    "https://privateequityinfo.com/blog/rss.xml",
    "https://peprofessional.com/feed",
    "https://mattturck.com/feed",
    "https://nvca.org/feed",
    "https://pe-insights.com/feed",
    "https://chiefoutsiders.com/private-equity/rss.xml",
    "https://investmentcouncil.org/content/rss/",
    "https://www.ft.com/private-equity?format=rss",
    "https://angelassociation.co.nz/blog/rss/",
    "https://thisisgoingtobebig.com/blog?format=rss",
    "https://asimplemodel.com/insights/feed",
];

fn default_sources() -> Vec<String> {
    DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect()
}

fn default_user_agent() -> String {
    format!("newswire/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub sources: Vec<String>,
    pub poll_interval_secs: u64,
    pub cache_capacity: usize,
    pub compaction_threshold: usize,
    pub fetch_timeout_secs: u64,
    pub broadcast_capacity: usize,
    pub bind_addr: String,
    pub user_agent: String,
    /// Directory with a built viewer, served at `/` when set.
    pub static_dir: Option<PathBuf>,
    /// Checked in order; first match wins.
    pub categories: Vec<CategoryRule>,
    pub fallback_category: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            poll_interval_secs: 10,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
            fetch_timeout_secs: 15,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            bind_addr: "0.0.0.0:4000".to_string(),
            user_agent: default_user_agent(),
            static_dir: None,
            categories: default_rules(),
            fallback_category: OTHER.to_string(),
        }
    }
}

impl AppConfig {
    /// Load from an explicit TOML file, then sanitize.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AppConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// File lookup (see module docs) followed by env overrides.
    pub fn load_default() -> Result<Self> {
        let cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(bind) = std::env::var(ENV_BIND) {
            if !bind.trim().is_empty() {
                self.bind_addr = bind.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var(ENV_POLL_INTERVAL) {
            self.poll_interval_secs = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_POLL_INTERVAL} must be a whole number of seconds"))?;
        }
        Ok(self.sanitized())
    }

    /// Trim and dedupe sources (first occurrence wins) and clamp numbers to
    /// at least 1.
    pub fn sanitized(mut self) -> Self {
        let mut cleaned: Vec<String> = Vec::with_capacity(self.sources.len());
        for s in &self.sources {
            let t = s.trim();
            if !t.is_empty() && !cleaned.iter().any(|c| c == t) {
                cleaned.push(t.to_string());
            }
        }
        self.sources = cleaned;

        self.poll_interval_secs = self.poll_interval_secs.max(1);
        self.cache_capacity = self.cache_capacity.max(1);
        self.compaction_threshold = self.compaction_threshold.max(1);
        self.fetch_timeout_secs = self.fetch_timeout_secs.max(1);
        self.broadcast_capacity = self.broadcast_capacity.max(1);
        if self.user_agent.trim().is_empty() {
            self.user_agent = default_user_agent();
        }
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.categories.clone(), &self.fallback_category)
    }
}

// src/ingest/types.rs
use anyhow::Result;

/// One entry as a feed delivered it, before normalization.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct RawItem {
    pub guid: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub pub_date: Option<String>, // source-dependent format
    pub source: String,           // feed URL or fixture name
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>>;
    fn name(&self) -> &str;
}

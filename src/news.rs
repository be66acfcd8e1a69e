//! # News Item
//! Canonical record broadcast to viewers and held in the cache.
//!
//! Items are built once by [`crate::ingest::normalize_item`] and never mutated
//! afterwards; the cache and in-flight broadcasts share them through `Arc`.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Host reported when a link cannot be parsed as an absolute URL.
pub const UNKNOWN_HOST: &str = "unknown";

/// Shared handle to an immutable item.
pub type SharedItem = Arc<NewsItem>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    /// Deduplication key: guid, else link, else title.
    pub id: String,
    pub title: String,
    pub link: String,
    /// `None` when the feed gave no date or one we could not parse.
    pub date: Option<DateTime<Utc>>,
    pub event_type: String,
    pub source_host: String,
    /// Feed the item was fetched from.
    pub source: String,
}

impl NewsItem {
    /// Newest-first ordering; undated items sort after every dated one.
    pub fn cmp_newest_first(&self, other: &Self) -> Ordering {
        match (&self.date, &other.date) {
            (Some(a), Some(b)) => b.cmp(a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// First non-empty (after trimming) of guid, link, title.
///
/// Returns an empty string when all three are missing; such items still flow
/// through the pipeline and all share the same (empty) identity.
pub fn item_id(guid: Option<&str>, link: Option<&str>, title: Option<&str>) -> String {
    [guid, link, title]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Hostname of `link` with a leading `www.` stripped, or [`UNKNOWN_HOST`].
pub fn source_host(link: &str) -> String {
    url::Url::parse(link.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .map(|h| if h.starts_with("www.") { h[4..].to_string() } else { h })
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| UNKNOWN_HOST.to_string())
}

/// Parse the publish timestamps feeds actually emit.
///
/// RSS uses RFC 2822, Atom uses RFC 3339; a couple of sloppy variants are
/// accepted and read as UTC. Anything else yields `None`.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

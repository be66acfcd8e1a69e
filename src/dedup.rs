//! # Seen-ID Set
//! Remembers which item ids were already broadcast so a later cycle does not
//! announce them again.
//!
//! Filtering and marking are separate steps: [`SeenIds::filter_new`] never
//! mutates, and the caller commits with [`SeenIds::mark_seen`] once an item has
//! actually been handed out.
//!
//! Compaction is lossy. Once the set outgrows its threshold it is rebuilt from
//! the ids still in the cache, so an item that has already dropped out of the
//! cache is forgotten and will be broadcast again if a feed keeps publishing
//! it. Cached items are never re-announced.

use std::collections::HashSet;

use crate::news::NewsItem;

pub const DEFAULT_COMPACTION_THRESHOLD: usize = 100;

#[derive(Debug, Clone)]
pub struct SeenIds {
    ids: HashSet<String>,
    threshold: usize,
}

impl Default for SeenIds {
    fn default() -> Self {
        Self::with_threshold(DEFAULT_COMPACTION_THRESHOLD)
    }
}

impl SeenIds {
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            ids: HashSet::new(),
            threshold,
        }
    }

    /// Items whose id has not been seen yet, in their original order.
    pub fn filter_new<T>(&self, items: Vec<T>) -> Vec<T>
    where
        T: AsRef<NewsItem>,
    {
        items
            .into_iter()
            .filter(|it| !self.ids.contains(&it.as_ref().id))
            .collect()
    }

    pub fn mark_seen<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids.extend(ids.into_iter().map(Into::into));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Replace the set with `cache_ids` once it grew past the threshold.
    /// Returns `true` when a compaction happened.
    pub fn compact<I, S>(&mut self, cache_ids: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.ids.len() <= self.threshold {
            return false;
        }
        self.ids = cache_ids.into_iter().map(Into::into).collect();
        true
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

//! # News Cache
//! Bounded newest-first store replayed to every viewer that connects.

use std::collections::VecDeque;

use crate::news::SharedItem;

pub const DEFAULT_CACHE_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct NewsCache {
    items: VecDeque<SharedItem>,
    capacity: usize,
}

impl Default for NewsCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl NewsCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(10_000)),
            capacity,
        }
    }

    /// Prepend `items`; the first one given ends up at the front.
    ///
    /// The cache may exceed its capacity until the next [`NewsCache::trim`].
    pub fn insert_all<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = SharedItem>,
    {
        let incoming: Vec<_> = items.into_iter().collect();
        for it in incoming.into_iter().rev() {
            self.items.push_front(it);
        }
    }

    /// Stable sort, newest first; undated items go to the back.
    pub fn resort(&mut self) {
        self.items
            .make_contiguous()
            .sort_by(|a, b| a.cmp_newest_first(b));
    }

    /// Resort, then drop everything past capacity.
    pub fn trim(&mut self) {
        self.resort();
        self.items.truncate(self.capacity);
    }

    /// Full contents in render order (newest first).
    pub fn snapshot(&self) -> Vec<SharedItem> {
        self.items.iter().cloned().collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.items.iter().map(|it| it.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::{NewsItem, UNKNOWN_HOST};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn item(id: &str, secs: Option<i64>) -> SharedItem {
        Arc::new(NewsItem {
            id: id.to_string(),
            title: id.to_string(),
            link: String::new(),
            date: secs.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
            event_type: "Other".into(),
            source_host: UNKNOWN_HOST.into(),
            source: "test".into(),
        })
    }

    fn ids(c: &NewsCache) -> Vec<String> {
        c.ids().map(str::to_string).collect()
    }

    #[test]
    fn insert_all_prepends_in_given_order() {
        let mut c = NewsCache::with_capacity(10);
        c.insert_all([item("old", Some(1))]);
        c.insert_all([item("a", Some(5)), item("b", Some(4))]);
        assert_eq!(ids(&c), vec!["a", "b", "old"]);
    }

    #[test]
    fn resort_is_stable_and_puts_undated_last() {
        let mut c = NewsCache::with_capacity(10);
        c.insert_all([
            item("nodate", None),
            item("x", Some(10)),
            item("tie1", Some(20)),
            item("tie2", Some(20)),
        ]);
        c.resort();
        assert_eq!(ids(&c), vec!["tie1", "tie2", "x", "nodate"]);
    }

    #[test]
    fn trim_keeps_newest_after_sort() {
        let mut c = NewsCache::with_capacity(2);
        c.insert_all([item("mid", Some(2)), item("old", Some(1))]);
        c.insert_all([item("new", Some(3))]);
        assert_eq!(c.len(), 3);
        c.trim();
        assert_eq!(ids(&c), vec!["new", "mid"]);
    }

    #[test]
    fn snapshot_is_newest_first() {
        let mut c = NewsCache::default();
        c.insert_all([item("b", Some(1)), item("a", Some(2))]);
        c.trim();
        let snap: Vec<_> = c.snapshot().iter().map(|i| i.id.clone()).collect();
        assert_eq!(snap, vec!["a", "b"]);
        assert_eq!(c.capacity(), DEFAULT_CACHE_CAPACITY);
    }
}

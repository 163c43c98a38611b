//! Bounded in-memory page cache for the session tier.

use crate::document::PageEntry;
use lru::LruCache;
use std::num::NonZeroUsize;

/// URL-keyed page snapshots with least-recently-used eviction.
///
/// Keys are absolute URLs without fragment (see [`crate::fetch::page_key`]).
#[derive(Debug)]
pub struct SessionCache {
    entries: LruCache<String, PageEntry>,
}

impl SessionCache {
    /// Create a cache holding at most `capacity` pages (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { entries: LruCache::new(capacity) }
    }

    /// Look up a page and mark it most recently used.
    pub fn get(&mut self, key: &str) -> Option<&PageEntry> {
        self.entries.get(key)
    }

    /// Look up a page without touching recency.
    pub fn peek(&self, key: &str) -> Option<&PageEntry> {
        self.entries.peek(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Store or overwrite a page.
    pub fn insert(&mut self, key: String, entry: PageEntry) {
        if let Some((evicted, _)) = self.entries.push(key.clone(), entry)
            && evicted != key
        {
            tracing::debug!(evicted = %evicted, "session cache full, evicted least recently used page");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

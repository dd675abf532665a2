use crate::collection::Document;
use crate::common::CACHE_KEY_SEPARATOR;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Bounded cache of recently written or read document bodies.
///
/// Keys are `"collection:id"`. Eviction is strict insertion-order FIFO: when a
/// new key arrives and the cache is full, the single oldest-inserted entry is
/// dropped. Reads never reorder entries and overwriting an existing key keeps
/// its original position, so a frequently read old entry is still the first
/// to go. There is no expiry; the collection surface refreshes or evicts
/// entries inline with every mutation.
///
/// A capacity of zero disables caching.
#[derive(Clone)]
pub struct RecentAccessCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    capacity: usize,
    entries: Mutex<IndexMap<String, Document>>,
}

impl RecentAccessCache {
    pub fn new(capacity: usize) -> Self {
        RecentAccessCache {
            inner: Arc::new(CacheInner {
                capacity,
                entries: Mutex::new(IndexMap::with_capacity(capacity.min(1024))),
            }),
        }
    }

    /// Builds the composite cache key for a document of a collection.
    #[inline]
    pub fn key(collection: &str, id: &str) -> String {
        format!("{}{}{}", collection, CACHE_KEY_SEPARATOR, id)
    }

    pub fn get(&self, key: &str) -> Option<Document> {
        self.inner.entries.lock().get(key).cloned()
    }

    pub fn put(&self, key: String, document: Document) {
        if self.inner.capacity == 0 {
            return;
        }

        let mut entries = self.inner.entries.lock();
        if let Some(existing) = entries.get_mut(&key) {
            *existing = document;
            return;
        }

        if entries.len() >= self.inner.capacity {
            if let Some((evicted, _)) = entries.shift_remove_index(0) {
                log::trace!("Evicted {} from the recent access cache", evicted);
            }
        }
        entries.insert(key, document);
    }

    pub fn delete(&self, key: &str) -> bool {
        self.inner.entries.lock().shift_remove(key).is_some()
    }

    /// Removes every entry that belongs to `collection`.
    pub fn delete_collection(&self, collection: &str) -> usize {
        let prefix = format!("{}{}", collection, CACHE_KEY_SEPARATOR);
        let mut entries = self.inner.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(&prefix));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.inner.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

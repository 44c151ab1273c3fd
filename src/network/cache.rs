//! Stylesheet cache
//!
//! Bounded LRU cache of parsed stylesheets shared between inliner calls.
//! A key being computed lives in a separate in-flight table with its own
//! slot lock, so concurrent lookups of the same key compute the stylesheet
//! once while other keys proceed freely. Eviction only touches finished
//! entries.

use crate::css::Stylesheet;
use crate::utils::{InlineError, Result};
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// Cache key for a parsed stylesheet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Absolute URL of an external stylesheet
    Url(String),
    /// xxh3 hash of embedded CSS text
    Inline(u64),
}

impl CacheKey {
    /// Key for an external stylesheet
    pub fn url(url: &Url) -> Self {
        Self::Url(url.as_str().to_string())
    }

    /// Key for embedded CSS content
    pub fn inline(css: &str) -> Self {
        Self::Inline(xxhash_rust::xxh3::xxh3_64(css.as_bytes()))
    }
}

/// Slot of an in-flight computation; empty until it succeeds
#[derive(Debug, Default)]
struct CacheSlot {
    stylesheet: Mutex<Option<Arc<Stylesheet>>>,
}

#[derive(Debug)]
struct Entries {
    finished: LruCache<CacheKey, Arc<Stylesheet>>,
    in_flight: HashMap<CacheKey, Arc<CacheSlot>>,
}

/// Thread-safe LRU cache of parsed stylesheets
#[derive(Debug)]
pub struct StylesheetCache {
    entries: Mutex<Entries>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl StylesheetCache {
    /// Create a cache holding at most `capacity` stylesheets
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or(InlineError::InvalidCacheSize(capacity))?;
        Ok(Self {
            entries: Mutex::new(Entries {
                finished: LruCache::new(capacity),
                in_flight: HashMap::new(),
            }),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        })
    }

    fn hit(&self, key: &CacheKey, stylesheet: &Arc<Stylesheet>) -> Result<Arc<Stylesheet>> {
        self.hits.fetch_add(1, Ordering::Relaxed);
        log::trace!("Stylesheet cache hit: {key:?}");
        Ok(Arc::clone(stylesheet))
    }

    /// Return the cached stylesheet for `key`, computing and storing it on a miss
    ///
    /// Concurrent callers with the same key wait for the first computation.
    /// A failed computation is not cached; its waiters look the key up again.
    pub fn get_or_insert<F>(&self, key: CacheKey, compute: F) -> Result<Arc<Stylesheet>>
    where
        F: FnOnce() -> Result<Stylesheet>,
    {
        loop {
            let mut entries = self.entries.lock();
            if let Some(stylesheet) = entries.finished.get(&key) {
                return self.hit(&key, stylesheet);
            }

            if let Some(slot) = entries.in_flight.get(&key).cloned() {
                drop(entries);
                let stored = slot.stylesheet.lock();
                if let Some(stylesheet) = stored.as_ref() {
                    return self.hit(&key, stylesheet);
                }
                continue;
            }

            // The slot is locked before it becomes visible to other callers
            let slot = Arc::new(CacheSlot::default());
            let mut stored = slot.stylesheet.lock();
            entries.in_flight.insert(key.clone(), Arc::clone(&slot));
            drop(entries);

            self.misses.fetch_add(1, Ordering::Relaxed);
            log::trace!("Stylesheet cache miss: {key:?}");
            let result = compute().map(Arc::new);

            let mut entries = self.entries.lock();
            entries.in_flight.remove(&key);
            if let Ok(stylesheet) = &result {
                *stored = Some(Arc::clone(stylesheet));
                entries.finished.put(key, Arc::clone(stylesheet));
            }
            return result;
        }
    }

    /// Check whether a computed stylesheet is stored for `key`
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.lock().finished.contains(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.lock().finished.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().finished.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.entries.lock().finished.cap().get()
    }

    /// Clear all finished entries; in-flight computations still complete
    pub fn clear(&self) {
        self.entries.lock().finished.clear();
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        CacheStats {
            entries: entries.finished.len(),
            capacity: entries.finished.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached entries
    pub entries: usize,
    /// Maximum number of entries
    pub capacity: usize,
    /// Lookups served from the cache
    pub hits: usize,
    /// Lookups that had to compute the stylesheet
    pub misses: usize,
}

//! LRU Cache Module
//!
//! Fixed-capacity, thread-safe cache combining a `HashMap` index with a
//! recency list. Every operation runs inside a single critical section.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use parking_lot::Mutex;

use crate::cache::{CacheEntry, CacheStats, RecencyList};

#[derive(Debug)]
struct Inner {
    /// Key -> value and recency slot
    entries: HashMap<String, CacheEntry>,
    /// Keys ordered most to least recently used
    order: RecencyList,
    stats: CacheStats,
}

// == LRU Cache ==
/// Bounded key/value cache with least-recently-used eviction.
///
/// Every key in the index owns exactly one node in the recency list and the
/// two are only ever mutated together under the same lock.
#[derive(Debug)]
pub struct LruCache {
    capacity: NonZeroUsize,
    inner: Mutex<Inner>,
}

impl LruCache {
    // == Constructor ==
    /// Creates an empty cache that holds at most `capacity` keys.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner {
                entries: HashMap::with_capacity(capacity.get()),
                order: RecencyList::with_capacity(capacity.get()),
                stats: CacheStats::new(),
            }),
        }
    }

    // == Get ==
    /// Returns the value for `key`, promoting it to most recently used.
    ///
    /// A miss has no side effect beyond the miss counter.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.inner.lock();
        let Inner {
            entries,
            order,
            stats,
        } = &mut *inner;

        match entries.get(key) {
            Some(entry) => {
                order.touch(entry.slot);
                stats.record_hit();
                Some(entry.value.clone())
            }
            None => {
                stats.record_miss();
                None
            }
        }
    }

    // == Put ==
    /// Inserts or updates `key`, making it the most recently used.
    ///
    /// When a new key arrives at full capacity the least recently used key is
    /// evicted first and returned.
    pub fn put(&self, key: String, value: String) -> Option<String> {
        let mut inner = self.inner.lock();
        let Inner {
            entries,
            order,
            stats,
        } = &mut *inner;

        if let Some(entry) = entries.get_mut(&key) {
            entry.value = value;
            order.touch(entry.slot);
            return None;
        }

        let mut evicted = None;
        if entries.len() >= self.capacity.get() {
            if let Some(oldest) = order.pop_back() {
                entries.remove(&oldest);
                stats.record_eviction();
                evicted = Some(oldest);
            }
        }

        let slot = order.push_front(key.clone());
        entries.insert(key, CacheEntry::new(value, slot));
        evicted
    }

    // == Remove ==
    /// Deletes `key` if present. Returns whether anything was removed.
    pub fn remove(&self, key: &str) -> bool {
        let mut inner = self.inner.lock();
        let Inner { entries, order, .. } = &mut *inner;

        match entries.remove(key) {
            Some(entry) => {
                order.remove(entry.slot);
                true
            }
            None => false,
        }
    }

    // == Clear ==
    /// Empties the cache. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Checks for `key` without touching its recency.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().order.iter().map(str::to_owned).collect()
    }

    // == Stats ==
    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            total_entries: inner.entries.len(),
            ..inner.stats
        }
    }

    /// Verifies that the index and the recency list describe the same keys.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let inner = self.inner.lock();
        assert!(inner.entries.len() <= self.capacity.get());
        assert_eq!(inner.entries.len(), inner.order.len());

        let ordered: Vec<&str> = inner.order.iter().collect();
        let unique: std::collections::HashSet<&str> = ordered.iter().copied().collect();
        assert_eq!(unique.len(), ordered.len(), "duplicate key in recency list");
        for key in ordered {
            assert!(inner.entries.contains_key(key), "orphan key {key} in list");
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn cache(capacity: usize) -> LruCache {
        LruCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    fn put(cache: &LruCache, key: &str, value: &str) -> Option<String> {
        cache.put(key.to_string(), value.to_string())
    }

    #[test]
    fn test_cache_new() {
        let cache = cache(10);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 10);
    }

    #[test]
    fn test_put_and_get() {
        let cache = cache(10);

        put(&cache, "key1", "value1");

        assert_eq!(cache.get("key1"), Some("value1".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_missing() {
        let cache = cache(10);
        assert_eq!(cache.get("nope"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_put_overwrites_without_growing() {
        let cache = cache(10);

        put(&cache, "key1", "value1");
        put(&cache, "key1", "value2");

        assert_eq!(cache.get("key1"), Some("value2".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_recency_ordering_evicts_oldest() {
        let cache = cache(2);

        put(&cache, "a", "1");
        put(&cache, "b", "2");
        assert_eq!(put(&cache, "c", "3"), Some("a".to_string()));
        put(&cache, "d", "4");

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.len(), 2);
        cache.check_invariants();
    }

    #[test]
    fn test_touch_on_read() {
        let cache = cache(2);

        put(&cache, "a", "1");
        put(&cache, "b", "2");
        cache.get("a");
        let evicted = put(&cache, "c", "3");

        assert_eq!(evicted, Some("b".to_string()));
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
    }

    #[test]
    fn test_update_promotes_key() {
        let cache = cache(2);

        put(&cache, "a", "1");
        put(&cache, "b", "2");
        put(&cache, "a", "1b");
        put(&cache, "c", "3");

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
    }

    #[test]
    fn test_capacity_three_scenario() {
        let cache = cache(3);

        put(&cache, "k1", "v1");
        put(&cache, "k2", "v2");
        put(&cache, "k3", "v3");
        cache.get("k1");
        put(&cache, "k4", "v4");

        assert_eq!(cache.keys(), vec!["k4", "k1", "k3"]);
        assert_eq!(cache.get("k1"), Some("v1".to_string()));
        assert_eq!(cache.get("k3"), Some("v3".to_string()));
        assert_eq!(cache.get("k4"), Some("v4".to_string()));
        assert_eq!(cache.get("k2"), None);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_remove() {
        let cache = cache(3);

        put(&cache, "a", "1");
        put(&cache, "b", "2");

        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));
        assert_eq!(cache.keys(), vec!["b"]);
        cache.check_invariants();
    }

    #[test]
    fn test_remove_then_refill_does_not_evict() {
        let cache = cache(2);

        put(&cache, "a", "1");
        put(&cache, "b", "2");
        cache.remove("a");

        assert_eq!(put(&cache, "c", "3"), None);
        assert_eq!(cache.keys(), vec!["c", "b"]);
    }

    #[test]
    fn test_clear() {
        let cache = cache(3);

        put(&cache, "a", "1");
        put(&cache, "b", "2");
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.keys().is_empty());
        assert_eq!(cache.get("a"), None);
        put(&cache, "c", "3");
        cache.check_invariants();
    }

    #[test]
    fn test_stats_snapshot() {
        let cache = cache(1);

        put(&cache, "a", "1");
        cache.get("a");
        cache.get("b");
        put(&cache, "b", "2");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_concurrent_access_keeps_invariants() {
        let cache = Arc::new(cache(16));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..500 {
                        let key = format!("k{}", (t * 7 + i) % 40);
                        match i % 3 {
                            0 => {
                                cache.put(key, format!("v{i}"));
                            }
                            1 => {
                                cache.get(&key);
                            }
                            _ => {
                                cache.remove(&key);
                            }
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 16);
        cache.check_invariants();
    }
}

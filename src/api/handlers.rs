//! API Handlers
//!
//! The cache-aside protocol: how `create`, `read` and `delete` move values
//! between the LRU cache and the durable store.
//!
//! There is no per-key locking across the two tiers. Concurrent writes and
//! deletes on one key may interleave between the cache step and the store
//! step, so the final state depends on arrival order at each tier.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::LruCache;
use crate::config::WritePolicy;
use crate::datastore::Datastore;
use crate::error::{KvError, Result};
use crate::models::{ReadOutcome, ReadSource};

/// Fibonacci index computed by the `compute` endpoint.
pub const COMPUTE_N: u32 = 40;

// == Orchestrator ==
/// Stateless coordinator shared by every worker.
#[derive(Clone)]
pub struct Orchestrator {
    cache: Arc<LruCache>,
    store: Arc<dyn Datastore>,
    write_policy: WritePolicy,
}

impl Orchestrator {
    pub fn new(cache: Arc<LruCache>, store: Arc<dyn Datastore>, write_policy: WritePolicy) -> Self {
        Self {
            cache,
            store,
            write_policy,
        }
    }

    pub fn cache(&self) -> &LruCache {
        &self.cache
    }

    pub fn write_policy(&self) -> WritePolicy {
        self.write_policy
    }

    // == Create ==
    /// Writes `key = value` to both tiers in the configured order.
    pub fn create(&self, key: &str, value: &str) -> Result<()> {
        if key.is_empty() || value.is_empty() {
            return Err(KvError::Validation("Missing key or value".to_string()));
        }

        match self.write_policy {
            WritePolicy::WriteThrough => {
                self.store_put(key, value)?;
                self.cache.put(key.to_string(), value.to_string());
            }
            WritePolicy::WriteAround => {
                self.cache.put(key.to_string(), value.to_string());
                self.store_put(key, value)?;
            }
        }
        Ok(())
    }

    // == Read ==
    /// Serves from the cache, falling back to the store and warming the
    /// cache with what it finds there.
    pub fn read(&self, key: &str) -> Result<ReadOutcome> {
        if key.is_empty() {
            return Err(KvError::Validation("Missing key".to_string()));
        }

        if let Some(value) = self.cache.get(key) {
            debug!(key, "cache hit");
            return Ok(ReadOutcome {
                value,
                source: ReadSource::Cache,
            });
        }

        let stored = self.store.get(key).map_err(|err| {
            warn!(key, error = %err, "store read failed");
            KvError::from(err)
        })?;

        match stored {
            Some(value) => {
                debug!(key, "cache miss, resolved from store");
                self.cache.put(key.to_string(), value.clone());
                Ok(ReadOutcome {
                    value,
                    source: ReadSource::Store,
                })
            }
            None => Err(KvError::NotFound(key.to_string())),
        }
    }

    // == Delete ==
    /// Drops `key` from the cache, then from the store.
    ///
    /// The store decides the outcome: a key that only lived in the cache is
    /// still evicted from it, but reported as not found.
    pub fn delete(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(KvError::Validation("Missing key".to_string()));
        }

        let was_cached = self.cache.remove(key);
        let removed = self.store.remove(key).map_err(|err| {
            warn!(key, error = %err, "store delete failed");
            KvError::from(err)
        })?;

        if removed {
            Ok(())
        } else {
            if was_cached {
                debug!(key, "key was cached but absent from store");
            }
            Err(KvError::NotFound(key.to_string()))
        }
    }

    // == Compute ==
    /// Fixed CPU-bound workload used to load the worker pool.
    pub fn compute(&self) -> u64 {
        fibonacci(COMPUTE_N)
    }

    fn store_put(&self, key: &str, value: &str) -> Result<()> {
        self.store.put(key, value).map_err(|err| {
            warn!(key, error = %err, "store write failed");
            KvError::from(err)
        })
    }
}

/// Iterative Fibonacci with `fibonacci(0) == 0`.
pub fn fibonacci(n: u32) -> u64 {
    let (mut a, mut b) = (0u64, 1u64);
    for _ in 0..n {
        let next = a.wrapping_add(b);
        a = b;
        b = next;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::{MemoryStore, StoreError};
    use std::num::NonZeroUsize;

    /// Store whose every call fails, for the upstream error paths.
    struct FailingStore;

    impl Datastore for FailingStore {
        fn put(&self, _: &str, _: &str) -> std::result::Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn get(&self, _: &str) -> std::result::Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn remove(&self, _: &str) -> std::result::Result<bool, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    fn orchestrator(policy: WritePolicy) -> (Orchestrator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(LruCache::new(NonZeroUsize::new(100).unwrap()));
        let orch = Orchestrator::new(cache, store.clone(), policy);
        (orch, store)
    }

    fn failing(policy: WritePolicy) -> Orchestrator {
        let cache = Arc::new(LruCache::new(NonZeroUsize::new(100).unwrap()));
        Orchestrator::new(cache, Arc::new(FailingStore), policy)
    }

    #[test]
    fn test_create_then_read_hits_cache() {
        let (orch, store) = orchestrator(WritePolicy::WriteThrough);

        orch.create("k", "v").unwrap();

        let outcome = orch.read("k").unwrap();
        assert_eq!(outcome.value, "v");
        assert_eq!(outcome.source, ReadSource::Cache);
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_read_after_clear_resolves_from_store() {
        let (orch, _) = orchestrator(WritePolicy::WriteThrough);

        orch.create("k", "v").unwrap();
        orch.cache().clear();

        let outcome = orch.read("k").unwrap();
        assert_eq!(outcome.source, ReadSource::Store);
        assert_eq!(outcome.value, "v");

        // the miss warmed the cache
        assert_eq!(orch.read("k").unwrap().source, ReadSource::Cache);
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let (orch, _) = orchestrator(WritePolicy::WriteThrough);

        assert!(matches!(orch.read("nope"), Err(KvError::NotFound(_))));
        assert!(!orch.cache().contains("nope"));
    }

    #[test]
    fn test_delete_removes_both_tiers() {
        let (orch, store) = orchestrator(WritePolicy::WriteThrough);

        orch.create("k", "v").unwrap();
        orch.delete("k").unwrap();

        assert!(matches!(orch.read("k"), Err(KvError::NotFound(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let (orch, _) = orchestrator(WritePolicy::WriteThrough);
        assert!(matches!(orch.delete("nope"), Err(KvError::NotFound(_))));
    }

    #[test]
    fn test_delete_cache_only_key_evicts_and_reports_not_found() {
        let (orch, _) = orchestrator(WritePolicy::WriteThrough);
        orch.cache().put("ghost".to_string(), "v".to_string());

        assert!(matches!(orch.delete("ghost"), Err(KvError::NotFound(_))));
        assert!(!orch.cache().contains("ghost"));
    }

    #[test]
    fn test_validation_does_not_touch_tiers() {
        let (orch, store) = orchestrator(WritePolicy::WriteThrough);

        assert!(matches!(orch.create("", "v"), Err(KvError::Validation(_))));
        assert!(matches!(orch.create("k", ""), Err(KvError::Validation(_))));
        assert!(matches!(orch.read(""), Err(KvError::Validation(_))));
        assert!(matches!(orch.delete(""), Err(KvError::Validation(_))));

        assert!(orch.cache().is_empty());
        assert!(store.is_empty());
        assert_eq!(orch.cache().stats().lookups(), 0);
    }

    #[test]
    fn test_write_through_failure_leaves_cache_untouched() {
        let orch = failing(WritePolicy::WriteThrough);

        assert!(matches!(orch.create("k", "v"), Err(KvError::Upstream(_))));
        assert!(!orch.cache().contains("k"));
    }

    #[test]
    fn test_write_around_failure_keeps_cached_value() {
        let orch = failing(WritePolicy::WriteAround);

        assert!(matches!(orch.create("k", "v"), Err(KvError::Upstream(_))));
        // divergence window: cached but not stored
        assert_eq!(orch.read("k").unwrap().source, ReadSource::Cache);
    }

    #[test]
    fn test_write_around_success() {
        let (orch, store) = orchestrator(WritePolicy::WriteAround);

        orch.create("k", "v").unwrap();

        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
        assert_eq!(orch.read("k").unwrap().source, ReadSource::Cache);
    }

    #[test]
    fn test_store_failure_on_read_and_delete() {
        let orch = failing(WritePolicy::WriteThrough);
        orch.cache().put("k".to_string(), "v".to_string());

        assert!(matches!(orch.read("other"), Err(KvError::Upstream(_))));
        assert!(matches!(orch.delete("k"), Err(KvError::Upstream(_))));
        // cache removal still happened
        assert!(!orch.cache().contains("k"));
    }

    #[test]
    fn test_overwrite_updates_cached_value() {
        let (orch, _) = orchestrator(WritePolicy::WriteThrough);

        orch.create("k", "v1").unwrap();
        orch.create("k", "v2").unwrap();

        assert_eq!(orch.read("k").unwrap().value, "v2");
    }

    #[test]
    fn test_compute_is_deterministic() {
        let (orch, _) = orchestrator(WritePolicy::WriteThrough);
        assert_eq!(orch.compute(), 102_334_155);
        assert_eq!(orch.compute(), orch.compute());
    }

    #[test]
    fn test_fibonacci_small_values() {
        let expected = [0, 1, 1, 2, 3, 5, 8, 13];
        for (n, want) in expected.iter().enumerate() {
            assert_eq!(fibonacci(n as u32), *want);
        }
    }
}

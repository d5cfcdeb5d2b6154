//! Cache Entry Module
//!
//! Defines the value stored per key in the LRU cache.

use crate::cache::lru::Slot;

// == Cache Entry ==
/// A cached value together with its position in the recency order.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached value
    pub value: String,
    /// Where this key sits in the recency list
    pub slot: Slot,
}

impl CacheEntry {
    pub fn new(value: String, slot: Slot) -> Self {
        Self { value, slot }
    }
}

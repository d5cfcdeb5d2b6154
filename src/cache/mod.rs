//! Cache Module
//!
//! In-memory LRU tier that sits in front of the durable store.

mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::{RecencyList, Slot};
pub use stats::CacheStats;
pub use store::LruCache;

/// Cache capacity used when none is configured
pub const DEFAULT_CAPACITY: usize = 1000;

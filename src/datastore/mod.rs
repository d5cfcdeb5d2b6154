//! Datastore Module
//!
//! The durable key/value tier behind the cache. Implementations must be safe
//! to call from every worker at once.

mod memory;
mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

// == Store Error ==
#[derive(Error, Debug)]
pub enum StoreError {
    /// No pooled connection became available in time
    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The store refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

// == Datastore ==
/// Synchronous key/value store. Every call is one round trip.
pub trait Datastore: Send + Sync {
    /// Inserts or overwrites `key`.
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Returns the stored value, or `None` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Deletes `key`. `Ok(false)` means the key was not there.
    fn remove(&self, key: &str) -> Result<bool, StoreError>;
}

// == Descriptor ==
/// Where the durable store lives, parsed from the startup descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// In-process map, gone on restart
    Memory,
    /// SQLite database file
    Sqlite(String),
}

impl StoreLocation {
    /// `memory` / `memory://` select the in-process store; `sqlite://<path>`
    /// or any other string is taken as a SQLite database path.
    pub fn parse(descriptor: &str) -> Self {
        let descriptor = descriptor.trim();
        match descriptor {
            "memory" | "memory://" => StoreLocation::Memory,
            _ => {
                let path = descriptor.strip_prefix("sqlite://").unwrap_or(descriptor);
                StoreLocation::Sqlite(path.to_string())
            }
        }
    }
}

/// Builds the store named by `descriptor`.
///
/// `pool_size` bounds the number of pooled connections and `timeout` bounds
/// both pool checkout and lock waits inside the database. Connections are
/// opened lazily, so reachability problems show up as per-call errors.
pub fn open(descriptor: &str, pool_size: u32, timeout: Duration) -> Arc<dyn Datastore> {
    match StoreLocation::parse(descriptor) {
        StoreLocation::Memory => Arc::new(MemoryStore::new()),
        StoreLocation::Sqlite(path) => Arc::new(SqliteStore::open(&path, pool_size, timeout)),
    }
}

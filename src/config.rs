//! Configuration Module
//!
//! Command-line options, each of which can also come from an environment
//! variable.

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::cache::DEFAULT_CAPACITY;
use crate::pool::default_worker_count;

// == Write Policy ==
/// Order in which `create` updates the two tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WritePolicy {
    /// Store first, cache only after the store acknowledged the write.
    /// A failed store write leaves the cache untouched.
    WriteThrough,
    /// Cache first, then the store. Reads see the value immediately, but a
    /// failed store write leaves the cache holding a value the store lacks
    /// until it is evicted, overwritten or deleted.
    WriteAround,
}

/// Server configuration parameters.
#[derive(Debug, Clone, Parser)]
#[command(name = "multitier_kv", version, about = "Cache-aside key-value server")]
pub struct Config {
    /// Durable store: `memory`, `sqlite://<path>` or a SQLite file path
    #[arg(env = "KV_DATASTORE")]
    pub datastore: String,

    /// Address to listen on
    #[arg(long, env = "KV_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "KV_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Maximum number of keys held in the LRU cache
    #[arg(long, env = "KV_CACHE_CAPACITY", default_value_t = NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN))]
    pub cache_capacity: NonZeroUsize,

    /// Worker threads; defaults to the available parallelism (at least 4)
    #[arg(long, env = "KV_WORKERS")]
    pub workers: Option<NonZeroUsize>,

    /// Tier ordering for writes
    #[arg(long, env = "KV_WRITE_POLICY", value_enum, default_value_t = WritePolicy::WriteThrough)]
    pub write_policy: WritePolicy,

    /// Upper bound for one datastore call (pool checkout and lock waits)
    #[arg(long, env = "KV_STORE_TIMEOUT_MS", default_value_t = 2000)]
    pub store_timeout_ms: u64,

    /// Read/write deadline for a client connection
    #[arg(long, env = "KV_CONNECTION_TIMEOUT_MS", default_value_t = 5000)]
    pub connection_timeout_ms: u64,
}

impl Config {
    /// Worker count, resolving the default when none was given.
    pub fn worker_count(&self) -> NonZeroUsize {
        self.workers.unwrap_or_else(default_worker_count)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    /// `host:port`, accepting hostnames as well as IP literals.
    pub fn listen_addr(&self) -> String {
        match self.host.parse::<std::net::IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, self.port).to_string(),
            Err(_) => format!("{}:{}", self.host, self.port),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            datastore: "memory".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            cache_capacity: NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            workers: None,
            write_policy: WritePolicy::WriteThrough,
            store_timeout_ms: 2000,
            connection_timeout_ms: 5000,
        }
    }
}

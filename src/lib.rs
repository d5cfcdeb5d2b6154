//! Multi-tier KV - A cache-aside key-value server
//!
//! A bounded LRU cache in front of a durable store, with requests executed on
//! a fixed pool of worker threads.

pub mod api;
pub mod cache;
pub mod config;
pub mod datastore;
pub mod error;
pub mod models;
pub mod pool;
pub mod server;

pub use api::Orchestrator;
pub use config::{Config, WritePolicy};
pub use pool::WorkerPool;

//! API Module
//!
//! Request orchestration: the cache-aside protocol and endpoint dispatch.
//!
//! # Endpoints
//! - `/create?key=&value=` - Store a key-value pair in both tiers
//! - `/read?key=` - Read through the cache, falling back to the store
//! - `/delete?key=` - Remove a key from both tiers
//! - `/compute` - Fixed CPU-bound workload
//! - anything else - Capability listing

pub mod handlers;
pub mod routes;

pub use handlers::{fibonacci, Orchestrator, COMPUTE_N};
pub use routes::ROOT_BODY;

//! Request and Response models
//!
//! The decoded request handed to the orchestrator and the response outcome
//! it hands back to the connection layer.

pub mod request;
pub mod response;

// Re-export commonly used types
pub use request::{parse_query_string, percent_decode, Endpoint, Request};
pub use response::{ReadOutcome, ReadSource, Response, TEXT_PLAIN};

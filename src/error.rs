//! Error types for the KV server
//!
//! Every request-level failure ends up as a [`KvError`] and is rendered into
//! a response at the orchestrator boundary; nothing escapes a connection task.

use http::StatusCode;
use thiserror::Error;

use crate::datastore::StoreError;
use crate::models::Response;

// == KV Error Enum ==
#[derive(Error, Debug)]
pub enum KvError {
    /// A required parameter is missing or empty
    #[error("{0}")]
    Validation(String),

    /// Key absent from both the cache and the store
    #[error("Key not found: {0}")]
    NotFound(String),

    /// The durable store failed the operation
    #[error("Store error: {0}")]
    Upstream(#[from] StoreError),
}

impl KvError {
    pub fn status(&self) -> StatusCode {
        match self {
            KvError::Validation(_) => StatusCode::BAD_REQUEST,
            KvError::NotFound(_) => StatusCode::NOT_FOUND,
            KvError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // == Response Conversion ==
    /// Renders the error as a plain-text response.
    ///
    /// Store failure details stay in the logs and are not sent to clients.
    pub fn into_response(self) -> Response {
        let status = self.status();
        match self {
            KvError::Validation(msg) => Response::text(status, msg),
            KvError::NotFound(_) => Response::text(status, "Key not found"),
            KvError::Upstream(_) => Response::text(status, "DB error"),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, KvError>;

//! API Routes
//!
//! Maps a decoded [`Request`] onto an orchestrator operation and renders the
//! result.

use crate::models::{Endpoint, Request, Response};

use super::handlers::Orchestrator;

/// Capability listing served for `/` and for unknown paths.
pub const ROOT_BODY: &str = "Multi-tier KV Server
APIs:
/create?key=&value=
/read?key=
/delete?key=
/compute";

impl Orchestrator {
    /// Handles one request. Never fails: errors become 4xx/5xx responses.
    pub fn handle(&self, request: &Request) -> Response {
        let result = match request.endpoint {
            Endpoint::Create => {
                let key = request.param("key").unwrap_or_default();
                let value = request.param("value").unwrap_or_default();
                self.create(key, value)
                    .map(|()| Response::ok(format_args!("Created key={key}")))
            }
            Endpoint::Read => {
                let key = request.param("key").unwrap_or_default();
                self.read(key).map(Response::ok)
            }
            Endpoint::Delete => {
                let key = request.param("key").unwrap_or_default();
                self.delete(key)
                    .map(|()| Response::ok(format_args!("Deleted key={key}")))
            }
            Endpoint::Compute => Ok(Response::ok(format_args!(
                "fib({})={}",
                super::handlers::COMPUTE_N,
                self.compute()
            ))),
            Endpoint::Root | Endpoint::Unknown => Ok(Response::ok(ROOT_BODY)),
        };

        result.unwrap_or_else(|err| err.into_response())
    }
}

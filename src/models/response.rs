//! Response model
//!
//! The `(status, content type, body)` triple handed back to the connection
//! layer, plus the typed outcomes the orchestrator produces before rendering.

use std::fmt;
use std::io::{self, Write};

use http::StatusCode;

pub const TEXT_PLAIN: &str = "text/plain";

// == Read Outcome ==
/// Which tier answered a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    /// Served from the LRU cache
    Cache,
    /// Cache miss, resolved from the durable store and cached
    Store,
}

/// A successful read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    pub value: String,
    pub source: ReadSource,
}

impl fmt::Display for ReadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            ReadSource::Cache => write!(f, "Cache hit: {}", self.value),
            ReadSource::Store => write!(f, "Cache miss -> DB: {}", self.value),
        }
    }
}

// == Response ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    /// Plain-text response; a trailing newline is appended to `body`.
    pub fn text(status: StatusCode, body: impl fmt::Display) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN,
            body: format!("{body}\n"),
        }
    }

    pub fn ok(body: impl fmt::Display) -> Self {
        Self::text(StatusCode::OK, body)
    }

    // == Wire Format ==
    /// Writes the response as an HTTP/1.1 message that closes the connection.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        write!(
            writer,
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or("Unknown"),
            self.content_type,
            self.body.len(),
        )?;
        writer.write_all(self.body.as_bytes())?;
        writer.flush()
    }
}

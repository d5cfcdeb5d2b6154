//! Per-connection handling, run on a pool worker.

use std::io::{self, BufRead, BufReader, Read};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use http::StatusCode;
use tracing::{debug, warn};

use crate::api::Orchestrator;
use crate::models::{Request, Response};

/// Upper bound on the request line plus headers.
pub const MAX_HEAD_BYTES: u64 = 8 * 1024;

/// Socket deadlines applied to every accepted connection.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionOptions {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl ConnectionOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            read_timeout: timeout,
            write_timeout: timeout,
        }
    }
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }
}

// == Handle Connection ==
/// Reads one request, answers it and closes the socket.
///
/// I/O failures are logged and end the connection; they never reach the
/// worker.
pub fn handle_connection(stream: TcpStream, orchestrator: &Orchestrator, options: ConnectionOptions) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    if let Err(err) = serve_one(&stream, orchestrator, options) {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                debug!(%peer, "connection timed out")
            }
            _ => warn!(%peer, error = %err, "connection error"),
        }
    }

    let _ = stream.shutdown(Shutdown::Both);
}

fn serve_one(
    stream: &TcpStream,
    orchestrator: &Orchestrator,
    options: ConnectionOptions,
) -> io::Result<()> {
    stream.set_read_timeout(Some(options.read_timeout))?;
    stream.set_write_timeout(Some(options.write_timeout))?;

    let Some(line) = read_head(stream)? else {
        // peer closed before sending anything
        return Ok(());
    };

    let response = match Request::from_request_line(&line) {
        Some(request) => {
            debug!(method = %request.method, path = %request.path, "request");
            orchestrator.handle(&request)
        }
        None => Response::text(StatusCode::BAD_REQUEST, "Malformed request line"),
    };

    response.write_to(stream)
}

/// Reads the request head and returns its first line.
///
/// Header lines are consumed and discarded so the socket is not closed with
/// unread data. Bytes that are not UTF-8 are replaced rather than rejected.
/// `None` means the peer sent nothing.
fn read_head(stream: &TcpStream) -> io::Result<Option<String>> {
    let mut reader = BufReader::new(stream.take(MAX_HEAD_BYTES));

    let mut request_line = Vec::new();
    if reader.read_until(b'\n', &mut request_line)? == 0 {
        return Ok(None);
    }

    let mut header = Vec::new();
    loop {
        header.clear();
        let n = reader.read_until(b'\n', &mut header)?;
        if n == 0 || header == b"\r\n" || header == b"\n" {
            break;
        }
    }

    let line = String::from_utf8_lossy(&request_line);
    Ok(Some(line.trim_end().to_string()))
}

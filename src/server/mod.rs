//! Server Module
//!
//! Listens for connections and hands each one to the worker pool. Request
//! handling itself is blocking and runs entirely on pool workers.

pub mod connection;

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api::Orchestrator;
use crate::pool::WorkerPool;

pub use connection::{handle_connection, ConnectionOptions};

// == Accept Loop ==
/// Accepts connections until `shutdown` resolves.
///
/// Each socket is switched to blocking mode and queued on `pool`. Accept
/// errors are logged and skipped. Returns without shutting the pool down;
/// the caller drains it.
pub async fn serve<F>(
    listener: TcpListener,
    pool: Arc<WorkerPool>,
    orchestrator: Arc<Orchestrator>,
    options: ConnectionOptions,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    if let Ok(addr) = listener.local_addr() {
        info!("Server listening on http://{}", addr);
    }

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Stopped accepting connections");
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(err) => {
                        warn!(error = %err, "accept failed");
                        continue;
                    }
                };

                let stream = match stream.into_std().and_then(|s| {
                    s.set_nonblocking(false)?;
                    Ok(s)
                }) {
                    Ok(s) => s,
                    Err(err) => {
                        warn!(%peer, error = %err, "could not hand off connection");
                        continue;
                    }
                };

                let orchestrator = Arc::clone(&orchestrator);
                let task = move || handle_connection(stream, &orchestrator, options);
                if let Err(err) = pool.enqueue(task) {
                    warn!(%peer, error = %err, "dropping connection");
                }
            }
        }
    }
}

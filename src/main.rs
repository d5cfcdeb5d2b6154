//! Multi-tier KV - A cache-aside key-value server
//!
//! Serves `/create`, `/read`, `/delete` and `/compute` from an LRU cache in
//! front of a durable store.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use multitier_kv::cache::LruCache;
use multitier_kv::server::{self, ConnectionOptions};
use multitier_kv::{datastore, Config, Orchestrator, WorkerPool};

/// Main entry point for the KV server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Parse configuration from flags and environment variables
/// 3. Open the durable store with a pool sized to the workers
/// 4. Create the cache, the worker pool and the orchestrator
/// 5. Accept connections until SIGINT/SIGTERM
/// 6. Drain the worker pool
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "multitier_kv=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Multi-tier KV Server");

    let config = Config::parse();
    let workers = config.worker_count();
    info!(
        "Configuration loaded: cache_capacity={}, workers={}, write_policy={:?}, store_timeout={}ms, connection_timeout={}ms",
        config.cache_capacity,
        workers,
        config.write_policy,
        config.store_timeout_ms,
        config.connection_timeout_ms
    );

    let pool_size = u32::try_from(workers.get()).unwrap_or(u32::MAX);
    let store = datastore::open(&config.datastore, pool_size, config.store_timeout());

    let cache = Arc::new(LruCache::new(config.cache_capacity));
    let pool = Arc::new(WorkerPool::new(workers).context("failed to start worker pool")?);
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&cache),
        store,
        config.write_policy,
    ));

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    server::serve(
        listener,
        Arc::clone(&pool),
        orchestrator,
        ConnectionOptions::with_timeout(config.connection_timeout()),
        shutdown_signal(),
    )
    .await;

    let drain_pool = Arc::clone(&pool);
    if let Err(err) = tokio::task::spawn_blocking(move || drain_pool.shutdown()).await {
        warn!(error = %err, "worker pool shutdown did not complete");
    }

    info!(
        "Worker pool drained: completed={}, panicked={}",
        pool.completed_tasks(),
        pool.panicked_tasks()
    );
    info!("Cache stats: {}", cache.stats());
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

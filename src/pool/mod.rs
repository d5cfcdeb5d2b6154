//! Worker Pool Module
//!
//! Fixed set of OS threads draining a shared FIFO of tasks. Each accepted
//! connection becomes one task.

mod worker;

use std::io;
use std::num::NonZeroUsize;
use std::thread;

use thiserror::Error;

pub use worker::WorkerPool;

/// Workers used when the machine reports less parallelism than this.
pub const MIN_WORKERS: usize = 4;

// == Pool Error ==
#[derive(Error, Debug)]
pub enum PoolError {
    /// `shutdown` has started; the task was not queued
    #[error("worker pool is shut down")]
    ShutDown,

    /// The OS refused to start a worker thread
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Available hardware parallelism, never below [`MIN_WORKERS`].
pub fn default_worker_count() -> NonZeroUsize {
    let detected = thread::available_parallelism().map_or(MIN_WORKERS, NonZeroUsize::get);
    NonZeroUsize::new(detected.max(MIN_WORKERS)).unwrap_or(NonZeroUsize::MIN)
}

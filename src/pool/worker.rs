use std::any::Any;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info};

use super::PoolError;

type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<Task>,
    stopping: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<QueueState>,
    available: Condvar,
    completed: AtomicU64,
    panicked: AtomicU64,
}

// == Worker Pool ==
/// Fixed-size pool of worker threads consuming a FIFO task queue.
///
/// Once [`shutdown`](WorkerPool::shutdown) starts, new tasks are rejected but
/// everything already queued still runs before the workers exit. A task that
/// panics is logged and counted; its worker carries on with the next task.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl WorkerPool {
    // == Constructor ==
    /// Starts `size` worker threads.
    pub fn new(size: NonZeroUsize) -> Result<Self, PoolError> {
        let shared = Arc::new(Shared::default());
        let mut workers = Vec::with_capacity(size.get());

        for id in 0..size.get() {
            let worker_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("kv-worker-{id}"))
                .spawn(move || worker_loop(id, &worker_shared));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    let partial = Self {
                        shared,
                        workers: Mutex::new(workers),
                        size: id,
                    };
                    partial.shutdown();
                    return Err(PoolError::Spawn(err));
                }
            }
        }

        info!(workers = size.get(), "worker pool started");
        Ok(Self {
            shared,
            workers: Mutex::new(workers),
            size: size.get(),
        })
    }

    // == Enqueue ==
    /// Queues `task` and wakes one idle worker.
    ///
    /// Fails with [`PoolError::ShutDown`] once shutdown has begun.
    pub fn enqueue<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.shared.state.lock();
            if state.stopping {
                return Err(PoolError::ShutDown);
            }
            state.tasks.push_back(Box::new(task));
        }
        self.shared.available.notify_one();
        Ok(())
    }

    // == Shutdown ==
    /// Stops accepting tasks, lets the workers drain the queue and joins them.
    ///
    /// Safe to call more than once; later calls return once the workers are
    /// gone. Must not be called from inside a task.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            if !state.stopping {
                debug!(pending = state.tasks.len(), "worker pool stopping");
            }
            state.stopping = true;
        }
        self.shared.available.notify_all();

        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            if handle.join().is_err() {
                error!("worker thread exited abnormally");
            }
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Tasks queued but not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().tasks.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.state.lock().stopping
    }

    /// Tasks that ran to completion.
    pub fn completed_tasks(&self) -> u64 {
        self.shared.completed.load(Ordering::Relaxed)
    }

    /// Tasks that panicked.
    pub fn panicked_tasks(&self) -> u64 {
        self.shared.panicked.load(Ordering::Relaxed)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// == Worker Loop ==
// Idle -> Running -> Idle ... -> Exited once stopping and the queue is empty.
fn worker_loop(id: usize, shared: &Shared) {
    debug!(worker = id, "worker started");

    loop {
        let task = {
            let mut state = shared.state.lock();
            while state.tasks.is_empty() && !state.stopping {
                shared.available.wait(&mut state);
            }
            match state.tasks.pop_front() {
                Some(task) => task,
                None => break,
            }
        };

        match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(()) => {
                shared.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                shared.panicked.fetch_add(1, Ordering::Relaxed);
                error!(worker = id, panic = panic_message(&*payload), "task panicked");
            }
        }
    }

    debug!(worker = id, "worker exited");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    fn pool(size: usize) -> WorkerPool {
        WorkerPool::new(NonZeroUsize::new(size).unwrap()).unwrap()
    }

    #[test]
    fn test_runs_enqueued_task() {
        let pool = pool(2);
        let (tx, rx) = mpsc::channel();

        pool.enqueue(move || tx.send(42).unwrap()).unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
        assert_eq!(pool.size(), 2);
    }

    #[test]
    fn test_shutdown_drains_queue() {
        let pool = pool(2);
        let counter = Arc::new(AtomicU64::new(0));

        for _ in 0..200 {
            let counter = Arc::clone(&counter);
            pool.enqueue(move || {
                thread::sleep(Duration::from_micros(50));
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.shutdown();

        assert_eq!(counter.load(Ordering::SeqCst), 200);
        assert_eq!(pool.completed_tasks(), 200);
        assert_eq!(pool.pending(), 0);
    }

    #[test]
    fn test_single_worker_is_fifo() {
        let pool = pool(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..20 {
            let order = Arc::clone(&order);
            pool.enqueue(move || order.lock().push(i)).unwrap();
        }
        pool.shutdown();

        assert_eq!(*order.lock(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_enqueue_after_shutdown_is_rejected() {
        let pool = pool(2);
        pool.shutdown();

        let result = pool.enqueue(|| {});

        assert!(matches!(result, Err(PoolError::ShutDown)));
        assert!(pool.is_shut_down());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let pool = pool(3);
        pool.enqueue(|| {}).unwrap();

        pool.shutdown();
        pool.shutdown();

        assert_eq!(pool.completed_tasks(), 1);
    }

    #[test]
    fn test_panicking_task_is_isolated() {
        let pool = pool(1);
        let (tx, rx) = mpsc::channel();

        pool.enqueue(|| panic!("boom")).unwrap();
        pool.enqueue(move || tx.send("still alive").unwrap()).unwrap();

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            "still alive"
        );
        pool.shutdown();
        assert_eq!(pool.panicked_tasks(), 1);
        assert_eq!(pool.completed_tasks(), 1);
    }

    #[test]
    fn test_tasks_run_in_parallel() {
        let pool = pool(4);
        let barrier = Arc::new(std::sync::Barrier::new(4));
        let (tx, rx) = mpsc::channel();

        for _ in 0..4 {
            let barrier = Arc::clone(&barrier);
            let tx = tx.clone();
            pool.enqueue(move || {
                barrier.wait();
                tx.send(()).unwrap();
            })
            .unwrap();
        }

        for _ in 0..4 {
            rx.recv_timeout(Duration::from_secs(5))
                .expect("all four tasks must be running at once to pass the barrier");
        }
    }

    #[test]
    fn test_drop_joins_workers() {
        let counter = Arc::new(AtomicU64::new(0));
        {
            let pool = pool(2);
            for _ in 0..10 {
                let counter = Arc::clone(&counter);
                pool.enqueue(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }
}

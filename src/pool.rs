//! Fixed-size worker pool.
//!
//! Runs on a dedicated [rayon](https://docs.rs/rayon) thread pool with exactly
//! `threads` threads. [`WorkerPool::run`] spawns one long-lived worker per
//! thread inside a `scope`; each worker pops from the shared
//! [`WorkQueue`] until it observes the drained state and then exits. The
//! scope returns only after every worker has exited, which is the barrier
//! the caller waits on.
//!
//! ```text
//! queue ──try_pop──▶ worker 0 ──work()──▶ result
//!       ──try_pop──▶ worker 1 ──work()──▶ result
//!       ──try_pop──▶ worker N ──work()──▶ result
//!                                  │
//!                         scope ends (barrier)
//! ```
//!
//! `work` is called without any lock held; it may block for as long as it
//! likes (an external render can take minutes). There is no timeout: a stuck
//! `work` call permanently occupies its worker.

use crate::queue::WorkQueue;
use thiserror::Error;

/// Index of a worker within its pool, `0..threads`.
pub type WorkerId = usize;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("failed to start worker threads: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),
}

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl WorkerPool {
    /// Create a pool with `threads` workers (at least one).
    pub fn new(threads: usize) -> Result<Self, PoolError> {
        let threads = threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("render-worker-{i}"))
            .build()?;
        Ok(Self { pool, threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Drain `queue`, calling `work` once per item, and block until every
    /// worker has finished. Results come back grouped by worker; the order
    /// within the returned vector carries no meaning.
    pub fn run<T, R, F>(&self, queue: &WorkQueue<T>, work: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(WorkerId, T) -> R + Sync,
    {
        let mut per_worker: Vec<Vec<R>> = (0..self.threads).map(|_| Vec::new()).collect();
        let work = &work;

        self.pool.scope(|s| {
            for (id, slot) in per_worker.iter_mut().enumerate() {
                s.spawn(move |_| {
                    tracing::trace!(worker = id, "worker started");
                    while let Some(item) = queue.try_pop() {
                        slot.push(work(id, item));
                    }
                    tracing::trace!(worker = id, completed = slot.len(), "queue drained");
                });
            }
        });

        per_worker.into_iter().flatten().collect()
    }
}

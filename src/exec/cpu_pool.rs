// src/exec/cpu_pool.rs

//! Dedicated OS-thread pool for `cpu` tasks.
//!
//! CPU-bound work must not run on the async runtime's threads, so it is sent
//! over a `crossbeam-channel` queue to a fixed set of worker threads. Each
//! submission carries a `tokio::sync::oneshot` sender for its result, so the
//! awaiting job suspends without blocking other scheduler activity.
//!
//! Shutting the pool down drops the queue sender, discards queued work and
//! makes in-progress computations bail out early. A computation whose waiter
//! has gone away (timed out or cancelled) bails out the same way. Their result senders are
//! dropped, which the waiting side observes as [`PoolError::Dropped`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Hard ceiling on the number of worker threads.
pub const MAX_POOL_WORKERS: usize = 16;

const MODULUS: u64 = 1_000_000_007;

/// How many iterations run between checks of the shutdown flag.
const CANCEL_CHECK_INTERVAL: u64 = 1 << 16;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to spawn cpu worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("cpu worker pool has been shut down")]
    Shutdown,

    #[error("cpu work was dropped before completing")]
    Dropped,
}

/// Deterministic modular accumulation: `sum((0..work)) mod 1_000_000_007`.
pub fn cpu_work(work: u64) -> u64 {
    let mut s = 0u64;
    for i in 0..work {
        s = (s + i % MODULUS) % MODULUS;
    }
    s
}

/// Same as [`cpu_work`], but gives up (returning `None`) once `stop` says so.
fn cpu_work_until(work: u64, stop: impl Fn() -> bool) -> Option<u64> {
    let mut s = 0u64;
    for i in 0..work {
        if i % CANCEL_CHECK_INTERVAL == 0 && stop() {
            return None;
        }
        s = (s + i % MODULUS) % MODULUS;
    }
    Some(s)
}

/// Pool size for a requested worker count: the request (or the core count
/// when absent), clamped to `1..=MAX_POOL_WORKERS`.
pub fn pool_size(requested: Option<usize>) -> usize {
    requested
        .filter(|n| *n > 0)
        .unwrap_or_else(num_cpus::get)
        .clamp(1, MAX_POOL_WORKERS)
}

struct CpuJob {
    work: u64,
    reply: oneshot::Sender<u64>,
}

/// Fixed-size pool of CPU worker threads.
pub struct CpuPool {
    tx: Mutex<Option<Sender<CpuJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
    size: usize,
}

impl std::fmt::Debug for CpuPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuPool")
            .field("size", &self.size)
            .field("shutdown", &self.shutdown.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl CpuPool {
    /// Spawn `size` worker threads.
    pub fn new(size: usize) -> Result<Self, PoolError> {
        let size = size.max(1);
        let (tx, rx) = unbounded::<CpuJob>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut workers = Vec::with_capacity(size);

        for worker_id in 0..size {
            let rx = rx.clone();
            let flag = Arc::clone(&shutdown);
            let spawned = thread::Builder::new()
                .name(format!("jobdag-cpu-{worker_id}"))
                .spawn(move || worker_loop(worker_id, rx, flag));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    shutdown.store(true, Ordering::Release);
                    drop(tx);
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(PoolError::Spawn(e));
                }
            }
        }

        info!(size, "cpu worker pool started");

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            shutdown,
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Run `work` iterations on a worker thread and await the result.
    pub async fn run(&self, work: u64) -> Result<u64, PoolError> {
        let rx = self.submit(work)?;
        rx.await.map_err(|_| PoolError::Dropped)
    }

    fn submit(&self, work: u64) -> Result<oneshot::Receiver<u64>, PoolError> {
        let (reply, rx) = oneshot::channel();
        let guard = self.tx.lock();
        let tx = guard.as_ref().ok_or(PoolError::Shutdown)?;
        tx.send(CpuJob { work, reply })
            .map_err(|_| PoolError::Shutdown)?;
        Ok(rx)
    }

    /// Stop accepting work, cancel outstanding work and join the workers.
    ///
    /// Idempotent; only the first call does anything.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        self.tx.lock().take();

        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if handle.join().is_err() {
                warn!("cpu worker thread panicked");
            }
        }

        info!(size = self.size, "cpu worker pool shut down");
    }
}

impl Drop for CpuPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(worker_id: usize, rx: Receiver<CpuJob>, shutdown: Arc<AtomicBool>) {
    debug!(worker_id, "cpu worker started");

    while let Ok(job) = rx.recv() {
        if shutdown.load(Ordering::Acquire) {
            // Queued work is discarded; dropping `reply` notifies the waiter.
            continue;
        }
        if job.reply.is_closed() {
            // Waiter timed out or was cancelled before we got here.
            continue;
        }
        // A waiter that goes away mid-computation frees the worker too.
        let stop = || shutdown.load(Ordering::Acquire) || job.reply.is_closed();
        if let Some(sum) = cpu_work_until(job.work, stop) {
            let _ = job.reply.send(sum);
        }
    }

    debug!(worker_id, "cpu worker exiting");
}

/// Pool created on first use and torn down once per run.
#[derive(Debug)]
pub struct LazyCpuPool {
    size: usize,
    pool: Mutex<Option<Arc<CpuPool>>>,
    closed: AtomicBool,
}

impl LazyCpuPool {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            pool: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Get the pool, spawning it on first call.
    pub fn get(&self) -> Result<Arc<CpuPool>, PoolError> {
        let mut slot = self.pool.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolError::Shutdown);
        }
        if let Some(pool) = slot.as_ref() {
            return Ok(Arc::clone(pool));
        }
        let pool = Arc::new(CpuPool::new(self.size)?);
        *slot = Some(Arc::clone(&pool));
        Ok(pool)
    }

    /// Whether the pool has been created.
    pub fn is_started(&self) -> bool {
        self.pool.lock().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Shut the pool down (if it was ever created) and refuse further use.
    pub fn shutdown(&self) {
        let pool = {
            let mut slot = self.pool.lock();
            self.closed.store(true, Ordering::Release);
            slot.as_ref().map(Arc::clone)
        };
        if let Some(pool) = pool {
            pool.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn cpu_work_matches_closed_form_for_small_inputs() {
        assert_eq!(cpu_work(0), 0);
        assert_eq!(cpu_work(1), 0);
        assert_eq!(cpu_work(10), 45);
        assert_eq!(cpu_work(1000), 499_500);
    }

    #[test]
    fn pool_size_is_bounded() {
        assert_eq!(pool_size(Some(4)), 4);
        assert_eq!(pool_size(Some(64)), MAX_POOL_WORKERS);
        let auto = pool_size(None);
        assert!((1..=MAX_POOL_WORKERS).contains(&auto));
        assert_eq!(pool_size(Some(0)), auto);
    }

    #[test]
    fn stop_flag_aborts_work() {
        assert_eq!(cpu_work_until(10, || true), None);
        assert_eq!(cpu_work_until(10, || false), Some(45));
    }

    #[tokio::test]
    async fn abandoned_work_frees_its_worker() {
        let pool = CpuPool::new(1).unwrap();

        // Effectively endless; the waiter gives up almost at once.
        let abandoned = tokio::time::timeout(Duration::from_millis(20), pool.run(u64::MAX)).await;
        assert!(abandoned.is_err());

        let next = tokio::time::timeout(Duration::from_secs(5), pool.run(10)).await;
        assert_eq!(next.expect("worker still busy with abandoned work").unwrap(), 45);
        pool.shutdown();
    }

    #[tokio::test]
    async fn runs_work_on_worker_threads() {
        let pool = CpuPool::new(2).unwrap();
        let (a, b) = tokio::join!(pool.run(10), pool.run(1000));
        assert_eq!(a.unwrap(), 45);
        assert_eq!(b.unwrap(), 499_500);
        pool.shutdown();
        assert!(pool.is_shut_down());
        assert!(matches!(pool.run(10).await, Err(PoolError::Shutdown)));
    }

    #[tokio::test]
    async fn lazy_pool_starts_on_demand_and_stays_closed() {
        let lazy = LazyCpuPool::new(1);
        assert!(!lazy.is_started());
        let pool = lazy.get().unwrap();
        assert_eq!(pool.run(3).await.unwrap(), 3);
        assert!(lazy.is_started());

        lazy.shutdown();
        assert!(lazy.is_closed());
        assert!(pool.is_shut_down());
        assert!(matches!(lazy.get(), Err(PoolError::Shutdown)));
        // A second shutdown is a no-op.
        lazy.shutdown();
    }
}

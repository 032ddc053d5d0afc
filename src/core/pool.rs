//! The public pool facade and its shutdown protocol.
//!
//! `DynamicPool` forwards jobs to the [`JobQueue`] and resize requests to the
//! manager thread, and gates both on the shutdown flag. Shutdown runs once:
//!
//! 1. fire the cancellation token, unblocking pending submits and resize
//!    requests and ending the manager loop;
//! 2. close the worker set and fire every tracked worker's stop signal;
//! 3. close the job queue;
//! 4. join the manager and every worker thread ever launched.
//!
//! The shutdown flag is claimed with a compare-and-swap, so exactly one caller
//! tears down. No lock is held across the joins; later callers wait on a
//! fire-once `stopped` event instead, except when they run on one of the
//! pool's own workers, which the teardown itself may be joining.

use std::fmt::{self, Display};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PoolConfig;

use super::error::PoolError;
use super::handler::{log_job, JobHandler, WorkerId};
use super::manager::{Manager, Request, WorkerSet, REQUEST_BACKLOG};
use super::queue::JobQueue;
use super::signal::{CancellationToken, FireOnce};
use super::stats::{PoolCounters, PoolStats};
use super::tracker::CompletionTracker;
use super::worker::{current_pool, WorkerContext, WorkerThreads};

/// A worker pool whose worker count can change while it runs.
///
/// The handle is cheap to clone; all clones drive the same pool. Jobs are
/// processed by whichever worker draws them first, each exactly once.
///
/// Threads are joined only by [`shutdown`](Self::shutdown). A handler that
/// captures a clone of its own pool keeps the pool alive from inside its
/// workers, so dropping every outside handle never releases it; such a
/// handler should hold a handle it can clear, or the owner must call
/// `shutdown`.
///
/// # Example
///
/// ```rust
/// use dynapool::core::DynamicPool;
///
/// let pool: DynamicPool = DynamicPool::new(10).unwrap();
/// pool.add_worker();
/// pool.submit("job-1".to_string()).unwrap();
/// pool.shutdown();
/// assert!(pool.submit("job-2".to_string()).is_err());
/// ```
pub struct DynamicPool<J = String> {
    inner: Arc<PoolInner<J>>,
}

struct PoolInner<J> {
    id: Uuid,
    config: PoolConfig,
    queue: JobQueue<J>,
    requests: Sender<Request>,
    cancel: CancellationToken,
    shutdown: AtomicBool,
    /// Fired once teardown has finished.
    stopped: FireOnce,
    workers: Arc<Mutex<WorkerSet>>,
    tracker: Arc<CompletionTracker>,
    manager: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<PoolCounters>,
}

impl<J> Clone for DynamicPool<J> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<J> fmt::Debug for DynamicPool<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicPool")
            .field("id", &self.inner.id)
            .field("buffer_size", &self.inner.config.buffer_size)
            .field("active_workers", &self.inner.workers.lock().len())
            .field("shutdown", &self.inner.shutdown.load(Ordering::Acquire))
            .finish()
    }
}

impl<J: Display + Send + 'static> DynamicPool<J> {
    /// Create a pool whose workers log each job they process.
    ///
    /// The pool starts with no workers; call [`add_worker`](Self::add_worker).
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if `buffer_size` is zero, or
    /// `PoolError::Spawn` if the manager thread cannot be started.
    pub fn new(buffer_size: usize) -> Result<Self, PoolError> {
        Self::with_config(PoolConfig::new(buffer_size), log_job::<J>)
    }
}

impl<J: Send + 'static> DynamicPool<J> {
    /// Create a pool with a custom job handler.
    ///
    /// # Errors
    ///
    /// See [`with_config`](Self::with_config).
    pub fn with_handler<H: JobHandler<J>>(buffer_size: usize, handler: H) -> Result<Self, PoolError> {
        Self::with_config(PoolConfig::new(buffer_size), handler)
    }

    /// Create a pool from a full configuration.
    ///
    /// Spawns the manager thread and requests `config.initial_workers`
    /// workers from it.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if the configuration is invalid,
    /// or `PoolError::Spawn` if the manager thread cannot be started.
    pub fn with_config<H: JobHandler<J>>(config: PoolConfig, handler: H) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let id = Uuid::new_v4();
        let queue = JobQueue::new(config.buffer_size);
        let cancel = CancellationToken::new();
        let (requests, request_rx) = bounded(REQUEST_BACKLOG);
        let workers = Arc::new(Mutex::new(WorkerSet::new()));
        let tracker = Arc::new(CompletionTracker::new());
        let counters = Arc::new(PoolCounters::default());

        let manager = Manager {
            requests: request_rx,
            workers: Arc::clone(&workers),
            tracker: Arc::clone(&tracker),
            eviction: config.eviction,
            threads: WorkerThreads {
                name_prefix: config.thread_name_prefix.clone(),
                stack_size: config.thread_stack_size,
            },
            ctx: WorkerContext {
                pool_id: id,
                cancel: cancel.clone(),
                jobs: queue.receiver(),
                handler: Arc::new(handler),
                counters: Arc::clone(&counters),
            },
        };
        let manager = thread::Builder::new()
            .name(format!("{}-manager", config.thread_name_prefix))
            .spawn(move || manager.run())
            .map_err(PoolError::Spawn)?;

        info!(
            pool_id = %id,
            buffer_size = config.buffer_size,
            initial_workers = config.initial_workers,
            eviction = ?config.eviction,
            "Dynamic pool initialized"
        );

        let initial_workers = config.initial_workers;
        let pool = Self {
            inner: Arc::new(PoolInner {
                id,
                config,
                queue,
                requests,
                cancel,
                shutdown: AtomicBool::new(false),
                stopped: FireOnce::new(),
                workers,
                tracker,
                manager: Mutex::new(Some(manager)),
                counters,
            }),
        };
        for _ in 0..initial_workers {
            pool.add_worker();
        }
        Ok(pool)
    }

    /// Enqueue a job, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::PoolClosed` if the pool is shut down, or if it
    /// shuts down while this call is waiting for queue space.
    pub fn submit(&self, job: J) -> Result<(), PoolError> {
        if self.is_shutdown() {
            return Err(PoolError::PoolClosed);
        }
        self.inner.queue.push(job, &self.inner.cancel)?;
        self.inner.counters.submitted_jobs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Ask the manager to start one more worker.
    ///
    /// Returns once the manager has accepted the request; the worker starts
    /// shortly after. No-op once the pool is shut down.
    pub fn add_worker(&self) {
        self.request(Request::Add);
    }

    /// Ask the manager to stop one worker, chosen by the eviction policy
    /// (most recently added by default).
    ///
    /// No-op if the pool is shut down or has no active workers.
    pub fn remove_worker(&self) {
        self.request(Request::Remove);
    }

    fn request(&self, request: Request) {
        if self.is_shutdown() {
            debug!(pool_id = %self.inner.id, ?request, "Pool shut down; ignoring request");
            return;
        }
        select! {
            send(self.inner.requests, request) -> res => {
                if res.is_err() {
                    debug!(pool_id = %self.inner.id, ?request, "Manager gone; request dropped");
                }
            }
            recv(self.inner.cancel.listener()) -> _ => {
                debug!(pool_id = %self.inner.id, ?request, "Pool shut down while request pending");
            }
        }
    }

    /// Stop the pool and wait until every worker thread has exited.
    ///
    /// Safe to call any number of times, from any number of threads; only
    /// the first call tears down, and every caller returns after teardown
    /// has finished. The one exception is a job handler of this pool calling
    /// it while another thread is tearing down: it returns at once, since
    /// the teardown is waiting for that handler's worker.
    ///
    /// Jobs still queued are discarded and counted in
    /// [`PoolStats::discarded_jobs`].
    pub fn shutdown(&self) {
        let inner = &self.inner;
        if inner
            .shutdown
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            if current_pool() != Some(inner.id) {
                let _ = inner.stopped.listener().recv();
            }
            return;
        }

        info!(pool_id = %inner.id, "Shutting down dynamic pool");

        inner.cancel.cancel();

        let stopped = inner.workers.lock().close();
        for worker in &stopped {
            worker.stop();
        }

        inner.queue.close();

        let manager = inner.manager.lock().take();
        if let Some(manager) = manager {
            if manager.join().is_err() {
                warn!(pool_id = %inner.id, "Manager thread panicked");
            }
        }
        let joined = inner.tracker.wait_all();

        let discarded = inner.queue.drain();
        if discarded > 0 {
            inner
                .counters
                .discarded_jobs
                .fetch_add(discarded as u64, Ordering::Relaxed);
            warn!(pool_id = %inner.id, discarded, "Discarded jobs still queued at shutdown");
        }

        info!(
            pool_id = %inner.id,
            stopped = stopped.len(),
            joined,
            "Dynamic pool shut down complete"
        );
        inner.stopped.fire();
    }
}

impl<J> DynamicPool<J> {
    /// Unique id of this pool, attached to its log records.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// The configuration the pool was built with.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Whether shutdown has begun (or completed).
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Number of workers currently tracked by the manager.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.inner.workers.lock().len()
    }

    /// Ids of the tracked workers, oldest first.
    #[must_use]
    pub fn worker_ids(&self) -> Vec<WorkerId> {
        self.inner.workers.lock().ids()
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let active = self.worker_count();
        self.inner.counters.snapshot(active, self.inner.queue.len())
    }
}

#[cfg(feature = "tokio-runtime")]
impl<J: Send + 'static> DynamicPool<J> {
    /// [`submit`](Self::submit) on tokio's blocking thread pool.
    ///
    /// # Errors
    ///
    /// As `submit`, plus `PoolError::Internal` if the blocking task fails.
    pub async fn submit_async(&self, job: J) -> Result<(), PoolError> {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || pool.submit(job))
            .await
            .map_err(|e| PoolError::Internal(e.to_string()))?
    }

    /// [`add_worker`](Self::add_worker) on tokio's blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Internal` if the blocking task fails.
    pub async fn add_worker_async(&self) -> Result<(), PoolError> {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || pool.add_worker())
            .await
            .map_err(|e| PoolError::Internal(e.to_string()))
    }

    /// [`remove_worker`](Self::remove_worker) on tokio's blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Internal` if the blocking task fails.
    pub async fn remove_worker_async(&self) -> Result<(), PoolError> {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || pool.remove_worker())
            .await
            .map_err(|e| PoolError::Internal(e.to_string()))
    }

    /// [`shutdown`](Self::shutdown) on tokio's blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Internal` if the blocking task fails.
    pub async fn shutdown_async(&self) -> Result<(), PoolError> {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || pool.shutdown())
            .await
            .map_err(|e| PoolError::Internal(e.to_string()))
    }
}

impl<J> Drop for PoolInner<J> {
    fn drop(&mut self) {
        // Signal shutdown but don't join: threads are detached and exit on
        // their own. Explicit shutdown() is required for a graceful stop.
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            self.cancel.cancel();
            for worker in self.workers.lock().close() {
                worker.stop();
            }
            self.queue.close();
            self.stopped.fire();
            debug!(pool_id = %self.id, "Dynamic pool dropped without explicit shutdown - threads detached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let result = DynamicPool::<String>::new(0);
        assert!(matches!(result, Err(PoolError::InvalidConfig(_))));
    }

    #[test]
    fn test_initial_workers_started() {
        let config = PoolConfig::new(4).with_initial_workers(3);
        let pool = DynamicPool::<u32>::with_config(config, |_: WorkerId, _: u32| {}).unwrap();
        assert!(wait_until(|| pool.worker_count() == 3));
        assert_eq!(pool.worker_ids(), vec![0, 1, 2]);
        pool.shutdown();
        assert_eq!(pool.worker_count(), 0);
    }

    #[test]
    fn test_jobs_reach_handler() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let pool = DynamicPool::<u32>::with_handler(4, move |_: WorkerId, _: u32| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        pool.add_worker();
        for job in 0..10 {
            pool.submit(job).unwrap();
        }
        assert!(wait_until(|| count.load(Ordering::SeqCst) == 10));
        pool.shutdown();

        let stats = pool.stats();
        assert_eq!(stats.submitted_jobs, 10);
        assert_eq!(stats.processed_jobs, 10);
        assert_eq!(stats.discarded_jobs, 0);
    }

    #[test]
    fn test_pending_resize_requests_released_by_shutdown() {
        let pool = DynamicPool::<u32>::with_handler(2, |_: WorkerId, _: u32| {}).unwrap();

        // The manager blocks on the worker set, so requests back up behind it.
        let guard = pool.inner.workers.lock();
        let callers: Vec<_> = (0..4)
            .map(|i| {
                let pool = pool.clone();
                thread::spawn(move || {
                    if i % 2 == 0 {
                        pool.add_worker();
                    } else {
                        pool.remove_worker();
                    }
                })
            })
            .collect();
        thread::sleep(Duration::from_millis(50));
        assert!(callers.iter().filter(|caller| !caller.is_finished()).count() >= 2);

        let shutdown = {
            let pool = pool.clone();
            thread::spawn(move || pool.shutdown())
        };
        assert!(wait_until(|| callers.iter().all(JoinHandle::is_finished)));
        assert!(!shutdown.is_finished());

        drop(guard);
        shutdown.join().unwrap();
        for caller in callers {
            caller.join().unwrap();
        }

        let stats = pool.stats();
        assert_eq!(stats.active_workers, 0);
        assert_eq!(stats.workers_started, stats.workers_exited);
    }

    #[test]
    fn test_shutdown_discards_unprocessed_jobs() {
        let pool = DynamicPool::<u32>::with_handler(8, |_: WorkerId, _: u32| {}).unwrap();
        for job in 0..5 {
            pool.submit(job).unwrap();
        }
        assert_eq!(pool.stats().queued_jobs, 5);
        pool.shutdown();

        let stats = pool.stats();
        assert_eq!(stats.discarded_jobs, 5);
        assert_eq!(stats.queued_jobs, 0);
    }

    #[test]
    fn test_drop_without_shutdown_stops_threads() {
        let pool = DynamicPool::<u32>::with_handler(2, |_: WorkerId, _: u32| {}).unwrap();
        pool.add_worker();
        assert!(wait_until(|| pool.worker_count() == 1));
        let counters = Arc::clone(&pool.inner.counters);
        drop(pool);
        assert!(wait_until(|| counters.workers_exited.load(Ordering::Relaxed) == 1));
    }

    #[test]
    fn test_debug_output() {
        let pool: DynamicPool = DynamicPool::new(3).unwrap();
        let rendered = format!("{pool:?}");
        assert!(rendered.contains("buffer_size: 3"));
        pool.shutdown();
    }
}

//! Worker records and the worker execution loop.
//!
//! A worker is a dedicated OS thread that repeatedly waits for the first of
//! pool cancellation, its own stop signal, or a job from the queue. It never
//! touches the worker set; the manager owns its record.

use std::cell::Cell;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver};
use tracing::{debug, error, info_span};
use uuid::Uuid;

use super::handler::{JobHandler, WorkerId};
use super::signal::{CancellationToken, FireOnce};
use super::stats::PoolCounters;

thread_local! {
    /// Pool served by the current thread, if it is a worker.
    static CURRENT_POOL: Cell<Option<Uuid>> = const { Cell::new(None) };
}

/// Id of the pool whose worker is running on this thread.
pub(crate) fn current_pool() -> Option<Uuid> {
    CURRENT_POOL.with(Cell::get)
}

/// Manager-owned record of a running worker.
#[derive(Debug)]
pub(crate) struct Worker {
    id: WorkerId,
    stop: FireOnce,
}

impl Worker {
    pub(crate) fn new(id: WorkerId) -> Self {
        Self {
            id,
            stop: FireOnce::new(),
        }
    }

    pub(crate) const fn id(&self) -> WorkerId {
        self.id
    }

    /// Ask the worker to leave its loop. Safe to call more than once.
    pub(crate) fn stop(&self) -> bool {
        self.stop.fire()
    }
}

/// Why a worker loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerExit {
    Cancelled,
    Stopped,
    QueueClosed,
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "pool cancelled"),
            Self::Stopped => write!(f, "stop requested"),
            Self::QueueClosed => write!(f, "queue closed"),
        }
    }
}

/// Everything a worker thread shares with the rest of the pool.
pub(crate) struct WorkerContext<J> {
    pub pool_id: Uuid,
    pub cancel: CancellationToken,
    pub jobs: Receiver<J>,
    pub handler: Arc<dyn JobHandler<J>>,
    pub counters: Arc<PoolCounters>,
}

impl<J> Clone for WorkerContext<J> {
    fn clone(&self) -> Self {
        Self {
            pool_id: self.pool_id,
            cancel: self.cancel.clone(),
            jobs: self.jobs.clone(),
            handler: Arc::clone(&self.handler),
            counters: Arc::clone(&self.counters),
        }
    }
}

/// Thread settings applied to every worker.
#[derive(Debug, Clone)]
pub(crate) struct WorkerThreads {
    pub name_prefix: String,
    pub stack_size: Option<usize>,
}

impl WorkerThreads {
    fn builder(&self, id: WorkerId) -> thread::Builder {
        let builder = thread::Builder::new().name(format!("{}-worker-{id}", self.name_prefix));
        match self.stack_size {
            Some(size) => builder.stack_size(size),
            None => builder,
        }
    }
}

/// Launch a worker thread, returning its record and join handle.
pub(crate) fn spawn_worker<J: Send + 'static>(
    id: WorkerId,
    ctx: WorkerContext<J>,
    threads: &WorkerThreads,
) -> io::Result<(Worker, JoinHandle<()>)> {
    let worker = Worker::new(id);
    let stop = worker.stop.listener().clone();
    let handle = threads.builder(id).spawn(move || {
        let span = info_span!("worker", pool_id = %ctx.pool_id, worker_id = id);
        let _entered = span.enter();
        CURRENT_POOL.with(|pool| pool.set(Some(ctx.pool_id)));
        debug!("Worker thread started");

        let exit = run_worker(id, &stop, &ctx);

        ctx.counters.workers_exited.fetch_add(1, Ordering::Relaxed);
        debug!(reason = %exit, "Worker thread exiting");
    })?;
    Ok((worker, handle))
}

/// The worker loop. Returns once cancelled, stopped, or out of work.
pub(crate) fn run_worker<J: Send + 'static>(id: WorkerId, stop: &Receiver<()>, ctx: &WorkerContext<J>) -> WorkerExit {
    loop {
        select! {
            recv(ctx.cancel.listener()) -> _ => return WorkerExit::Cancelled,
            recv(stop) -> _ => return WorkerExit::Stopped,
            recv(ctx.jobs) -> job => match job {
                Ok(job) => process(id, job, ctx),
                Err(_) => return WorkerExit::QueueClosed,
            },
        }
    }
}

fn process<J: Send + 'static>(id: WorkerId, job: J, ctx: &WorkerContext<J>) {
    let handler = &ctx.handler;
    match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(id, job))) {
        Ok(()) => {
            ctx.counters.processed_jobs.fetch_add(1, Ordering::Relaxed);
        }
        Err(payload) => {
            ctx.counters.panicked_jobs.fetch_add(1, Ordering::Relaxed);
            error!(worker_id = id, panic = panic_message(&*payload), "Job handler panicked");
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

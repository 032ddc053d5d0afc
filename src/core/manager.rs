//! The manager: the only thread allowed to start or stop workers.
//!
//! Add and remove requests arrive on one bounded channel, so they are handled
//! one at a time in arrival order. The worker set is locked only for the
//! list edit and the thread spawn, never across a blocking wait.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crossbeam_channel::{select, Receiver};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::config::EvictionPolicy;

use super::handler::WorkerId;
use super::tracker::CompletionTracker;
use super::worker::{spawn_worker, Worker, WorkerContext, WorkerThreads};

/// Pending manager requests accepted before the sender blocks.
pub(crate) const REQUEST_BACKLOG: usize = 1;

/// A resize request sent to the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Request {
    Add,
    Remove,
}

/// Active workers in insertion order, plus the id counter.
#[derive(Debug, Default)]
pub(crate) struct WorkerSet {
    workers: Vec<Worker>,
    next_id: WorkerId,
    closed: bool,
}

impl WorkerSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    pub(crate) fn ids(&self) -> Vec<WorkerId> {
        self.workers.iter().map(Worker::id).collect()
    }

    /// Hand out the next id. Ids are never reused.
    pub(crate) fn allocate_id(&mut self) -> WorkerId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub(crate) fn push(&mut self, worker: Worker) {
        self.workers.push(worker);
    }

    /// Remove the worker the policy selects; `None` when empty.
    pub(crate) fn evict(&mut self, policy: EvictionPolicy) -> Option<Worker> {
        if self.workers.is_empty() {
            return None;
        }
        match policy {
            EvictionPolicy::Lifo => self.workers.pop(),
            EvictionPolicy::Fifo => Some(self.workers.remove(0)),
        }
    }

    pub(crate) const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Refuse further workers and hand back every tracked one.
    pub(crate) fn close(&mut self) -> Vec<Worker> {
        self.closed = true;
        std::mem::take(&mut self.workers)
    }
}

/// State owned by the manager thread.
pub(crate) struct Manager<J> {
    pub requests: Receiver<Request>,
    pub workers: Arc<Mutex<WorkerSet>>,
    pub tracker: Arc<CompletionTracker>,
    pub eviction: EvictionPolicy,
    pub threads: WorkerThreads,
    pub ctx: WorkerContext<J>,
}

impl<J: Send + 'static> Manager<J> {
    /// Serve requests until the pool is cancelled or every handle is gone.
    pub(crate) fn run(self) {
        debug!(pool_id = %self.ctx.pool_id, "Manager started");
        loop {
            select! {
                recv(self.ctx.cancel.listener()) -> _ => break,
                recv(self.requests) -> request => match request {
                    Ok(Request::Add) => self.start_worker(),
                    Ok(Request::Remove) => self.stop_worker(),
                    Err(_) => break,
                },
            }
        }
        debug!(pool_id = %self.ctx.pool_id, "Manager exiting");
    }

    fn start_worker(&self) {
        let mut set = self.workers.lock();
        if set.is_closed() {
            debug!("Worker set closed; ignoring add request");
            return;
        }
        let id = set.allocate_id();
        match spawn_worker(id, self.ctx.clone(), &self.threads) {
            Ok((worker, handle)) => {
                set.push(worker);
                self.tracker.register(id, handle);
                self.ctx.counters.workers_started.fetch_add(1, Ordering::Relaxed);
                debug!(worker_id = id, active = set.len(), "Worker started");
            }
            Err(e) => {
                error!(worker_id = id, error = %e, "Failed to spawn worker thread");
            }
        }
    }

    fn stop_worker(&self) {
        let evicted = self.workers.lock().evict(self.eviction);
        match evicted {
            Some(worker) => {
                worker.stop();
                debug!(worker_id = worker.id(), policy = ?self.eviction, "Worker stopped");
            }
            None => debug!("No active workers; ignoring remove request"),
        }
    }
}

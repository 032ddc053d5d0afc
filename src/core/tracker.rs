//! Completion tracking for launched worker threads.

use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::handler::WorkerId;

/// Join handles of every worker thread launched and not yet joined.
#[derive(Debug, Default)]
pub(crate) struct CompletionTracker {
    handles: Mutex<Vec<(WorkerId, JoinHandle<()>)>>,
}

impl CompletionTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Track a newly launched worker, reaping threads that already exited.
    pub(crate) fn register(&self, id: WorkerId, handle: JoinHandle<()>) {
        let finished = {
            let mut handles = self.handles.lock();
            let (finished, running): (Vec<_>, Vec<_>) =
                handles.drain(..).partition(|(_, handle)| handle.is_finished());
            *handles = running;
            handles.push((id, handle));
            finished
        };
        for (worker_id, handle) in finished {
            join(worker_id, handle);
        }
    }

    /// Number of tracked threads that have not been joined yet.
    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.handles.lock().len()
    }

    /// Join every tracked thread, returning how many were joined.
    ///
    /// The calling thread is skipped if it is itself a tracked worker, so a
    /// job handler may shut its own pool down.
    pub(crate) fn wait_all(&self) -> usize {
        let handles = std::mem::take(&mut *self.handles.lock());
        let current = thread::current().id();
        let mut joined = 0;
        for (worker_id, handle) in handles {
            if handle.thread().id() == current {
                warn!(worker_id, "Shutdown called from a worker thread; not joining itself");
                continue;
            }
            join(worker_id, handle);
            joined += 1;
        }
        joined
    }
}

fn join(worker_id: WorkerId, handle: JoinHandle<()>) {
    match handle.join() {
        Ok(()) => debug!(worker_id, "Worker joined"),
        Err(_) => warn!(worker_id, "Worker thread panicked"),
    }
}

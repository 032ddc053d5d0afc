//! Job handling abstraction invoked by workers.

use std::fmt::Display;

use tracing::info;

/// Identifier assigned to a worker when the manager starts it. Never reused.
pub type WorkerId = u64;

/// Performs the side effect of a single job.
///
/// Called on the worker's own thread. Handlers cannot fail: a panic is
/// caught by the worker, logged and counted, and the worker moves on to the
/// next job.
///
/// A handler that captures a clone of the pool it runs in keeps that pool
/// alive; call `shutdown` explicitly or hold the clone somewhere it can be
/// cleared.
///
/// Any `Fn(WorkerId, J)` closure that is `Send + Sync + 'static` is a handler:
///
/// ```rust
/// use dynapool::core::{DynamicPool, WorkerId};
///
/// let pool = DynamicPool::<String>::with_handler(8, |worker: WorkerId, job: String| {
///     println!("worker {worker}: {job}");
/// })
/// .unwrap();
/// pool.shutdown();
/// ```
pub trait JobHandler<J>: Send + Sync + 'static {
    /// Process `job` on behalf of `worker`.
    fn handle(&self, worker: WorkerId, job: J);
}

impl<J, F> JobHandler<J> for F
where
    F: Fn(WorkerId, J) + Send + Sync + 'static,
{
    fn handle(&self, worker: WorkerId, job: J) {
        self(worker, job);
    }
}

/// Default handler: records which worker processed which job.
pub fn log_job<J: Display>(worker: WorkerId, job: J) {
    info!(worker_id = worker, job = %job, "Worker processed job");
}

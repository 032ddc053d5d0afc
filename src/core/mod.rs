//! Pool lifecycle and concurrency control: queue, signals, workers, manager.

pub mod error;
pub mod handler;
pub mod pool;
pub mod queue;
pub mod signal;
pub mod stats;

mod manager;
mod tracker;
mod worker;

pub use error::{AppResult, PoolError};
pub use handler::{log_job, JobHandler, WorkerId};
pub use pool::DynamicPool;
pub use queue::JobQueue;
pub use signal::{CancellationToken, FireOnce};
pub use stats::PoolStats;

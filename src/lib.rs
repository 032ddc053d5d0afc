//! # dynapool
//!
//! A dynamically resizable worker pool: a bounded job queue serviced by a
//! variable number of worker threads that can be added or removed while the
//! pool runs, with a single coordinated, idempotent shutdown.
//!
//! It is a concurrency primitive meant to be embedded in a larger process,
//! such as a job-processing service.
//!
//! ## Components
//!
//! - **Job queue** ([`core::JobQueue`]): bounded FIFO buffer; producers block
//!   while it is full.
//! - **Workers**: dedicated OS threads that draw jobs from the queue until
//!   stopped, cancelled, or the queue is closed.
//! - **Manager**: one thread that owns the worker set and is the only place
//!   workers are started or stopped, so concurrent resizes never race.
//! - **Pool facade** ([`core::DynamicPool`]): `submit`, `add_worker`,
//!   `remove_worker`, `shutdown`.
//!
//! ## Example
//!
//! ```rust
//! use dynapool::core::{DynamicPool, WorkerId};
//!
//! let pool = DynamicPool::<String>::with_handler(10, |worker: WorkerId, job: String| {
//!     println!("worker {worker}: {job}");
//! })?;
//!
//! for _ in 0..5 {
//!     pool.add_worker();
//! }
//! for i in 0..20 {
//!     pool.submit(format!("job-{i}"))?;
//! }
//!
//! pool.remove_worker();
//! pool.shutdown();
//! assert!(pool.submit("late".to_string()).is_err());
//! # Ok::<(), dynapool::core::PoolError>(())
//! ```
//!
//! Jobs still queued when `shutdown` runs are discarded and counted in
//! [`core::PoolStats::discarded_jobs`]; wait on [`core::DynamicPool::stats`]
//! first if every job must run.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Pool lifecycle, job queue, workers and manager.
pub mod core;
/// Configuration models for the pool.
pub mod config;
/// Shared utilities.
pub mod util;

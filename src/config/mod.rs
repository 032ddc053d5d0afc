//! Configuration models for the worker pool.

pub mod pool;

pub use pool::{EvictionPolicy, PoolConfig, DEFAULT_BUFFER_SIZE, DEFAULT_THREAD_NAME_PREFIX};

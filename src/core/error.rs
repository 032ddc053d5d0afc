//! Error types for pool operations.

use thiserror::Error;

/// Errors produced by the worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool has been shut down, or shut down while the call was waiting.
    #[error("worker pool is shut down")]
    PoolClosed,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An OS thread for the pool could not be spawned.
    #[error("failed to spawn pool thread: {0}")]
    Spawn(#[source] std::io::Error),
    /// Internal failure outside the pool itself (e.g. a blocking task was aborted).
    #[error("internal error: {0}")]
    Internal(String),
}

impl PoolError {
    /// Returns `true` if this error means the pool no longer accepts work.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::PoolClosed)
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

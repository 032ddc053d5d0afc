//! Pool statistics and the lock-free counters behind them.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time view of pool activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Workers currently tracked by the manager.
    pub active_workers: usize,

    /// Jobs waiting in the queue.
    pub queued_jobs: usize,

    /// Jobs accepted by `submit`.
    pub submitted_jobs: u64,

    /// Jobs whose handler ran to completion.
    pub processed_jobs: u64,

    /// Jobs whose handler panicked.
    pub panicked_jobs: u64,

    /// Jobs left in the queue at shutdown and dropped.
    pub discarded_jobs: u64,

    /// Worker threads ever launched.
    pub workers_started: u64,

    /// Worker threads that have left their loop.
    pub workers_exited: u64,
}

impl PoolStats {
    /// Worker threads still running (stopped workers may take a moment to exit).
    #[must_use]
    pub const fn live_workers(&self) -> u64 {
        self.workers_started.saturating_sub(self.workers_exited)
    }
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub submitted_jobs: AtomicU64,
    pub processed_jobs: AtomicU64,
    pub panicked_jobs: AtomicU64,
    pub discarded_jobs: AtomicU64,
    pub workers_started: AtomicU64,
    pub workers_exited: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, active_workers: usize, queued_jobs: usize) -> PoolStats {
        PoolStats {
            active_workers,
            queued_jobs,
            submitted_jobs: self.submitted_jobs.load(Ordering::Relaxed),
            processed_jobs: self.processed_jobs.load(Ordering::Relaxed),
            panicked_jobs: self.panicked_jobs.load(Ordering::Relaxed),
            discarded_jobs: self.discarded_jobs.load(Ordering::Relaxed),
            workers_started: self.workers_started.load(Ordering::Relaxed),
            workers_exited: self.workers_exited.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_stats_default() {
        let stats = PoolStats::default();
        assert_eq!(stats.active_workers, 0);
        assert_eq!(stats.processed_jobs, 0);
        assert_eq!(stats.live_workers(), 0);
    }

    #[test]
    fn test_pool_counters_snapshot() {
        let counters = PoolCounters::default();
        counters.submitted_jobs.fetch_add(10, Ordering::Relaxed);
        counters.processed_jobs.fetch_add(7, Ordering::Relaxed);
        counters.workers_started.fetch_add(5, Ordering::Relaxed);
        counters.workers_exited.fetch_add(2, Ordering::Relaxed);

        let stats = counters.snapshot(3, 3);
        assert_eq!(stats.active_workers, 3);
        assert_eq!(stats.queued_jobs, 3);
        assert_eq!(stats.submitted_jobs, 10);
        assert_eq!(stats.processed_jobs, 7);
        assert_eq!(stats.live_workers(), 3);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = PoolStats {
            active_workers: 2,
            ..PoolStats::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["active_workers"], 2);
        assert_eq!(json["discarded_jobs"], 0);
    }
}

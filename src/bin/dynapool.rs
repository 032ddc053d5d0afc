//! Demo driver for the dynamic worker pool.
//!
//! Starts a pool configured from `DYNAPOOL_*` variables (a `.env` file is
//! honored), feeds it labeled jobs from several producer threads, shrinks it
//! and shuts it down, logging the final statistics.
//!
//! Extra variables: `DYNAPOOL_DEMO_WORKERS` (default: CPU count, ignored when
//! `DYNAPOOL_INITIAL_WORKERS` is set), `DYNAPOOL_DEMO_PRODUCERS` (default 4),
//! `DYNAPOOL_DEMO_JOBS` jobs per producer (default 5).

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use tracing::{info, warn};

use dynapool::config::PoolConfig;
use dynapool::core::{log_job, AppResult, DynamicPool};
use dynapool::util::init_tracing;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

fn env_opt_usize(key: &str) -> AppResult<Option<usize>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} must be a non-negative integer, got `{value}`")),
        Err(_) => Ok(None),
    }
}

fn env_usize(key: &str, default: usize) -> AppResult<usize> {
    Ok(env_opt_usize(key)?.unwrap_or(default))
}

/// The pool starts its own workers; the demo count only fills in when the
/// pool configuration asks for none.
fn demo_config(config: PoolConfig, demo_workers: Option<usize>) -> PoolConfig {
    if config.initial_workers > 0 {
        if let Some(ignored) = demo_workers {
            warn!(
                initial_workers = config.initial_workers,
                ignored, "DYNAPOOL_INITIAL_WORKERS is set; ignoring DYNAPOOL_DEMO_WORKERS"
            );
        }
        return config;
    }
    let workers = demo_workers.unwrap_or_else(num_cpus::get);
    config.with_initial_workers(workers)
}

fn main() -> AppResult<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = PoolConfig::from_env().map_err(|e| anyhow!("invalid pool configuration: {e}"))?;
    let config = demo_config(config, env_opt_usize("DYNAPOOL_DEMO_WORKERS")?);
    let workers = config.initial_workers;
    let producers = env_usize("DYNAPOOL_DEMO_PRODUCERS", 4)?;
    let jobs_per_producer = env_usize("DYNAPOOL_DEMO_JOBS", 5)?;

    let pool: DynamicPool = DynamicPool::with_config(config, log_job::<String>)?;
    info!(pool_id = %pool.id(), workers, producers, jobs_per_producer, "Demo started");

    let handles: Vec<_> = (0..producers)
        .map(|producer| {
            let pool = pool.clone();
            thread::spawn(move || -> AppResult<()> {
                for job in 0..jobs_per_producer {
                    pool.submit(format!("producer {producer} task {job}"))?;
                    thread::sleep(Duration::from_millis(10));
                }
                Ok(())
            })
        })
        .collect();
    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow!("producer thread panicked"))??;
    }

    let deadline = Instant::now() + DRAIN_TIMEOUT;
    while pool.stats().queued_jobs > 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    for _ in 0..3 {
        pool.remove_worker();
    }
    pool.shutdown();

    let stats = pool.stats();
    if stats.discarded_jobs > 0 {
        warn!(discarded = stats.discarded_jobs, "Some jobs were not processed");
    }
    info!(
        submitted = stats.submitted_jobs,
        processed = stats.processed_jobs,
        workers_started = stats.workers_started,
        live_workers = stats.live_workers(),
        "All tasks completed, pool shut down"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_workers_not_doubled() {
        let config = demo_config(PoolConfig::new(8).with_initial_workers(3), Some(5));
        assert_eq!(config.initial_workers, 3);
    }

    #[test]
    fn test_demo_workers_fill_in_when_unconfigured() {
        assert_eq!(demo_config(PoolConfig::new(8), Some(5)).initial_workers, 5);
        assert_eq!(
            demo_config(PoolConfig::new(8), None).initial_workers,
            num_cpus::get()
        );
    }
}

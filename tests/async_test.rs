//! Tests for the tokio-facing async wrappers.

#![cfg(feature = "tokio-runtime")]

use dynapool::core::{DynamicPool, PoolError, WorkerId};
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_submit_and_shutdown() {
    let processed = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&processed);
    let pool = DynamicPool::<u64>::with_handler(4, move |_: WorkerId, job: u64| {
        counter.fetch_add(job, Ordering::SeqCst);
    })
    .unwrap();

    for _ in 0..3 {
        pool.add_worker_async().await.unwrap();
    }

    let submissions = (1..=50).map(|job| pool.submit_async(job));
    for result in join_all(submissions).await {
        result.unwrap();
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while pool.stats().processed_jobs < 50 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(processed.load(Ordering::SeqCst), (1..=50).sum::<u64>());

    pool.remove_worker_async().await.unwrap();
    pool.shutdown_async().await.unwrap();

    let err = pool.submit_async(51).await.unwrap_err();
    assert!(matches!(err, PoolError::PoolClosed));
    assert_eq!(pool.stats().live_workers(), 0);
}

#[tokio::test]
async fn test_async_shutdown_unblocks_pending_submit() {
    let pool = DynamicPool::<u64>::with_handler(1, |_: WorkerId, _: u64| {}).unwrap();
    pool.submit_async(0).await.unwrap();

    let pending = tokio::spawn({
        let pool = pool.clone();
        async move { pool.submit_async(1).await }
    });
    tokio::time::sleep(Duration::from_millis(30)).await;

    pool.shutdown_async().await.unwrap();
    let result = pending.await.unwrap();
    assert!(matches!(result, Err(PoolError::PoolClosed)));
}

//! Concurrency tests: many tasks race for a fixed pool of units and the pool must never be oversold.
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use futures_util::future::join_all;
use log::*;
use reservation_engine::{
    rse_api::ReservationApiError,
    test_utils::NullAuditLog,
    MemoryInventoryStore,
    ReservationApi,
    ReservationPolicy,
};
use tokio::runtime::Builder;

const NUM_THREADS: usize = 8;

fn new_api() -> ReservationApi<MemoryInventoryStore, NullAuditLog> {
    ReservationApi::new(MemoryInventoryStore::new(), NullAuditLog, ReservationPolicy::default())
}

/// 100 users race for the last unit. Exactly one wins, everyone else observes `Insufficient`, and the counter lands
/// on zero rather than going negative.
#[test]
fn last_item_race_100_users() {
    let _ = env_logger::try_init();
    let sys = Builder::new_multi_thread().worker_threads(NUM_THREADS).enable_time().build().unwrap();
    let successes = Arc::new(AtomicU64::new(0));
    let conflicts = Arc::new(AtomicU64::new(0));
    let s2 = successes.clone();
    let c2 = conflicts.clone();
    sys.block_on(async move {
        let api = new_api();
        api.initialize("FLASH-001", 1).await.expect("Error initializing inventory");
        info!("🚀️ Injecting 100 racing reservations");
        let tasks = (0..100).map(|i| {
            let api = api.clone();
            let successes = s2.clone();
            let conflicts = c2.clone();
            tokio::spawn(async move {
                match api.reserve(&format!("user_{i}"), "FLASH-001", 1, None).await {
                    Ok(receipt) => {
                        assert_eq!(receipt.quantity, 1);
                        successes.fetch_add(1, Ordering::Relaxed);
                    },
                    Err(ReservationApiError::Insufficient { available }) => {
                        assert_eq!(available, 0);
                        conflicts.fetch_add(1, Ordering::Relaxed);
                    },
                    Err(e) => panic!("Unexpected error during race: {e}"),
                }
            })
        });
        let results = join_all(tasks).await;
        assert!(results.iter().all(|r| r.is_ok()), "Not all tasks completed happily");
        let status = api.status("FLASH-001").await.unwrap();
        assert_eq!(status.available, 0, "Inventory should be 0, got {}", status.available);
    });
    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(conflicts.load(Ordering::SeqCst), 99);
    info!("🚀️ Last-item race complete: 1 success, 99 conflicts");
}

/// 50 users reserve 2 units each from a pool of exactly 100. Everyone succeeds and the pool drains to zero.
#[test]
fn pool_drains_exactly() {
    let _ = env_logger::try_init();
    let sys = Builder::new_multi_thread().worker_threads(NUM_THREADS).enable_time().build().unwrap();
    sys.block_on(async {
        let api = new_api();
        api.initialize("FLASH-002", 100).await.unwrap();
        let tasks = (0..50).map(|i| {
            let api = api.clone();
            tokio::spawn(async move {
                api.reserve(&format!("user_{i}"), "FLASH-002", 2, None).await.expect("Reservation failed")
            })
        });
        let results = join_all(tasks).await;
        assert!(results.iter().all(|r| r.is_ok()));
        let status = api.status("FLASH-002").await.unwrap();
        assert_eq!(status.available, 0);
    });
}

/// 100 users race for 10 units. The sum of successful quantities plus the remaining stock always equals the initial
/// pool, and the counter never goes negative.
#[test]
fn oversell_is_impossible() {
    let _ = env_logger::try_init();
    let sys = Builder::new_multi_thread().worker_threads(NUM_THREADS).enable_time().build().unwrap();
    let successes = Arc::new(AtomicU64::new(0));
    let s2 = successes.clone();
    sys.block_on(async move {
        let api = new_api();
        api.initialize("FLASH-003", 10).await.unwrap();
        let tasks = (0..100).map(|i| {
            let api = api.clone();
            let successes = s2.clone();
            tokio::spawn(async move {
                match api.reserve(&format!("user_{i}"), "FLASH-003", 1, None).await {
                    Ok(_) => {
                        successes.fetch_add(1, Ordering::Relaxed);
                    },
                    Err(ReservationApiError::Insufficient { available }) => assert!(available >= 0),
                    Err(e) => panic!("Unexpected error during race: {e}"),
                }
            })
        });
        let results = join_all(tasks).await;
        assert!(results.iter().all(|r| r.is_ok()));
        let status = api.status("FLASH-003").await.unwrap();
        assert_eq!(status.available, 0);
    });
    assert_eq!(successes.load(Ordering::SeqCst), 10);
}

/// Concurrent replays of the same fingerprint decrement the pool exactly once and all receive the same receipt.
#[test]
fn concurrent_idempotent_replays_decrement_once() {
    let _ = env_logger::try_init();
    let sys = Builder::new_multi_thread().worker_threads(NUM_THREADS).enable_time().build().unwrap();
    sys.block_on(async {
        let api = new_api();
        api.initialize("FLASH-004", 10).await.unwrap();
        let tasks = (0..10).map(|_| {
            let api = api.clone();
            tokio::spawn(async move { api.reserve("alice", "FLASH-004", 2, Some("fingerprint-1")).await })
        });
        let results = join_all(tasks).await;
        let receipts: Vec<_> = results
            .into_iter()
            .map(|r| r.expect("task panicked").expect("reserve failed"))
            .collect();
        let first = &receipts[0];
        assert!(receipts.iter().all(|r| r.reservation_id == first.reservation_id));
        let status = api.status("FLASH-004").await.unwrap();
        assert_eq!(status.available, 8, "Exactly one decrement expected");
    });
}

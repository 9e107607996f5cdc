//! Lifecycle tests: reserve → confirm / cancel / expire, ownership, idempotent replay, and the accounting invariant
//! that `available + active holds + sold units` never drifts from the initial pool.
use chrono::{Duration, Utc};
use reservation_engine::{
    db_types::AuditEventType,
    rse_api::{CheckoutApiError, ReservationApiError},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{AuditLogging, InventoryStore, TakeOutcome},
    CheckoutApi,
    MemoryInventoryStore,
    ReservationApi,
    ReservationPolicy,
    SqliteDatabase,
};
use srs_common::Money;

async fn setup(
    policy: ReservationPolicy,
) -> (ReservationApi<MemoryInventoryStore, SqliteDatabase>, CheckoutApi<MemoryInventoryStore, SqliteDatabase>) {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let store = MemoryInventoryStore::new();
    let reservations = ReservationApi::new(store.clone(), db.clone(), policy);
    let checkout = CheckoutApi::new(store, db);
    (reservations, checkout)
}

#[tokio::test]
async fn happy_path_confirm_creates_order_and_audit_trail() {
    let (api, checkout) = setup(ReservationPolicy::default()).await;
    api.initialize("FLASH-001", 10).await.unwrap();

    let receipt = api.reserve("alice", "FLASH-001", 2, None).await.unwrap();
    assert_eq!(receipt.sku, "FLASH-001");
    assert_eq!(receipt.ttl_seconds, 300);
    assert!(receipt.expires_at > Utc::now());

    let order = checkout.confirm("alice", &receipt.reservation_id).await.unwrap();
    assert!(order.order_id.as_str().starts_with("ord_"));
    assert_eq!(order.status, "confirmed");
    assert_eq!(order.total_amount, Money::from_cents(5998));
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 2);
    assert_eq!(order.items[0].price_per_unit, Money::from_cents(2999));

    // The units are sold: the counter stays decremented and the record is gone
    assert_eq!(api.status("FLASH-001").await.unwrap().available, 8);
    assert!(api.store().peek(&receipt.reservation_id).await.unwrap().is_none());

    // Fetching the order round-trips
    let fetched = checkout.fetch_order(&order.order_id).await.unwrap();
    assert_eq!(fetched, order);

    let trail = checkout.db().events_for_reservation(&receipt.reservation_id).await.unwrap();
    let kinds: Vec<_> = trail.iter().map(|e| e.event_type).collect();
    assert_eq!(kinds, vec![AuditEventType::Reserve, AuditEventType::Confirm]);
}

#[tokio::test]
async fn idempotent_retry_returns_the_same_reservation() {
    let (api, _) = setup(ReservationPolicy::default()).await;
    api.initialize("FLASH-001", 10).await.unwrap();

    let first = api.reserve("alice", "FLASH-001", 2, Some("attempt-42")).await.unwrap();
    for _ in 0..4 {
        let replay = api.reserve("alice", "FLASH-001", 2, Some("attempt-42")).await.unwrap();
        assert_eq!(replay, first);
    }
    assert_eq!(api.status("FLASH-001").await.unwrap().available, 8);

    // A different fingerprint is a different request
    let other = api.reserve("alice", "FLASH-001", 1, Some("attempt-43")).await.unwrap();
    assert_ne!(other.reservation_id, first.reservation_id);
    assert_eq!(api.status("FLASH-001").await.unwrap().available, 7);
}

#[tokio::test]
async fn failed_reserves_are_not_cached() {
    let (api, _) = setup(ReservationPolicy::default()).await;
    api.initialize("FLASH-001", 1).await.unwrap();

    let err = api.reserve("alice", "FLASH-001", 3, Some("fp-1")).await.unwrap_err();
    assert!(matches!(err, ReservationApiError::Insufficient { available: 1 }));

    // After restocking, the same fingerprint may try again
    api.initialize("FLASH-001", 5).await.unwrap();
    let receipt = api.reserve("alice", "FLASH-001", 3, Some("fp-1")).await.unwrap();
    assert_eq!(receipt.quantity, 3);
}

#[tokio::test]
async fn ownership_is_enforced_on_confirm_and_cancel() {
    let (api, checkout) = setup(ReservationPolicy::default()).await;
    api.initialize("FLASH-001", 10).await.unwrap();
    let receipt = api.reserve("alice", "FLASH-001", 2, None).await.unwrap();

    let err = checkout.confirm("bob", &receipt.reservation_id).await.unwrap_err();
    assert!(matches!(err, CheckoutApiError::Forbidden));
    let err = api.cancel("bob", &receipt.reservation_id).await.unwrap_err();
    assert!(matches!(err, ReservationApiError::Forbidden));

    // The reservation is still live and the owner can still confirm
    assert_eq!(api.status("FLASH-001").await.unwrap().available, 8);
    checkout.confirm("alice", &receipt.reservation_id).await.unwrap();
}

#[tokio::test]
async fn cancel_restores_stock() {
    let (api, _) = setup(ReservationPolicy::default()).await;
    api.initialize("FLASH-001", 10).await.unwrap();
    let receipt = api.reserve("alice", "FLASH-001", 3, None).await.unwrap();
    assert_eq!(api.status("FLASH-001").await.unwrap().available, 7);

    api.cancel("alice", &receipt.reservation_id).await.unwrap();
    assert_eq!(api.status("FLASH-001").await.unwrap().available, 10);

    // A second cancel reports the record gone
    let err = api.cancel("alice", &receipt.reservation_id).await.unwrap_err();
    assert!(matches!(err, ReservationApiError::NotFound(_)));
}

#[tokio::test]
async fn expiry_restores_stock_and_audits() {
    let policy = ReservationPolicy { ttl_seconds: 0, ..Default::default() };
    let (api, checkout) = setup(policy).await;
    api.initialize("FLASH-001", 10).await.unwrap();
    let receipt = api.reserve("alice", "FLASH-001", 3, None).await.unwrap();
    assert_eq!(api.status("FLASH-001").await.unwrap().available, 7);

    let result = api.release_expired(Utc::now() + Duration::seconds(1), 100).await.unwrap();
    assert_eq!(result.released, vec![receipt.reservation_id.clone()]);
    assert_eq!(result.restored_units, 3);
    assert_eq!(result.already_finalised, 0);
    assert_eq!(api.status("FLASH-001").await.unwrap().available, 10);

    // A confirm after the sweep observes the record's absence
    let err = checkout.confirm("alice", &receipt.reservation_id).await.unwrap_err();
    assert!(matches!(err, CheckoutApiError::ReservationNotFound(_)));

    let trail = checkout.db().events_for_reservation(&receipt.reservation_id).await.unwrap();
    let kinds: Vec<_> = trail.iter().map(|e| e.event_type).collect();
    assert_eq!(kinds, vec![AuditEventType::Reserve, AuditEventType::Expire]);

    // A second sweep has nothing to do
    let result = api.release_expired(Utc::now() + Duration::seconds(1), 100).await.unwrap();
    assert_eq!(result.total_count(), 0);
}

/// The sweeper reads its due list, then a confirm lands before it releases. The release must observe the record's
/// absence and leave the accounting alone: the units stay sold.
#[tokio::test]
async fn confirm_during_sweep_gap_wins_exactly_once() {
    let policy = ReservationPolicy { ttl_seconds: 0, ..Default::default() };
    let (api, checkout) = setup(policy).await;
    api.initialize("FLASH-001", 10).await.unwrap();
    let receipt = api.reserve("alice", "FLASH-001", 2, None).await.unwrap();

    // Sweeper pauses after reading the index...
    let due = api.store().due_reservations(Utc::now() + Duration::seconds(1), 100).await.unwrap();
    assert_eq!(due, vec![receipt.reservation_id.clone()]);

    // ...and the client confirms in the gap. The record is past its TTL but not yet swept, so this succeeds.
    let order = checkout.confirm("alice", &receipt.reservation_id).await.unwrap();

    // The sweeper's release for the captured id is now a no-op
    let outcome = api.store().release(&receipt.reservation_id, None).await.unwrap();
    assert_eq!(outcome, TakeOutcome::Gone);

    // Accounting reflects exactly one outcome: 2 units sold, 8 available, nothing restored
    assert_eq!(api.status("FLASH-001").await.unwrap().available, 8);
    assert_eq!(order.items[0].quantity, 2);
}

#[tokio::test]
async fn oversell_attempts_are_audited() {
    let (api, checkout) = setup(ReservationPolicy::default()).await;
    api.initialize("FLASH-001", 1).await.unwrap();
    let err = api.reserve("alice", "FLASH-001", 2, None).await.unwrap_err();
    assert!(matches!(err, ReservationApiError::Insufficient { available: 1 }));

    let blocked = checkout.db().events_of_type(AuditEventType::OversellBlocked).await.unwrap();
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0].sku.as_deref(), Some("FLASH-001"));
    assert_eq!(blocked[0].details["requested"], 2);
    assert_eq!(blocked[0].details["available"], 1);
}

#[tokio::test]
async fn conservation_holds_across_a_mixed_run() {
    let policy = ReservationPolicy { ttl_seconds: 0, ..Default::default() };
    let (api, checkout) = setup(policy).await;
    api.initialize("FLASH-001", 20).await.unwrap();

    let confirmed = api.reserve("alice", "FLASH-001", 2, None).await.unwrap();
    let cancelled = api.reserve("bob", "FLASH-001", 3, None).await.unwrap();
    let abandoned = api.reserve("carol", "FLASH-001", 4, None).await.unwrap();
    let forgotten = api.reserve("dave", "FLASH-001", 5, None).await.unwrap();
    assert_eq!(api.status("FLASH-001").await.unwrap().available, 6);

    checkout.confirm("alice", &confirmed.reservation_id).await.unwrap();
    api.cancel("bob", &cancelled.reservation_id).await.unwrap();
    // Only carol's and dave's holds remain in the index; sweep them
    let result = api.release_expired(Utc::now() + Duration::seconds(1), 100).await.unwrap();
    assert_eq!(result.restored_units, 4 + 5);
    assert!(result.released.contains(&abandoned.reservation_id));
    assert!(result.released.contains(&forgotten.reservation_id));

    // available (18) + sold (2) == initial pool
    assert_eq!(api.status("FLASH-001").await.unwrap().available, 18);
}

#[tokio::test]
async fn input_validation_rejects_bad_quantities_and_skus() {
    let (api, _) = setup(ReservationPolicy::default()).await;
    api.initialize("FLASH-001", 10).await.unwrap();

    for qty in [0, -1, 6] {
        let err = api.reserve("alice", "FLASH-001", qty, None).await.unwrap_err();
        assert!(matches!(err, ReservationApiError::InvalidInput(_)), "quantity {qty} should be rejected");
    }
    let err = api.reserve("alice", "no spaces allowed", 1, None).await.unwrap_err();
    assert!(matches!(err, ReservationApiError::InvalidInput(_)));
    let err = api.initialize("FLASH-001", -1).await.unwrap_err();
    assert!(matches!(err, ReservationApiError::InvalidInput(_)));

    // SKUs are normalised before hitting the store
    let status = api.status(" flash-001 ").await.unwrap();
    assert_eq!(status.sku, "FLASH-001");
    assert_eq!(status.available, 10);
}

#[tokio::test]
async fn reserving_an_uninitialized_sku_fails_cleanly() {
    let (api, _) = setup(ReservationPolicy::default()).await;
    let err = api.reserve("alice", "GHOST-001", 1, None).await.unwrap_err();
    assert!(matches!(err, ReservationApiError::NotInitialized(sku) if sku == "GHOST-001"));

    let status = api.status("GHOST-001").await.unwrap();
    assert!(status.uninitialized);
    assert_eq!(status.available, 0);
}

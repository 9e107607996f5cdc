//! Round-trip tests for the SQLite durable store: orders with line items, and the append-only audit log.
use chrono::Utc;
use reservation_engine::{
    db_types::{AuditEventType, NewAuditEvent, NewOrder, OrderId, OrderItem, ReservationId},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{AuditLogging, OrderManagement},
    SqliteDatabase,
};
use serde_json::json;
use srs_common::Money;

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

#[tokio::test]
async fn order_with_items_round_trips() {
    let db = new_db().await;
    let order_id = OrderId::random();
    let new_order = NewOrder {
        order_id: order_id.clone(),
        user_id: "alice".to_string(),
        total_amount: Money::from_cents(8997),
        created_at: Utc::now(),
        items: vec![
            OrderItem { sku: "FLASH-001".into(), quantity: 2, price_per_unit: Money::from_cents(2999) },
            OrderItem { sku: "FLASH-003".into(), quantity: 2, price_per_unit: Money::from_cents(1499) },
        ],
    };
    let stored = db.insert_order(new_order).await.unwrap();
    assert_eq!(stored.order_id, order_id);
    assert_eq!(stored.status, "confirmed");
    assert_eq!(stored.items.len(), 2);

    let fetched = db.fetch_order(&order_id).await.unwrap().expect("order should exist");
    assert_eq!(fetched.user_id, "alice");
    assert_eq!(fetched.total_amount, Money::from_cents(8997));
    assert_eq!(fetched.items, stored.items);
}

#[tokio::test]
async fn missing_order_is_none() {
    let db = new_db().await;
    assert!(db.fetch_order(&OrderId::random()).await.unwrap().is_none());
}

#[tokio::test]
async fn audit_events_are_appended_and_queryable() {
    let db = new_db().await;
    let rsv = ReservationId::random();
    for (event_type, details) in [
        (AuditEventType::Reserve, json!({"quantity": 2})),
        (AuditEventType::Expire, json!({"quantity": 2, "expired_at": Utc::now()})),
    ] {
        db.record_event(NewAuditEvent {
            event_type,
            user_id: Some("alice".to_string()),
            sku: Some("FLASH-001".to_string()),
            reservation_id: Some(rsv.clone()),
            details,
        })
        .await
        .unwrap();
    }
    // An event without a reservation id (blocked oversell) lands too
    db.record_event(NewAuditEvent {
        event_type: AuditEventType::OversellBlocked,
        user_id: Some("bob".to_string()),
        sku: Some("FLASH-001".to_string()),
        reservation_id: None,
        details: json!({"requested": 5, "available": 0}),
    })
    .await
    .unwrap();

    let trail = db.events_for_reservation(&rsv).await.unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].event_type, AuditEventType::Reserve);
    assert_eq!(trail[1].event_type, AuditEventType::Expire);
    assert_eq!(trail[0].details["quantity"], 2);
    assert!(trail[0].timestamp <= Utc::now());

    let blocked = db.events_of_type(AuditEventType::OversellBlocked).await.unwrap();
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0].user_id.as_deref(), Some("bob"));
    assert!(blocked[0].reservation_id.is_none());
}

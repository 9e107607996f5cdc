use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use super::helpers::{authed_get, authed_post, send, test_backend, TestBackend};

async fn reserve(backend: &TestBackend, user_id: &str, quantity: i64) -> String {
    let req =
        authed_post("/v1/inventory/reserve", user_id).set_json(json!({"sku": "FLASH-001", "quantity": quantity}));
    let (status, body) = send(backend, req).await;
    assert_eq!(status, StatusCode::CREATED);
    body["reservation_id"].as_str().unwrap().to_string()
}

#[actix_web::test]
async fn confirm_converts_the_hold_into_an_order() {
    let backend = test_backend().await;
    send(&backend, authed_post("/v1/inventory/FLASH-001/initialize?quantity=10", "admin")).await;
    let reservation_id = reserve(&backend, "alice", 2).await;

    let req = authed_post("/v1/checkout/confirm", "alice").set_json(json!({"reservation_id": reservation_id.clone()}));
    let (status, order) = send(&backend, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(order["order_id"].as_str().unwrap().starts_with("ord_"));
    assert_eq!(order["status"], "confirmed");
    assert_eq!(order["total"], 5998);
    assert_eq!(order["items"], json!([{"sku": "FLASH-001", "quantity": 2, "price_per_unit": 2999}]));

    // The units stay sold: no restore on confirm
    let (_, body) = send(&backend, TestRequest::get().uri("/v1/inventory/FLASH-001")).await;
    assert_eq!(body["available"], 8);

    // The order is durably fetchable
    let order_id = order["order_id"].as_str().unwrap();
    let (status, fetched) = send(&backend, authed_get(&format!("/v1/checkout/orders/{order_id}"), "alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, order);

    // A second confirm of the same reservation observes its absence
    let req = authed_post("/v1/checkout/confirm", "alice").set_json(json!({"reservation_id": reservation_id.clone()}));
    let (status, body) = send(&backend, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[actix_web::test]
async fn only_the_owner_may_confirm() {
    let backend = test_backend().await;
    send(&backend, authed_post("/v1/inventory/FLASH-001/initialize?quantity=10", "admin")).await;
    let reservation_id = reserve(&backend, "alice", 1).await;

    let req = authed_post("/v1/checkout/confirm", "bob").set_json(json!({"reservation_id": reservation_id.clone()}));
    let (status, body) = send(&backend, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    // The reservation survived the foreign attempt; the owner can still confirm
    let req = authed_post("/v1/checkout/confirm", "alice").set_json(json!({"reservation_id": reservation_id.clone()}));
    let (status, _) = send(&backend, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn confirming_an_unknown_reservation_is_not_found() {
    let backend = test_backend().await;
    let req = authed_post("/v1/checkout/confirm", "alice").set_json(json!({"reservation_id": "rsv_000000000000"}));
    let (status, body) = send(&backend, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[actix_web::test]
async fn cancel_releases_the_hold() {
    let backend = test_backend().await;
    send(&backend, authed_post("/v1/inventory/FLASH-001/initialize?quantity=10", "admin")).await;
    let reservation_id = reserve(&backend, "alice", 3).await;
    let (_, body) = send(&backend, TestRequest::get().uri("/v1/inventory/FLASH-001")).await;
    assert_eq!(body["available"], 7);

    let req = authed_post("/v1/checkout/cancel", "alice").set_json(json!({"reservation_id": reservation_id.clone()}));
    let (status, body) = send(&backend, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (_, body) = send(&backend, TestRequest::get().uri("/v1/inventory/FLASH-001")).await;
    assert_eq!(body["available"], 10);

    // Cancelling again reports the record gone
    let req = authed_post("/v1/checkout/cancel", "alice").set_json(json!({"reservation_id": reservation_id.clone()}));
    let (status, _) = send(&backend, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn only_the_owner_may_cancel() {
    let backend = test_backend().await;
    send(&backend, authed_post("/v1/inventory/FLASH-001/initialize?quantity=10", "admin")).await;
    let reservation_id = reserve(&backend, "alice", 1).await;

    let req = authed_post("/v1/checkout/cancel", "mallory").set_json(json!({"reservation_id": reservation_id.clone()}));
    let (status, _) = send(&backend, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn unknown_orders_are_not_found() {
    let backend = test_backend().await;
    let (status, body) = send(&backend, authed_get("/v1/checkout/orders/ord_000000000000", "alice")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[actix_web::test]
async fn malformed_reservation_ids_are_rejected() {
    let backend = test_backend().await;
    let req = authed_post("/v1/checkout/confirm", "alice").set_json(json!({"reservation_id": ""}));
    let (status, _) = send(&backend, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = authed_post("/v1/checkout/cancel", "alice").set_json(json!({"reservation_id": "x".repeat(65)}));
    let (status, _) = send(&backend, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use super::helpers::{authed_post, send, test_backend};
use crate::routes::IDEMPOTENCY_HEADER;

#[actix_web::test]
async fn health_is_public() {
    let backend = test_backend().await;
    let (status, _) = send(&backend, TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn reserve_requires_a_bearer_token() {
    let backend = test_backend().await;
    let req = TestRequest::post()
        .uri("/v1/inventory/reserve")
        .set_json(json!({"sku": "FLASH-001", "quantity": 1}));
    let (status, body) = send(&backend, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    // A garbage token is also rejected
    let req = TestRequest::post()
        .uri("/v1/inventory/reserve")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .set_json(json!({"sku": "FLASH-001", "quantity": 1}));
    let (status, _) = send(&backend, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn initialize_and_status_flow() {
    let backend = test_backend().await;
    let (status, body) = send(&backend, authed_post("/v1/inventory/FLASH-001/initialize?quantity=10", "admin")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"sku": "FLASH-001", "available": 10}));

    // Status is public
    let (status, body) = send(&backend, TestRequest::get().uri("/v1/inventory/FLASH-001")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"sku": "FLASH-001", "available": 10}));

    // An uninitialized SKU reports as such
    let (status, body) = send(&backend, TestRequest::get().uri("/v1/inventory/GHOST-001")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"sku": "GHOST-001", "available": 0, "uninitialized": true}));
}

#[actix_web::test]
async fn initialize_rejects_bad_quantities() {
    let backend = test_backend().await;
    let (status, body) = send(&backend, authed_post("/v1/inventory/FLASH-001/initialize?quantity=-1", "admin")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let (status, _) = send(&backend, authed_post("/v1/inventory/FLASH-001/initialize?quantity=lots", "admin")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn reserve_success_then_conflict_on_the_last_unit() {
    let backend = test_backend().await;
    send(&backend, authed_post("/v1/inventory/FLASH-001/initialize?quantity=1", "admin")).await;

    let req = authed_post("/v1/inventory/reserve", "alice").set_json(json!({"sku": "FLASH-001", "quantity": 1}));
    let (status, body) = send(&backend, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["reservation_id"].as_str().unwrap().starts_with("rsv_"));
    assert_eq!(body["sku"], "FLASH-001");
    assert_eq!(body["quantity"], 1);
    assert_eq!(body["ttl_seconds"], 300);
    assert!(body["expires_at"].as_str().unwrap().ends_with('Z'));

    let req = authed_post("/v1/inventory/reserve", "bob").set_json(json!({"sku": "FLASH-001", "quantity": 1}));
    let (status, body) = send(&backend, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_inventory");
    assert_eq!(body["available"], 0);
}

#[actix_web::test]
async fn reserve_on_an_uninitialized_sku_conflicts() {
    let backend = test_backend().await;
    let req = authed_post("/v1/inventory/reserve", "alice").set_json(json!({"sku": "GHOST-001", "quantity": 1}));
    let (status, body) = send(&backend, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "not_initialized");
    assert!(body.get("available").is_none());
}

#[actix_web::test]
async fn reserve_validates_quantity_bounds() {
    let backend = test_backend().await;
    send(&backend, authed_post("/v1/inventory/FLASH-001/initialize?quantity=10", "admin")).await;
    for qty in [0, 6] {
        let req = authed_post("/v1/inventory/reserve", "alice").set_json(json!({"sku": "FLASH-001", "quantity": qty}));
        let (status, body) = send(&backend, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "quantity {qty} should be rejected");
        assert_eq!(body["error"], "invalid_request");
    }
}

#[actix_web::test]
async fn idempotency_header_replays_the_original_receipt() {
    let backend = test_backend().await;
    send(&backend, authed_post("/v1/inventory/FLASH-001/initialize?quantity=10", "admin")).await;

    let req = authed_post("/v1/inventory/reserve", "alice")
        .insert_header((IDEMPOTENCY_HEADER, "retry-key-1"))
        .set_json(json!({"sku": "FLASH-001", "quantity": 2}));
    let (status, first) = send(&backend, req).await;
    assert_eq!(status, StatusCode::CREATED);

    let req = authed_post("/v1/inventory/reserve", "alice")
        .insert_header((IDEMPOTENCY_HEADER, "retry-key-1"))
        .set_json(json!({"sku": "FLASH-001", "quantity": 2}));
    let (status, replay) = send(&backend, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(replay, first);

    // One decrement happened
    let (_, body) = send(&backend, TestRequest::get().uri("/v1/inventory/FLASH-001")).await;
    assert_eq!(body["available"], 8);
}

#[actix_web::test]
async fn oversized_idempotency_keys_are_rejected() {
    let backend = test_backend().await;
    send(&backend, authed_post("/v1/inventory/FLASH-001/initialize?quantity=10", "admin")).await;
    let req = authed_post("/v1/inventory/reserve", "alice")
        .insert_header((IDEMPOTENCY_HEADER, "k".repeat(129)))
        .set_json(json!({"sku": "FLASH-001", "quantity": 1}));
    let (status, _) = send(&backend, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn skus_are_normalised_at_the_edge() {
    let backend = test_backend().await;
    send(&backend, authed_post("/v1/inventory/flash-001/initialize?quantity=3", "admin")).await;
    let req = authed_post("/v1/inventory/reserve", "alice").set_json(json!({"sku": "flash-001", "quantity": 1}));
    let (status, body) = send(&backend, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["sku"], "FLASH-001");
}

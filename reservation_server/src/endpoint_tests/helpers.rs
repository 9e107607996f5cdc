use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use reservation_engine::{
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    CheckoutApi,
    MemoryInventoryStore,
    ReservationApi,
    ReservationPolicy,
    SqliteDatabase,
};
use serde_json::Value;
use srs_common::Secret;

use crate::{
    auth::{TokenIssuer, TokenVerifier},
    config::AuthConfig,
    rate_limiter::RateLimiter,
    routes,
};

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use this secret anywhere.
pub const TEST_JWT_SECRET: &str = "endpoint-test-signing-secret";

pub fn test_auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new(TEST_JWT_SECRET.to_string()), token_expiry_minutes: 15 }
}

pub fn issue_token(user_id: &str) -> String {
    TokenIssuer::new(&test_auth_config()).issue_token(user_id).expect("Failed to issue token")
}

/// The backends behind one test "deployment": the in-memory hot store and a throwaway SQLite database. Shared across
/// all requests of a test so state carries over between calls.
pub struct TestBackend {
    pub store: MemoryInventoryStore,
    pub db: SqliteDatabase,
}

pub async fn test_backend() -> TestBackend {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database");
    TestBackend { store: MemoryInventoryStore::new(), db }
}

/// Builds the full app for the backend, sends the request, and returns status plus parsed JSON body.
pub async fn send(backend: &TestBackend, req: TestRequest) -> (StatusCode, Value) {
    let reservations =
        ReservationApi::new(backend.store.clone(), backend.db.clone(), ReservationPolicy::default());
    let checkout = CheckoutApi::new(backend.store.clone(), backend.db.clone());
    let app = App::new()
        .app_data(web::Data::new(reservations))
        .app_data(web::Data::new(checkout))
        .app_data(web::Data::new(TokenVerifier::new(&test_auth_config())))
        .app_data(web::Data::new(RateLimiter::disabled()))
        .configure(routes::configure::<MemoryInventoryStore, SqliteDatabase>);
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    (status, json)
}

pub fn authed_get(uri: &str, user_id: &str) -> TestRequest {
    TestRequest::get().uri(uri).insert_header(("Authorization", format!("Bearer {}", issue_token(user_id))))
}

pub fn authed_post(uri: &str, user_id: &str) -> TestRequest {
    TestRequest::post().uri(uri).insert_header(("Authorization", format!("Bearer {}", issue_token(user_id))))
}

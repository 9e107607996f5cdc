use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use reservation_engine::{CheckoutApi, RedisInventoryStore, ReservationApi, SqliteDatabase};

use crate::{
    auth::TokenVerifier,
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    rate_limiter::RateLimiter,
    routes,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let store = RedisInventoryStore::connect(&config.redis_url)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    reservation_engine::sqlite::create_database_if_missing(&config.database_url)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    reservation_engine::sqlite::run_migrations(db.pool())
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;

    let sweeper_api = ReservationApi::new(store.clone(), db.clone(), config.reservation_policy());
    start_expiry_worker(
        sweeper_api,
        Duration::from_secs(config.sweeper_interval_seconds),
        config.sweeper_batch_size,
    );

    let srv = create_server_instance(config, store, db)?;
    Ok(srv.await?)
}

pub fn create_server_instance(
    config: ServerConfig,
    store: RedisInventoryStore,
    db: SqliteDatabase,
) -> Result<Server, ServerError> {
    let policy = config.reservation_policy();
    let rate_limit = config.rate_limit_per_minute;
    let auth = config.auth.clone();
    let srv = HttpServer::new(move || {
        let reservations = ReservationApi::new(store.clone(), db.clone(), policy);
        let checkout = CheckoutApi::new(store.clone(), db.clone());
        let verifier = TokenVerifier::new(&auth);
        let limiter = RateLimiter::new(store.connection(), rate_limit);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("reservation_server"))
            .app_data(web::Data::new(reservations))
            .app_data(web::Data::new(checkout))
            .app_data(web::Data::new(verifier))
            .app_data(web::Data::new(limiter))
            .configure(routes::configure::<RedisInventoryStore, SqliteDatabase>)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

use std::{env, fmt::Display, str::FromStr};

use log::*;
use reservation_engine::ReservationPolicy;
use srs_common::Secret;

const DEFAULT_SRS_HOST: &str = "127.0.0.1";
const DEFAULT_SRS_PORT: u16 = 8360;
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_DATABASE_URL: &str = "sqlite://data/reservations.db";
const DEFAULT_RESERVATION_TTL_SECONDS: i64 = 300;
const DEFAULT_MAX_QUANTITY_PER_RESERVATION: i64 = 5;
const DEFAULT_IDEMPOTENCY_TTL_SECONDS: u64 = 600;
const DEFAULT_SWEEPER_INTERVAL_SECONDS: u64 = 1;
const DEFAULT_SWEEPER_BATCH_SIZE: usize = 100;
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 10;
const DEFAULT_JWT_EXPIRY_MINUTES: i64 = 15;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub redis_url: String,
    pub database_url: String,
    pub reservation_ttl_seconds: i64,
    pub max_quantity_per_reservation: i64,
    pub idempotency_ttl_seconds: u64,
    pub sweeper_interval_seconds: u64,
    pub sweeper_batch_size: usize,
    pub rate_limit_per_minute: u32,
    pub auth: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SRS_HOST.to_string(),
            port: DEFAULT_SRS_PORT,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            reservation_ttl_seconds: DEFAULT_RESERVATION_TTL_SECONDS,
            max_quantity_per_reservation: DEFAULT_MAX_QUANTITY_PER_RESERVATION,
            idempotency_ttl_seconds: DEFAULT_IDEMPOTENCY_TTL_SECONDS,
            sweeper_interval_seconds: DEFAULT_SWEEPER_INTERVAL_SECONDS,
            sweeper_batch_size: DEFAULT_SWEEPER_BATCH_SIZE,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            auth: AuthConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let host = env::var("SRS_HOST").ok().unwrap_or_else(|| DEFAULT_SRS_HOST.into());
        let port = parse_env("SRS_PORT", DEFAULT_SRS_PORT);
        let redis_url = env::var("REDIS_URL").ok().unwrap_or_else(|| DEFAULT_REDIS_URL.into());
        let database_url = env::var("DATABASE_URL").ok().unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            error!("{e}");
            AuthConfig::default()
        });
        Self {
            host,
            port,
            redis_url,
            database_url,
            reservation_ttl_seconds: parse_env("RESERVATION_TTL_SECONDS", DEFAULT_RESERVATION_TTL_SECONDS),
            max_quantity_per_reservation: parse_env(
                "MAX_QUANTITY_PER_RESERVATION",
                DEFAULT_MAX_QUANTITY_PER_RESERVATION,
            ),
            idempotency_ttl_seconds: parse_env("IDEMPOTENCY_TTL_SECONDS", DEFAULT_IDEMPOTENCY_TTL_SECONDS),
            sweeper_interval_seconds: parse_env("SWEEPER_INTERVAL_SECONDS", DEFAULT_SWEEPER_INTERVAL_SECONDS),
            sweeper_batch_size: parse_env("SWEEPER_BATCH_SIZE", DEFAULT_SWEEPER_BATCH_SIZE),
            rate_limit_per_minute: parse_env("RATE_LIMIT_PER_MINUTE", DEFAULT_RATE_LIMIT_PER_MINUTE),
            auth,
        }
    }

    pub fn reservation_policy(&self) -> ReservationPolicy {
        ReservationPolicy {
            ttl_seconds: self.reservation_ttl_seconds,
            max_quantity: self.max_quantity_per_reservation,
            idempotency_ttl_seconds: self.idempotency_ttl_seconds,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Secret<String>,
    pub token_expiry_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { jwt_secret: Secret::default(), token_expiry_minutes: DEFAULT_JWT_EXPIRY_MINUTES }
    }
}

impl AuthConfig {
    /// Fails when the token-signing secret is not configured; the preflight check turns that into a refusal to
    /// start.
    pub fn try_from_env() -> Result<Self, String> {
        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "JWT_SECRET is not set. Bearer tokens cannot be verified without it.".to_string())?;
        Ok(Self {
            jwt_secret: Secret::new(jwt_secret),
            token_expiry_minutes: parse_env("JWT_EXPIRY_MINUTES", DEFAULT_JWT_EXPIRY_MINUTES),
        })
    }
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
    <T as FromStr>::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.parse::<T>().unwrap_or_else(|e| {
            error!("{s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}

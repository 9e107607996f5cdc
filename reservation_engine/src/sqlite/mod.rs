//! # SQLite durable store
//!
//! Low-level database interactions live in [`db`] as simple functions that accept a `&mut SqliteConnection`. Callers
//! obtain a connection from a pool, or open a transaction and pass `&mut *tx`, without any other changes.
use std::{env, path::Path, time::Duration};

use log::info;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Error as SqlxError, Sqlite, SqlitePool};

use crate::traits::DurableStoreError;

pub mod db;
mod sqlite_impl;

pub use sqlite_impl::SqliteDatabase;

const SQLITE_DB_URL: &str = "sqlite://data/reservations.db";

/// Deadline for acquiring a pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub fn db_url() -> String {
    let result = env::var("DATABASE_URL").unwrap_or_else(|_| {
        info!("DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(DEFAULT_ACQUIRE_TIMEOUT)
        .connect(url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./src/sqlite/migrations").run(pool).await
}

/// Creates the database file (and its parent directory) on first start.
pub async fn create_database_if_missing(url: &str) -> Result<(), DurableStoreError> {
    if Sqlite::database_exists(url).await? {
        return Ok(());
    }
    if let Some(path) = url.strip_prefix("sqlite://") {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DurableStoreError::DatabaseError(format!("Could not create {parent:?}: {e}")))?;
            }
        }
    }
    Sqlite::create_database(url).await?;
    info!("Created Sqlite database {url}");
    Ok(())
}

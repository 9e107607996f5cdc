//! Reservation Engine
//!
//! The concurrency-safe core of the flash-sale inventory service. Many concurrent clients race for a fixed pool of
//! units per SKU; the engine guarantees the pool is never oversold, that each successful reservation holds its units
//! for a bounded window, and that abandoned reservations return their units without operator intervention.
//!
//! The library is divided into two main sections:
//! 1. Store backends. Hot state (counters, live reservations, the expiry index, idempotency) lives behind the
//!    [`traits::InventoryStore`] contract, with a Redis implementation and an in-memory one. Durable state (orders,
//!    audit) lives behind [`traits::OrderManagement`] / [`traits::AuditLogging`], implemented over SQLite. You should
//!    never need to access a store directly; use the public APIs instead.
//! 2. Lifecycle APIs. [`ReservationApi`] exposes initialize/status/reserve/cancel plus the sweeper's
//!    `release_expired`; [`CheckoutApi`] converts a live reservation into a durable order.
pub mod catalog;
pub mod db_types;
mod memory;
mod redis_store;
pub mod rse_api;
pub mod sqlite;
pub mod test_utils;
pub mod traits;

pub use memory::MemoryInventoryStore;
pub use redis_store::RedisInventoryStore;
pub use rse_api::{CheckoutApi, ExpiryResult, ReservationApi, ReservationPolicy};
pub use sqlite::SqliteDatabase;

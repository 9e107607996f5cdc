//! Behaviour contracts for the two stores backing the reservation engine.
//!
//! The hot-state store ([`InventoryStore`]) holds everything that must mutate atomically: the per-SKU counters, the
//! live reservation records, the expiry index, and the idempotency mapping. The durable store
//! ([`OrderManagement`], [`AuditLogging`]) is the append-only sink for confirmed orders and audit events.
//!
//! No other module touches either store directly; all access goes through these traits.
mod inventory_store;
mod order_management;

pub use inventory_store::{
    IdempotencySlot,
    InventoryStore,
    InventoryStoreError,
    ReserveOutcome,
    TakeOutcome,
};
pub use order_management::{AuditLogging, DurableStoreError, OrderManagement};

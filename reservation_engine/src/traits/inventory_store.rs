use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{Reservation, ReservationId};

/// The contract every hot-state backend must honour.
///
/// Each method is a single atomic unit against the store. In particular:
/// * [`reserve`](InventoryStore::reserve) performs the availability check, the decrement, the record write and the
///   expiry-index insert as one serialised operation on the SKU's counter. No other operation on the same counter
///   interleaves between the check and the decrement.
/// * [`release`](InventoryStore::release) and [`consume`](InventoryStore::consume) are compare-and-delete primitives:
///   they observe the record, verify ownership, and remove it in one step, so that a confirm and an expiry racing on
///   the same reservation can never both win.
///
/// The Redis implementation achieves this with server-side Lua scripts; the in-memory implementation serialises every
/// operation through one lock. Any alternative backend must provide equivalent serialisability per key.
#[allow(async_fn_in_trait)]
pub trait InventoryStore: Clone {
    /// Sets the counter for `sku` to `quantity`, creating it if absent. Overwrites any previous value.
    async fn set_stock(&self, sku: &str, quantity: i64) -> Result<i64, InventoryStoreError>;

    /// Returns the current counter value, or `None` if the SKU was never initialized.
    async fn stock_level(&self, sku: &str) -> Result<Option<i64>, InventoryStoreError>;

    /// Atomically funds `reservation` from the SKU counter and records it.
    ///
    /// On success the counter has been decremented by `reservation.quantity`, the record is stored under `id`, and
    /// `id` has been added to the expiry index with the record's `expires_at` as score.
    async fn reserve(&self, id: &ReservationId, reservation: &Reservation) -> Result<ReserveOutcome, InventoryStoreError>;

    /// Atomically deletes the record and restores its units to the SKU counter (cancel/expire path).
    ///
    /// When `owner` is given, the deletion only happens if the record belongs to that user; a mismatch leaves the
    /// record untouched. An absent record removes any stale expiry-index entry and reports
    /// [`TakeOutcome::Gone`] without mutating the counter.
    async fn release(&self, id: &ReservationId, owner: Option<&str>) -> Result<TakeOutcome, InventoryStoreError>;

    /// Atomically deletes the record WITHOUT restoring stock (confirm path: the units are being sold).
    ///
    /// Ownership and absence behave as in [`release`](InventoryStore::release).
    async fn consume(&self, id: &ReservationId, owner: Option<&str>) -> Result<TakeOutcome, InventoryStoreError>;

    /// Reads a reservation record without consuming it.
    async fn peek(&self, id: &ReservationId) -> Result<Option<Reservation>, InventoryStoreError>;

    /// Returns up to `limit` reservation ids whose expiry score is at or before `cutoff`, oldest first.
    async fn due_reservations(&self, cutoff: DateTime<Utc>, limit: usize) -> Result<Vec<ReservationId>, InventoryStoreError>;

    /// Claims the idempotency slot for `(user_id, fingerprint)`, or reports what is already there.
    ///
    /// The claim is a conditional set-if-absent of a pending sentinel, so two concurrent requests with the same
    /// fingerprint cannot both proceed to a decrement.
    async fn idempotency_check_or_claim(
        &self,
        user_id: &str,
        fingerprint: &str,
        ttl_seconds: u64,
    ) -> Result<IdempotencySlot, InventoryStoreError>;

    /// Replaces the pending sentinel with the serialized receipt of the completed reserve.
    async fn idempotency_store(
        &self,
        user_id: &str,
        fingerprint: &str,
        receipt_json: &str,
        ttl_seconds: u64,
    ) -> Result<(), InventoryStoreError>;

    /// Drops the slot so that a retry after a failed reserve can proceed.
    async fn idempotency_clear(&self, user_id: &str, fingerprint: &str) -> Result<(), InventoryStoreError>;
}

/// Result of an atomic reserve attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// The units were reserved; `remaining` is the counter value after the decrement.
    Reserved { remaining: i64 },
    /// Not enough stock. The counter was not touched.
    Insufficient { available: i64 },
    /// The SKU counter does not exist.
    Uninitialized,
}

/// Result of an atomic release/consume attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TakeOutcome {
    /// The record was deleted; the body is returned for auditing and order creation.
    Taken(Reservation),
    /// The record belongs to a different user. Nothing was changed.
    Forbidden,
    /// The record no longer exists: it was already confirmed, cancelled or expired.
    Gone,
}

/// State of an idempotency slot after a claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdempotencySlot {
    /// The slot was free and is now claimed by this request.
    Claimed,
    /// Another request with the same fingerprint is still in flight.
    Pending,
    /// A previous request completed; the stored receipt should be returned verbatim.
    Receipt(String),
}

#[derive(Debug, Clone, Error)]
pub enum InventoryStoreError {
    #[error("Hot-state store unavailable: {0}")]
    Unavailable(String),
    #[error("Corrupt reservation record: {0}")]
    CorruptRecord(String),
}

impl From<redis::RedisError> for InventoryStoreError {
    fn from(e: redis::RedisError) -> Self {
        InventoryStoreError::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for InventoryStoreError {
    fn from(e: serde_json::Error) -> Self {
        InventoryStoreError::CorruptRecord(e.to_string())
    }
}

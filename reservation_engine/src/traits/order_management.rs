use thiserror::Error;

use crate::db_types::{AuditEvent, AuditEventType, NewAuditEvent, NewOrder, Order, OrderId, ReservationId};

/// Durable order persistence. Orders are written once, in a single transaction together with their line items, and
/// never updated.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Inserts the order and all of its line items atomically, returning the stored order.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, DurableStoreError>;

    /// Fetches an order with its line items.
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, DurableStoreError>;
}

/// Append-only audit sink. Every state transition of a reservation (including blocked oversells) lands here.
///
/// Audit writes happen after the hot-state mutation has committed, so callers log failures and carry on; a lost audit
/// row never rolls back a reservation.
#[allow(async_fn_in_trait)]
pub trait AuditLogging: Clone {
    /// Appends one audit event, returning its row id.
    async fn record_event(&self, event: NewAuditEvent) -> Result<i64, DurableStoreError>;

    /// Returns the audit trail for a reservation, oldest first.
    async fn events_for_reservation(&self, id: &ReservationId) -> Result<Vec<AuditEvent>, DurableStoreError>;

    /// Returns all events of one kind, oldest first.
    async fn events_of_type(&self, event_type: AuditEventType) -> Result<Vec<AuditEvent>, DurableStoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum DurableStoreError {
    #[error("Durable store error: {0}")]
    DatabaseError(String),
    #[error("Could not encode row data: {0}")]
    EncodingError(String),
}

impl From<sqlx::Error> for DurableStoreError {
    fn from(e: sqlx::Error) -> Self {
        DurableStoreError::DatabaseError(e.to_string())
    }
}

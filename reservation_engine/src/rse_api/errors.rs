use thiserror::Error;

use crate::{
    db_types::{OrderId, ReservationId},
    traits::{DurableStoreError, InventoryStoreError},
};

#[derive(Debug, Clone, Error)]
pub enum ReservationApiError {
    #[error("Insufficient inventory. Available: {available}")]
    Insufficient { available: i64 },
    #[error("Inventory for {0} has not been initialized")]
    NotInitialized(String),
    #[error("Reservation {0} not found")]
    NotFound(ReservationId),
    #[error("This reservation belongs to another user")]
    Forbidden,
    #[error("{0}")]
    InvalidInput(String),
    #[error("A request with this idempotency key is still in flight")]
    IdempotencyInFlight,
    #[error("{0}")]
    StoreError(#[from] InventoryStoreError),
}

#[derive(Debug, Clone, Error)]
pub enum CheckoutApiError {
    #[error("Reservation {0} not found")]
    ReservationNotFound(ReservationId),
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),
    #[error("This reservation belongs to another user")]
    Forbidden,
    #[error("{0}")]
    StoreError(#[from] InventoryStoreError),
    #[error("Could not persist the order: {0}")]
    OrderPersistence(#[from] DurableStoreError),
}

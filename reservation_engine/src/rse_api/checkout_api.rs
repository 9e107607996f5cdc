use chrono::Utc;
use log::*;
use serde_json::json;

use crate::{
    catalog,
    db_types::{AuditEventType, NewAuditEvent, NewOrder, Order, OrderId, OrderItem, ReservationId},
    rse_api::errors::CheckoutApiError,
    traits::{AuditLogging, InventoryStore, OrderManagement, TakeOutcome},
};

/// `CheckoutApi` transforms a live reservation into a durable order.
///
/// The reservation record is consumed with an atomic compare-and-delete, so a confirm racing the expiry sweeper (or
/// a cancel) can only go one way: whichever deletes the record first wins, and the loser observes its absence.
/// Crucially the SKU counter is NOT incremented on confirm; the units are being sold, not released.
#[derive(Debug, Clone)]
pub struct CheckoutApi<S, D> {
    store: S,
    db: D,
}

impl<S, D> CheckoutApi<S, D> {
    pub fn new(store: S, db: D) -> Self {
        Self { store, db }
    }

    pub fn db(&self) -> &D {
        &self.db
    }
}

impl<S, D> CheckoutApi<S, D>
where
    S: InventoryStore,
    D: OrderManagement + AuditLogging,
{
    /// Consumes the reservation and writes the order with its line items in a single durable transaction. Prices come
    /// from the static catalogue.
    ///
    /// A reservation that is past its TTL but not yet swept still confirms successfully: from the server's
    /// perspective the client honoured the deadline in time.
    pub async fn confirm(&self, user_id: &str, reservation_id: &ReservationId) -> Result<Order, CheckoutApiError> {
        let reservation = match self.store.consume(reservation_id, Some(user_id)).await? {
            TakeOutcome::Taken(reservation) => reservation,
            TakeOutcome::Forbidden => return Err(CheckoutApiError::Forbidden),
            TakeOutcome::Gone => return Err(CheckoutApiError::ReservationNotFound(reservation_id.clone())),
        };

        let price = catalog::price_for(&reservation.sku);
        let new_order = NewOrder {
            order_id: OrderId::random(),
            user_id: user_id.to_string(),
            total_amount: price * reservation.quantity,
            created_at: Utc::now(),
            items: vec![OrderItem { sku: reservation.sku.clone(), quantity: reservation.quantity, price_per_unit: price }],
        };
        let order_id = new_order.order_id.clone();
        let order = self.db.insert_order(new_order).await.map_err(|e| {
            // The hot-state consume has already committed; the units are gone from the pool either way.
            error!("🛒️ Reservation {reservation_id} was consumed but order {order_id} could not be written: {e}");
            e
        })?;

        info!(
            "🛒️ Confirmed reservation {reservation_id} for user {user_id}: order {} for {} units of {}",
            order.order_id, reservation.quantity, reservation.sku
        );
        let audit = NewAuditEvent {
            event_type: AuditEventType::Confirm,
            user_id: Some(user_id.to_string()),
            sku: Some(reservation.sku.clone()),
            reservation_id: Some(reservation_id.clone()),
            details: json!({
                "order_id": order.order_id.clone(),
                "quantity": reservation.quantity,
                "total_amount": order.total_amount,
            }),
        };
        if let Err(e) = self.db.record_event(audit).await {
            error!("🗃️ Could not write confirm audit event for order {}: {e}", order.order_id);
        }
        Ok(order)
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, CheckoutApiError> {
        self.db
            .fetch_order(order_id)
            .await?
            .ok_or_else(|| CheckoutApiError::OrderNotFound(order_id.clone()))
    }
}

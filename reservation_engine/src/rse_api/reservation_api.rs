use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use log::*;
use serde_json::json;

use crate::{
    db_types::{
        normalize_sku,
        AuditEventType,
        InventoryStatus,
        NewAuditEvent,
        Reservation,
        ReservationId,
        ReservationReceipt,
    },
    rse_api::errors::ReservationApiError,
    traits::{AuditLogging, IdempotencySlot, InventoryStore, ReserveOutcome, TakeOutcome},
};

/// How long, and how often, a replayed request waits for an in-flight sibling with the same fingerprint to land its
/// receipt before giving up.
const IDEMPOTENCY_POLL_ATTEMPTS: usize = 20;
const IDEMPOTENCY_POLL_INTERVAL: StdDuration = StdDuration::from_millis(50);

/// Tunable limits of the reservation lifecycle. Defaults match the documented configuration defaults.
#[derive(Debug, Clone, Copy)]
pub struct ReservationPolicy {
    /// How long a hold lasts before the sweeper reclaims it.
    pub ttl_seconds: i64,
    /// Upper bound on the quantity of a single reservation.
    pub max_quantity: i64,
    /// Lifetime of the idempotency mapping. Should be at least as long as `ttl_seconds` so that replays during the
    /// hold window are recognised.
    pub idempotency_ttl_seconds: u64,
}

impl Default for ReservationPolicy {
    fn default() -> Self {
        Self { ttl_seconds: 300, max_quantity: 5, idempotency_ttl_seconds: 600 }
    }
}

/// Outcome of one sweeper pass over the expiry index.
#[derive(Debug, Clone, Default)]
pub struct ExpiryResult {
    pub released: Vec<ReservationId>,
    pub restored_units: i64,
    /// Due index entries whose record was already consumed by a confirm or cancel. A benign race; nothing was
    /// mutated for these.
    pub already_finalised: usize,
}

impl ExpiryResult {
    pub fn released_count(&self) -> usize {
        self.released.len()
    }

    pub fn total_count(&self) -> usize {
        self.released.len() + self.already_finalised
    }
}

/// `ReservationApi` owns the reservation lifecycle: the atomic check-and-decrement that creates a hold, the
/// idempotent acceptance of retried creates, cancellation, and the reclamation of expired holds on behalf of the
/// sweeper.
///
/// All hot-state access goes through the [`InventoryStore`] contract; the API adds input validation, identifier
/// generation, idempotency and audit on top. It holds no mutable state of its own, so one instance can be shared (or
/// cheaply cloned) across any number of concurrent requests.
#[derive(Debug, Clone)]
pub struct ReservationApi<S, D> {
    store: S,
    audit: D,
    policy: ReservationPolicy,
}

impl<S, D> ReservationApi<S, D> {
    pub fn new(store: S, audit: D, policy: ReservationPolicy) -> Self {
        Self { store, audit, policy }
    }

    pub fn policy(&self) -> &ReservationPolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S, D> ReservationApi<S, D>
where
    S: InventoryStore,
    D: AuditLogging,
{
    /// Sets the counter for `sku` to `quantity`, overwriting any previous value, and returns the new level. Intended
    /// to be gated behind an administrative path.
    pub async fn initialize(&self, sku: &str, quantity: i64) -> Result<i64, ReservationApiError> {
        let sku = normalize_sku(sku).map_err(ReservationApiError::InvalidInput)?;
        if quantity < 0 {
            return Err(ReservationApiError::InvalidInput("Quantity cannot be negative".to_string()));
        }
        let level = self.store.set_stock(&sku, quantity).await?;
        info!("📦️ Inventory for {sku} set to {level} units");
        Ok(level)
    }

    pub async fn status(&self, sku: &str) -> Result<InventoryStatus, ReservationApiError> {
        let sku = normalize_sku(sku).map_err(ReservationApiError::InvalidInput)?;
        let status = match self.store.stock_level(&sku).await? {
            Some(available) => InventoryStatus { sku, available, uninitialized: false },
            None => InventoryStatus { sku, available: 0, uninitialized: true },
        };
        Ok(status)
    }

    /// The hot path. Atomically checks availability, funds the hold, records it and schedules its expiry, as one
    /// serialised operation against the hot-state store.
    ///
    /// With a fingerprint, replays of an earlier successful call return the original receipt verbatim, without a
    /// second decrement. Failed calls are never cached, so a client can fix its input and retry under the same
    /// fingerprint.
    pub async fn reserve(
        &self,
        user_id: &str,
        sku: &str,
        quantity: i64,
        fingerprint: Option<&str>,
    ) -> Result<ReservationReceipt, ReservationApiError> {
        let sku = normalize_sku(sku).map_err(ReservationApiError::InvalidInput)?;
        if quantity < 1 || quantity > self.policy.max_quantity {
            return Err(ReservationApiError::InvalidInput(format!(
                "Quantity must be between 1 and {}",
                self.policy.max_quantity
            )));
        }
        let fingerprint = fingerprint.filter(|f| !f.is_empty());
        if let Some(fp) = fingerprint {
            if let Some(receipt) = self.claim_idempotency_slot(user_id, fp).await? {
                info!("🔁️ Idempotent replay for user {user_id}: returning reservation {}", receipt.reservation_id);
                return Ok(receipt);
            }
        }

        let id = ReservationId::random();
        let reservation =
            Reservation::new(user_id.to_string(), sku.clone(), quantity, Duration::seconds(self.policy.ttl_seconds));
        match self.store.reserve(&id, &reservation).await {
            Ok(ReserveOutcome::Reserved { remaining }) => {
                info!(
                    "📦️ Reserved {quantity} units of {sku} for user {user_id}. Reservation: {id}, {remaining} \
                     units remain"
                );
                let receipt = ReservationReceipt {
                    reservation_id: id.clone(),
                    sku: sku.clone(),
                    quantity,
                    expires_at: reservation.expires_at,
                    ttl_seconds: self.policy.ttl_seconds,
                };
                self.audit_event(NewAuditEvent {
                    event_type: AuditEventType::Reserve,
                    user_id: Some(user_id.to_string()),
                    sku: Some(sku),
                    reservation_id: Some(id),
                    details: json!({ "quantity": quantity, "expires_at": reservation.expires_at }),
                })
                .await;
                if let Some(fp) = fingerprint {
                    self.cache_receipt(user_id, fp, &receipt).await;
                }
                Ok(receipt)
            },
            Ok(ReserveOutcome::Insufficient { available }) => {
                warn!(
                    "📦️ Insufficient inventory for {sku}: user {user_id} requested {quantity}, {available} available"
                );
                self.audit_event(NewAuditEvent {
                    event_type: AuditEventType::OversellBlocked,
                    user_id: Some(user_id.to_string()),
                    sku: Some(sku),
                    reservation_id: None,
                    details: json!({ "requested": quantity, "available": available }),
                })
                .await;
                self.clear_slot(user_id, fingerprint).await;
                Err(ReservationApiError::Insufficient { available })
            },
            Ok(ReserveOutcome::Uninitialized) => {
                self.clear_slot(user_id, fingerprint).await;
                Err(ReservationApiError::NotInitialized(sku))
            },
            Err(e) => {
                self.clear_slot(user_id, fingerprint).await;
                Err(e.into())
            },
        }
    }

    /// Releases a live reservation on behalf of its owner, restoring its units to the pool.
    pub async fn cancel(&self, user_id: &str, id: &ReservationId) -> Result<(), ReservationApiError> {
        match self.store.release(id, Some(user_id)).await? {
            TakeOutcome::Taken(reservation) => {
                info!(
                    "📦️ Cancelled reservation {id}: restored {} units of {} for user {user_id}",
                    reservation.quantity, reservation.sku
                );
                self.audit_event(NewAuditEvent {
                    event_type: AuditEventType::Cancel,
                    user_id: Some(user_id.to_string()),
                    sku: Some(reservation.sku),
                    reservation_id: Some(id.clone()),
                    details: json!({ "quantity": reservation.quantity }),
                })
                .await;
                Ok(())
            },
            TakeOutcome::Forbidden => Err(ReservationApiError::Forbidden),
            TakeOutcome::Gone => Err(ReservationApiError::NotFound(id.clone())),
        }
    }

    /// One sweeper pass: finalises every reservation whose expiry score is at or before `cutoff`, up to `batch`
    /// entries, restoring their units. Index entries whose record was already consumed by a racing confirm or cancel
    /// are skipped silently.
    ///
    /// Safe to call from a restarted sweeper: the release is atomic and an absent record is a no-op, so stock can
    /// never be restored twice.
    pub async fn release_expired(&self, cutoff: DateTime<Utc>, batch: usize) -> Result<ExpiryResult, ReservationApiError> {
        let due = self.store.due_reservations(cutoff, batch).await?;
        let mut result = ExpiryResult::default();
        for id in due {
            match self.store.release(&id, None).await? {
                TakeOutcome::Taken(reservation) => {
                    info!(
                        "🕰️ Released expired reservation {id}: restored {} units of {} for user {}",
                        reservation.quantity, reservation.sku, reservation.user_id
                    );
                    self.audit_event(NewAuditEvent {
                        event_type: AuditEventType::Expire,
                        user_id: Some(reservation.user_id.clone()),
                        sku: Some(reservation.sku.clone()),
                        reservation_id: Some(id.clone()),
                        details: json!({
                            "quantity": reservation.quantity,
                            "created_at": reservation.created_at,
                            "expired_at": reservation.expires_at,
                        }),
                    })
                    .await;
                    result.restored_units += reservation.quantity;
                    result.released.push(id);
                },
                // Confirm or cancel got there first.
                TakeOutcome::Gone | TakeOutcome::Forbidden => result.already_finalised += 1,
            }
        }
        Ok(result)
    }

    /// Claims the idempotency slot, or returns the receipt of the original call if one exists.
    async fn claim_idempotency_slot(
        &self,
        user_id: &str,
        fingerprint: &str,
    ) -> Result<Option<ReservationReceipt>, ReservationApiError> {
        for _ in 0..IDEMPOTENCY_POLL_ATTEMPTS {
            let slot = self
                .store
                .idempotency_check_or_claim(user_id, fingerprint, self.policy.idempotency_ttl_seconds)
                .await?;
            match slot {
                IdempotencySlot::Claimed => return Ok(None),
                IdempotencySlot::Receipt(json) => {
                    let receipt = serde_json::from_str(&json)
                        .map_err(|e| ReservationApiError::StoreError(e.into()))?;
                    return Ok(Some(receipt));
                },
                IdempotencySlot::Pending => tokio::time::sleep(IDEMPOTENCY_POLL_INTERVAL).await,
            }
        }
        Err(ReservationApiError::IdempotencyInFlight)
    }

    async fn cache_receipt(&self, user_id: &str, fingerprint: &str, receipt: &ReservationReceipt) {
        match serde_json::to_string(receipt) {
            Ok(json) => {
                if let Err(e) = self
                    .store
                    .idempotency_store(user_id, fingerprint, &json, self.policy.idempotency_ttl_seconds)
                    .await
                {
                    warn!("🔁️ Could not cache idempotent receipt for user {user_id}: {e}");
                }
            },
            Err(e) => warn!("🔁️ Could not encode idempotent receipt for user {user_id}: {e}"),
        }
    }

    async fn clear_slot(&self, user_id: &str, fingerprint: Option<&str>) {
        if let Some(fp) = fingerprint {
            if let Err(e) = self.store.idempotency_clear(user_id, fp).await {
                warn!("🔁️ Could not clear idempotency slot for user {user_id}: {e}");
            }
        }
    }

    /// Audit writes happen after the hot-state mutation has committed; a failure here is logged and swallowed so the
    /// primary operation's outcome stands.
    async fn audit_event(&self, event: NewAuditEvent) {
        let event_type = event.event_type;
        if let Err(e) = self.audit.record_event(event).await {
            error!("🗃️ Could not write {event_type} audit event: {e}");
        }
    }
}

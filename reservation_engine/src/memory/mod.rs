//! Process-local implementation of the hot-state store.
//!
//! Every operation takes one lock for its whole duration, which gives the same per-operation serialisability as
//! Redis's single-threaded script engine. Used by the engine's integration tests and the server's endpoint tests;
//! also usable as a single-process deployment mode.
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{
    db_types::{Reservation, ReservationId},
    traits::{IdempotencySlot, InventoryStore, InventoryStoreError, ReserveOutcome, TakeOutcome},
};

const PENDING_SENTINEL: &str = "__pending__";

#[derive(Default)]
struct Inner {
    counters: HashMap<String, i64>,
    records: HashMap<String, Reservation>,
    /// (expiry epoch seconds, reservation id), ordered oldest first.
    expiry_index: BTreeSet<(i64, String)>,
    scores: HashMap<String, i64>,
    idempotency: HashMap<String, (String, DateTime<Utc>)>,
}

impl Inner {
    fn drop_index_entry(&mut self, id: &str) {
        if let Some(score) = self.scores.remove(id) {
            self.expiry_index.remove(&(score, id.to_string()));
        }
    }

    fn take(&mut self, id: &ReservationId, owner: Option<&str>, restore: bool) -> TakeOutcome {
        let Some(record) = self.records.get(id.as_str()) else {
            self.drop_index_entry(id.as_str());
            return TakeOutcome::Gone;
        };
        if let Some(owner) = owner {
            if record.user_id != owner {
                return TakeOutcome::Forbidden;
            }
        }
        let Some(record) = self.records.remove(id.as_str()) else {
            return TakeOutcome::Gone;
        };
        if restore {
            *self.counters.entry(record.sku.clone()).or_insert(0) += record.quantity;
        }
        self.drop_index_entry(id.as_str());
        TakeOutcome::Taken(record)
    }
}

#[derive(Clone, Default)]
pub struct MemoryInventoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryInventoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MemoryInventoryStore")
    }
}

impl InventoryStore for MemoryInventoryStore {
    async fn set_stock(&self, sku: &str, quantity: i64) -> Result<i64, InventoryStoreError> {
        let mut inner = self.inner.lock();
        inner.counters.insert(sku.to_string(), quantity);
        Ok(quantity)
    }

    async fn stock_level(&self, sku: &str) -> Result<Option<i64>, InventoryStoreError> {
        let inner = self.inner.lock();
        Ok(inner.counters.get(sku).copied())
    }

    async fn reserve(&self, id: &ReservationId, reservation: &Reservation) -> Result<ReserveOutcome, InventoryStoreError> {
        let mut inner = self.inner.lock();
        let Some(&available) = inner.counters.get(&reservation.sku) else {
            return Ok(ReserveOutcome::Uninitialized);
        };
        if available < reservation.quantity {
            return Ok(ReserveOutcome::Insufficient { available });
        }
        let remaining = available - reservation.quantity;
        inner.counters.insert(reservation.sku.clone(), remaining);
        inner.records.insert(id.as_str().to_string(), reservation.clone());
        let score = reservation.expires_at.timestamp();
        inner.expiry_index.insert((score, id.as_str().to_string()));
        inner.scores.insert(id.as_str().to_string(), score);
        Ok(ReserveOutcome::Reserved { remaining })
    }

    async fn release(&self, id: &ReservationId, owner: Option<&str>) -> Result<TakeOutcome, InventoryStoreError> {
        let mut inner = self.inner.lock();
        Ok(inner.take(id, owner, true))
    }

    async fn consume(&self, id: &ReservationId, owner: Option<&str>) -> Result<TakeOutcome, InventoryStoreError> {
        let mut inner = self.inner.lock();
        Ok(inner.take(id, owner, false))
    }

    async fn peek(&self, id: &ReservationId) -> Result<Option<Reservation>, InventoryStoreError> {
        let inner = self.inner.lock();
        Ok(inner.records.get(id.as_str()).cloned())
    }

    async fn due_reservations(&self, cutoff: DateTime<Utc>, limit: usize) -> Result<Vec<ReservationId>, InventoryStoreError> {
        let inner = self.inner.lock();
        let due = inner
            .expiry_index
            .iter()
            .take_while(|(score, _)| *score <= cutoff.timestamp())
            .take(limit)
            .map(|(_, id)| ReservationId::from(id.clone()))
            .collect();
        Ok(due)
    }

    async fn idempotency_check_or_claim(
        &self,
        user_id: &str,
        fingerprint: &str,
        ttl_seconds: u64,
    ) -> Result<IdempotencySlot, InventoryStoreError> {
        let mut inner = self.inner.lock();
        let key = format!("{user_id}:{fingerprint}");
        let now = Utc::now();
        if let Some((value, expires)) = inner.idempotency.get(&key) {
            if *expires > now {
                if value == PENDING_SENTINEL {
                    return Ok(IdempotencySlot::Pending);
                }
                return Ok(IdempotencySlot::Receipt(value.clone()));
            }
        }
        let expires = now + chrono::Duration::seconds(ttl_seconds as i64);
        inner.idempotency.insert(key, (PENDING_SENTINEL.to_string(), expires));
        Ok(IdempotencySlot::Claimed)
    }

    async fn idempotency_store(
        &self,
        user_id: &str,
        fingerprint: &str,
        receipt_json: &str,
        ttl_seconds: u64,
    ) -> Result<(), InventoryStoreError> {
        let mut inner = self.inner.lock();
        let expires = Utc::now() + chrono::Duration::seconds(ttl_seconds as i64);
        inner.idempotency.insert(format!("{user_id}:{fingerprint}"), (receipt_json.to_string(), expires));
        Ok(())
    }

    async fn idempotency_clear(&self, user_id: &str, fingerprint: &str) -> Result<(), InventoryStoreError> {
        let mut inner = self.inner.lock();
        inner.idempotency.remove(&format!("{user_id}:{fingerprint}"));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::db_types::Reservation;

    fn reservation(user: &str, sku: &str, quantity: i64, ttl_seconds: i64) -> Reservation {
        Reservation::new(user.to_string(), sku.to_string(), quantity, Duration::seconds(ttl_seconds))
    }

    #[tokio::test]
    async fn reserve_decrements_and_indexes() {
        let store = MemoryInventoryStore::new();
        store.set_stock("WIDGET-1", 5).await.unwrap();
        let id = ReservationId::random();
        let outcome = store.reserve(&id, &reservation("alice", "WIDGET-1", 2, -1)).await.unwrap();
        assert_eq!(outcome, ReserveOutcome::Reserved { remaining: 3 });
        assert_eq!(store.stock_level("WIDGET-1").await.unwrap(), Some(3));
        let due = store.due_reservations(Utc::now(), 10).await.unwrap();
        assert_eq!(due, vec![id]);
    }

    #[tokio::test]
    async fn reserve_rejects_shortfall_and_unknown_sku() {
        let store = MemoryInventoryStore::new();
        store.set_stock("WIDGET-1", 1).await.unwrap();
        let id = ReservationId::random();
        let outcome = store.reserve(&id, &reservation("alice", "WIDGET-1", 2, 300)).await.unwrap();
        assert_eq!(outcome, ReserveOutcome::Insufficient { available: 1 });
        let outcome = store.reserve(&id, &reservation("alice", "NOPE", 1, 300)).await.unwrap();
        assert_eq!(outcome, ReserveOutcome::Uninitialized);
        // Failed attempts leave the counter untouched
        assert_eq!(store.stock_level("WIDGET-1").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn release_restores_but_consume_does_not() {
        let store = MemoryInventoryStore::new();
        store.set_stock("WIDGET-1", 5).await.unwrap();
        let a = ReservationId::random();
        let b = ReservationId::random();
        store.reserve(&a, &reservation("alice", "WIDGET-1", 2, 300)).await.unwrap();
        store.reserve(&b, &reservation("bob", "WIDGET-1", 1, 300)).await.unwrap();
        assert_eq!(store.stock_level("WIDGET-1").await.unwrap(), Some(2));

        assert!(matches!(store.release(&a, Some("alice")).await.unwrap(), TakeOutcome::Taken(_)));
        assert_eq!(store.stock_level("WIDGET-1").await.unwrap(), Some(4));

        assert!(matches!(store.consume(&b, Some("bob")).await.unwrap(), TakeOutcome::Taken(_)));
        assert_eq!(store.stock_level("WIDGET-1").await.unwrap(), Some(4));

        // Second take of either record reports it gone
        assert_eq!(store.release(&a, None).await.unwrap(), TakeOutcome::Gone);
        assert_eq!(store.consume(&b, None).await.unwrap(), TakeOutcome::Gone);
    }

    #[tokio::test]
    async fn ownership_is_checked_under_the_same_lock() {
        let store = MemoryInventoryStore::new();
        store.set_stock("WIDGET-1", 5).await.unwrap();
        let id = ReservationId::random();
        store.reserve(&id, &reservation("alice", "WIDGET-1", 2, 300)).await.unwrap();
        assert_eq!(store.release(&id, Some("mallory")).await.unwrap(), TakeOutcome::Forbidden);
        assert_eq!(store.consume(&id, Some("mallory")).await.unwrap(), TakeOutcome::Forbidden);
        // The reservation is still live and still funded
        assert!(store.peek(&id).await.unwrap().is_some());
        assert_eq!(store.stock_level("WIDGET-1").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn idempotency_slot_lifecycle() {
        let store = MemoryInventoryStore::new();
        assert_eq!(store.idempotency_check_or_claim("alice", "f1", 600).await.unwrap(), IdempotencySlot::Claimed);
        assert_eq!(store.idempotency_check_or_claim("alice", "f1", 600).await.unwrap(), IdempotencySlot::Pending);
        store.idempotency_store("alice", "f1", "{}", 600).await.unwrap();
        assert_eq!(
            store.idempotency_check_or_claim("alice", "f1", 600).await.unwrap(),
            IdempotencySlot::Receipt("{}".to_string())
        );
        store.idempotency_clear("alice", "f1").await.unwrap();
        assert_eq!(store.idempotency_check_or_claim("alice", "f1", 600).await.unwrap(), IdempotencySlot::Claimed);
    }
}

//! Redis implementation of the hot-state store.
//!
//! Counters, reservation records, the expiry index and the idempotency mapping all live in a single Redis keyspace:
//!
//! * counter at `inventory:{sku}`
//! * reservation record at `reservation:{id}` (JSON)
//! * expiry index in the sorted set `expiring_reservations`, scored by expiry epoch seconds
//! * idempotency mapping at `idempotency:{user_id}:{fingerprint}`
//!
//! Every multi-step mutation runs as a server-side Lua script (see [`scripts`]), which Redis serialises, so the
//! availability check and the decrement can never be split by a concurrent request.
mod scripts;

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::warn;
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands,
    Client,
    Script,
};

use crate::{
    db_types::{Reservation, ReservationId},
    traits::{IdempotencySlot, InventoryStore, InventoryStoreError, ReserveOutcome, TakeOutcome},
};

const COUNTER_PREFIX: &str = "inventory:";
const RECORD_PREFIX: &str = "reservation:";
const IDEMPOTENCY_PREFIX: &str = "idempotency:";
const EXPIRY_INDEX_KEY: &str = "expiring_reservations";
const PENDING_SENTINEL: &str = "__pending__";

/// Deadline for a single Redis round-trip. A reserve that times out is safe to retry with the same fingerprint.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

struct LuaScripts {
    reserve: Script,
    release: Script,
    consume: Script,
}

#[derive(Clone)]
pub struct RedisInventoryStore {
    conn: ConnectionManager,
    scripts: Arc<LuaScripts>,
}

impl std::fmt::Debug for RedisInventoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RedisInventoryStore")
    }
}

impl RedisInventoryStore {
    /// Connects with the default 2 s response deadline.
    pub async fn connect(redis_url: &str) -> Result<Self, InventoryStoreError> {
        Self::connect_with_timeout(redis_url, DEFAULT_RESPONSE_TIMEOUT).await
    }

    pub async fn connect_with_timeout(redis_url: &str, timeout: Duration) -> Result<Self, InventoryStoreError> {
        let client = Client::open(redis_url)?;
        let config = ConnectionManagerConfig::new().set_connection_timeout(timeout).set_response_timeout(timeout);
        let conn = ConnectionManager::new_with_config(client, config).await?;
        let scripts = Arc::new(LuaScripts {
            reserve: Script::new(scripts::RESERVE_SCRIPT),
            release: Script::new(scripts::RELEASE_SCRIPT),
            consume: Script::new(scripts::CONSUME_SCRIPT),
        });
        Ok(Self { conn, scripts })
    }

    /// A handle on the underlying connection, for collaborators (e.g. the admission gate) that share the keyspace.
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    fn counter_key(sku: &str) -> String {
        format!("{COUNTER_PREFIX}{sku}")
    }

    fn record_key(id: &ReservationId) -> String {
        format!("{RECORD_PREFIX}{id}")
    }

    fn idempotency_key(user_id: &str, fingerprint: &str) -> String {
        format!("{IDEMPOTENCY_PREFIX}{user_id}:{fingerprint}")
    }

    fn parse_record(payload: &str) -> Result<Reservation, InventoryStoreError> {
        let reservation = serde_json::from_str(payload)?;
        Ok(reservation)
    }

    fn take_outcome(code: i64, payload: String) -> Result<TakeOutcome, InventoryStoreError> {
        match code {
            1 => Ok(TakeOutcome::Taken(Self::parse_record(&payload)?)),
            -1 => Ok(TakeOutcome::Forbidden),
            _ => Ok(TakeOutcome::Gone),
        }
    }
}

impl InventoryStore for RedisInventoryStore {
    async fn set_stock(&self, sku: &str, quantity: i64) -> Result<i64, InventoryStoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(Self::counter_key(sku), quantity).await?;
        Ok(quantity)
    }

    async fn stock_level(&self, sku: &str) -> Result<Option<i64>, InventoryStoreError> {
        let mut conn = self.conn.clone();
        let level: Option<i64> = conn.get(Self::counter_key(sku)).await?;
        Ok(level)
    }

    async fn reserve(&self, id: &ReservationId, reservation: &Reservation) -> Result<ReserveOutcome, InventoryStoreError> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(reservation)?;
        let (code, value): (i64, i64) = self
            .scripts
            .reserve
            .key(Self::counter_key(&reservation.sku))
            .key(Self::record_key(id))
            .key(EXPIRY_INDEX_KEY)
            .arg(reservation.quantity)
            .arg(id.as_str())
            .arg(payload)
            .arg(reservation.expires_at.timestamp())
            .invoke_async(&mut conn)
            .await?;
        let outcome = match code {
            1 => ReserveOutcome::Reserved { remaining: value },
            0 => ReserveOutcome::Insufficient { available: value },
            _ => ReserveOutcome::Uninitialized,
        };
        Ok(outcome)
    }

    async fn release(&self, id: &ReservationId, owner: Option<&str>) -> Result<TakeOutcome, InventoryStoreError> {
        let mut conn = self.conn.clone();
        let (code, payload): (i64, String) = self
            .scripts
            .release
            .key(Self::record_key(id))
            .key(EXPIRY_INDEX_KEY)
            .arg(COUNTER_PREFIX)
            .arg(id.as_str())
            .arg(owner.unwrap_or_default())
            .invoke_async(&mut conn)
            .await?;
        Self::take_outcome(code, payload)
    }

    async fn consume(&self, id: &ReservationId, owner: Option<&str>) -> Result<TakeOutcome, InventoryStoreError> {
        let mut conn = self.conn.clone();
        let (code, payload): (i64, String) = self
            .scripts
            .consume
            .key(Self::record_key(id))
            .key(EXPIRY_INDEX_KEY)
            .arg(id.as_str())
            .arg(owner.unwrap_or_default())
            .invoke_async(&mut conn)
            .await?;
        Self::take_outcome(code, payload)
    }

    async fn peek(&self, id: &ReservationId) -> Result<Option<Reservation>, InventoryStoreError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(Self::record_key(id)).await?;
        match payload {
            Some(json) => Ok(Some(Self::parse_record(&json)?)),
            None => Ok(None),
        }
    }

    async fn due_reservations(&self, cutoff: DateTime<Utc>, limit: usize) -> Result<Vec<ReservationId>, InventoryStoreError> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .zrangebyscore_limit(EXPIRY_INDEX_KEY, 0i64, cutoff.timestamp(), 0isize, limit as isize)
            .await?;
        Ok(ids.into_iter().map(ReservationId::from).collect())
    }

    async fn idempotency_check_or_claim(
        &self,
        user_id: &str,
        fingerprint: &str,
        ttl_seconds: u64,
    ) -> Result<IdempotencySlot, InventoryStoreError> {
        let mut conn = self.conn.clone();
        let key = Self::idempotency_key(user_id, fingerprint);
        let claimed: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(PENDING_SENTINEL)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;
        if claimed.is_some() {
            return Ok(IdempotencySlot::Claimed);
        }
        let existing: Option<String> = conn.get(&key).await?;
        match existing {
            Some(value) if value == PENDING_SENTINEL => Ok(IdempotencySlot::Pending),
            Some(value) => Ok(IdempotencySlot::Receipt(value)),
            // The slot vanished between the SET NX and the GET; the caller will claim it on the next poll.
            None => {
                warn!("💾️ Idempotency slot for user {user_id} disappeared mid-check");
                Ok(IdempotencySlot::Pending)
            },
        }
    }

    async fn idempotency_store(
        &self,
        user_id: &str,
        fingerprint: &str,
        receipt_json: &str,
        ttl_seconds: u64,
    ) -> Result<(), InventoryStoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(Self::idempotency_key(user_id, fingerprint), receipt_json, ttl_seconds).await?;
        Ok(())
    }

    async fn idempotency_clear(&self, user_id: &str, fingerprint: &str) -> Result<(), InventoryStoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(Self::idempotency_key(user_id, fingerprint)).await?;
        Ok(())
    }
}

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::Type;
use srs_common::Money;
use thiserror::Error;

//--------------------------------------    ReservationId    ---------------------------------------------------------
/// Opaque reservation identifier. `rsv_` followed by 12 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ReservationId(pub String);

impl ReservationId {
    /// Generates a fresh random reservation id.
    pub fn random() -> Self {
        Self(format!("rsv_{:012x}", rand::random::<u64>() & 0xffff_ffff_ffff))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ReservationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl FromStr for ReservationId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl Display for ReservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------       OrderId       ---------------------------------------------------------
/// Opaque order identifier. `ord_` followed by 12 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn random() -> Self {
        Self(format!("ord_{:012x}", rand::random::<u64>() & 0xffff_ffff_ffff))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------  ReservationStatus  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// The reservation holds its units and may still be confirmed or cancelled.
    Active,
    /// The reservation was converted into an order. The units are sold.
    Confirmed,
    /// The owner released the reservation. The units are back in the pool.
    Cancelled,
    /// The sweeper reclaimed the reservation after its TTL lapsed.
    Expired,
}

impl Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReservationStatus::Active => write!(f, "active"),
            ReservationStatus::Confirmed => write!(f, "confirmed"),
            ReservationStatus::Cancelled => write!(f, "cancelled"),
            ReservationStatus::Expired => write!(f, "expired"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid reservation status: {0}")]
pub struct StatusConversionError(String);

impl FromStr for ReservationStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            s => Err(StatusConversionError(s.to_string())),
        }
    }
}

//--------------------------------------     Reservation     ---------------------------------------------------------
/// The hot-state reservation record. The record is keyed by its [`ReservationId`] in the store, so the id is not
/// repeated in the body. A record that exists in hot state is always `active`; terminal outcomes are materialised in
/// the durable store instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub user_id: String,
    pub sku: String,
    pub quantity: i64,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(user_id: String, sku: String, quantity: i64, ttl: chrono::Duration) -> Self {
        let created_at = Utc::now();
        Self {
            user_id,
            sku,
            quantity,
            status: ReservationStatus::Active,
            created_at,
            expires_at: created_at + ttl,
        }
    }
}

//-------------------------------------- ReservationReceipt  ---------------------------------------------------------
/// The response payload of a successful `reserve`. This is also the value cached under the idempotency mapping, so
/// that replays return the original receipt verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationReceipt {
    pub reservation_id: ReservationId,
    pub sku: String,
    pub quantity: i64,
    pub expires_at: DateTime<Utc>,
    pub ttl_seconds: i64,
}

//--------------------------------------   InventoryStatus   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStatus {
    pub sku: String,
    pub available: i64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub uninitialized: bool,
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: String,
    pub status: String,
    #[serde(rename = "total")]
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub sku: String,
    pub quantity: i64,
    pub price_per_unit: Money,
}

/// A confirmed order as handed to the durable store. Orders are only ever written with `confirmed` status and are
/// never updated afterwards.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub user_id: String,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

pub const ORDER_STATUS_CONFIRMED: &str = "confirmed";

//--------------------------------------    Audit events     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    Reserve,
    Confirm,
    Cancel,
    Expire,
    OversellBlocked,
}

impl Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditEventType::Reserve => write!(f, "reserve"),
            AuditEventType::Confirm => write!(f, "confirm"),
            AuditEventType::Cancel => write!(f, "cancel"),
            AuditEventType::Expire => write!(f, "expire"),
            AuditEventType::OversellBlocked => write!(f, "oversell_blocked"),
        }
    }
}

impl FromStr for AuditEventType {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reserve" => Ok(Self::Reserve),
            "confirm" => Ok(Self::Confirm),
            "cancel" => Ok(Self::Cancel),
            "expire" => Ok(Self::Expire),
            "oversell_blocked" => Ok(Self::OversellBlocked),
            s => Err(StatusConversionError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAuditEvent {
    pub event_type: AuditEventType,
    pub user_id: Option<String>,
    pub sku: Option<String>,
    pub reservation_id: Option<ReservationId>,
    pub details: JsonValue,
}

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub id: i64,
    pub event_type: AuditEventType,
    pub user_id: Option<String>,
    pub sku: Option<String>,
    pub reservation_id: Option<ReservationId>,
    pub details: JsonValue,
    pub timestamp: DateTime<Utc>,
}

//--------------------------------------   SKU validation    ---------------------------------------------------------
pub const MAX_SKU_LENGTH: usize = 50;

/// Normalises and validates a client-supplied SKU: trimmed, upper-cased, and restricted to `[A-Z0-9-]`.
pub fn normalize_sku(raw: &str) -> Result<String, String> {
    let sku = raw.trim().to_ascii_uppercase();
    if sku.is_empty() {
        return Err("SKU cannot be empty".to_string());
    }
    if sku.len() > MAX_SKU_LENGTH {
        return Err(format!("SKU cannot be longer than {MAX_SKU_LENGTH} characters"));
    }
    if !sku.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(format!("Invalid SKU: {sku}. Only letters, digits and '-' are allowed"));
    }
    Ok(sku)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reservation_ids_have_the_documented_shape() {
        let id = ReservationId::random();
        assert!(id.as_str().starts_with("rsv_"));
        assert_eq!(id.as_str().len(), 16);
        assert!(id.as_str()[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn reservation_record_serialises_with_rfc3339_timestamps() {
        let r = Reservation::new("alice".into(), "FLASH-001".into(), 2, chrono::Duration::seconds(300));
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains(r#""status":"active""#));
        assert!(json.contains('Z'));
        let back: Reservation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn sku_normalisation() {
        assert_eq!(normalize_sku(" flash-001 ").unwrap(), "FLASH-001");
        assert!(normalize_sku("").is_err());
        assert!(normalize_sku("BAD SKU").is_err());
        assert!(normalize_sku(&"X".repeat(51)).is_err());
    }

    #[test]
    fn statuses_round_trip() {
        for s in [
            ReservationStatus::Active,
            ReservationStatus::Confirmed,
            ReservationStatus::Cancelled,
            ReservationStatus::Expired,
        ] {
            assert_eq!(s.to_string().parse::<ReservationStatus>().unwrap(), s);
        }
        assert!("paid".parse::<ReservationStatus>().is_err());
    }
}

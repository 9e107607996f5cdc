use serde::{Deserialize, Serialize};

pub const MAX_RESERVATION_ID_LENGTH: usize = 64;
pub const MAX_IDEMPOTENCY_KEY_LENGTH: usize = 128;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveRequest {
    pub sku: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmCheckoutRequest {
    pub reservation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelCheckoutRequest {
    pub reservation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelCheckoutResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitializeParams {
    pub quantity: i64,
}

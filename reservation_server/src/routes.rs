//! Request handler definitions
//!
//! Define each route and its handler here. Handlers are generic over the store backends so the same surface can be
//! served from Redis + SQLite in production and from the in-memory store in tests; [`configure`] registers them for
//! one concrete pair.
//!
//! Handlers never block the worker thread: every store interaction is awaited, and all serialisation that matters
//! for correctness happens inside the hot-state store, not here.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use reservation_engine::{
    db_types::{OrderId, ReservationId},
    traits::{AuditLogging, InventoryStore, OrderManagement},
    CheckoutApi,
    ReservationApi,
};

use crate::{
    auth::JwtClaims,
    data_objects::{
        CancelCheckoutRequest,
        CancelCheckoutResponse,
        ConfirmCheckoutRequest,
        InitializeParams,
        ReserveRequest,
        MAX_IDEMPOTENCY_KEY_LENGTH,
        MAX_RESERVATION_ID_LENGTH,
    },
    errors::ServerError,
    rate_limiter::RateLimiter,
};

pub const IDEMPOTENCY_HEADER: &str = "X-Idempotency-Key";

/// Registers the whole `/v1` surface for one concrete store pair.
pub fn configure<S, D>(cfg: &mut web::ServiceConfig)
where
    S: InventoryStore + 'static,
    D: OrderManagement + AuditLogging + 'static,
{
    cfg.service(health).service(
        web::scope("/v1")
            .route("/inventory/reserve", web::post().to(reserve::<S, D>))
            .route("/inventory/{sku}/initialize", web::post().to(initialize_inventory::<S, D>))
            .route("/inventory/{sku}", web::get().to(inventory_status::<S, D>))
            .route("/checkout/confirm", web::post().to(confirm_checkout::<S, D>))
            .route("/checkout/cancel", web::post().to(cancel_checkout::<S, D>))
            .route("/checkout/orders/{order_id}", web::get().to(get_order::<S, D>)),
    );
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ---------------------------------------------- Inventory ----------------------------------------------------

/// Admin reset of a SKU counter. Authenticated; production deployments are expected to gate this path behind an
/// administrative role in front of the service.
pub async fn initialize_inventory<S, D>(
    claims: JwtClaims,
    path: web::Path<String>,
    params: web::Query<InitializeParams>,
    api: web::Data<ReservationApi<S, D>>,
) -> Result<HttpResponse, ServerError>
where
    S: InventoryStore + 'static,
    D: OrderManagement + AuditLogging + 'static,
{
    let sku = path.into_inner();
    debug!("💻️ User {} initializing {sku} to {}", claims.user_id(), params.quantity);
    let available = api.initialize(&sku, params.quantity).await?;
    let status = api.status(&sku).await?;
    trace!("💻️ {sku} initialized with {available} units");
    Ok(HttpResponse::Ok().json(status))
}

pub async fn inventory_status<S, D>(
    path: web::Path<String>,
    api: web::Data<ReservationApi<S, D>>,
) -> Result<HttpResponse, ServerError>
where
    S: InventoryStore + 'static,
    D: OrderManagement + AuditLogging + 'static,
{
    let status = api.status(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(status))
}

/// The hot path. Admission-gated per user; idempotent when the client supplies an `X-Idempotency-Key` header.
pub async fn reserve<S, D>(
    req: HttpRequest,
    claims: JwtClaims,
    body: web::Json<ReserveRequest>,
    api: web::Data<ReservationApi<S, D>>,
    limiter: web::Data<RateLimiter>,
) -> Result<HttpResponse, ServerError>
where
    S: InventoryStore + 'static,
    D: OrderManagement + AuditLogging + 'static,
{
    trace!("💻️ Reserve request from user {}: {} units of {}", claims.user_id(), body.quantity, body.sku);
    limiter.check(claims.user_id(), req.path()).await?;
    let fingerprint = idempotency_fingerprint(&req)?;
    let receipt = api.reserve(claims.user_id(), &body.sku, body.quantity, fingerprint.as_deref()).await?;
    Ok(HttpResponse::Created().json(receipt))
}

fn idempotency_fingerprint(req: &HttpRequest) -> Result<Option<String>, ServerError> {
    let Some(value) = req.headers().get(IDEMPOTENCY_HEADER) else {
        return Ok(None);
    };
    let fingerprint = value
        .to_str()
        .map_err(|_| ServerError::InvalidRequestBody(format!("{IDEMPOTENCY_HEADER} header is not valid UTF-8")))?;
    if fingerprint.len() > MAX_IDEMPOTENCY_KEY_LENGTH {
        return Err(ServerError::InvalidRequestBody(format!(
            "{IDEMPOTENCY_HEADER} must be at most {MAX_IDEMPOTENCY_KEY_LENGTH} characters"
        )));
    }
    Ok(Some(fingerprint.to_string()))
}

// ----------------------------------------------  Checkout ----------------------------------------------------

pub async fn confirm_checkout<S, D>(
    claims: JwtClaims,
    body: web::Json<ConfirmCheckoutRequest>,
    api: web::Data<CheckoutApi<S, D>>,
) -> Result<HttpResponse, ServerError>
where
    S: InventoryStore + 'static,
    D: OrderManagement + AuditLogging + 'static,
{
    let reservation_id = parse_reservation_id(&body.reservation_id)?;
    trace!("💻️ Checkout confirmation from user {} for reservation {reservation_id}", claims.user_id());
    let order = api.confirm(claims.user_id(), &reservation_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

pub async fn cancel_checkout<S, D>(
    claims: JwtClaims,
    body: web::Json<CancelCheckoutRequest>,
    api: web::Data<ReservationApi<S, D>>,
) -> Result<HttpResponse, ServerError>
where
    S: InventoryStore + 'static,
    D: OrderManagement + AuditLogging + 'static,
{
    let reservation_id = parse_reservation_id(&body.reservation_id)?;
    trace!("💻️ Checkout cancellation from user {} for reservation {reservation_id}", claims.user_id());
    api.cancel(claims.user_id(), &reservation_id).await?;
    Ok(HttpResponse::Ok().json(CancelCheckoutResponse { ok: true }))
}

pub async fn get_order<S, D>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<CheckoutApi<S, D>>,
) -> Result<HttpResponse, ServerError>
where
    S: InventoryStore + 'static,
    D: OrderManagement + AuditLogging + 'static,
{
    let order_id = OrderId::from(path.into_inner());
    trace!("💻️ Order lookup from user {} for {order_id}", claims.user_id());
    let order = api.fetch_order(&order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

fn parse_reservation_id(raw: &str) -> Result<ReservationId, ServerError> {
    if raw.is_empty() || raw.len() > MAX_RESERVATION_ID_LENGTH {
        return Err(ServerError::InvalidRequestBody(format!(
            "reservation_id must be between 1 and {MAX_RESERVATION_ID_LENGTH} characters"
        )));
    }
    Ok(ReservationId::from(raw.to_string()))
}

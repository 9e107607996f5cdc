use actix_web::{
    error::ResponseError,
    http::StatusCode,
    HttpResponse,
};
use reservation_engine::rse_api::{CheckoutApiError, ReservationApiError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No bearer token was supplied")]
    MissingToken,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Token expired")]
    ExpiredToken,
    #[error("Could not issue token: {0}")]
    TokenIssueError(String),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not authenticate request. {0}")]
    Unauthenticated(#[from] AuthError),
    #[error("{0}")]
    Reservation(#[from] ReservationApiError),
    #[error("{0}")]
    Checkout(#[from] CheckoutApiError),
    #[error("Rate limit exceeded. Try again in {retry_after} seconds")]
    RateLimited { retry_after: i64 },
    #[error("Invalid request. {0}")]
    InvalidRequestBody(String),
    #[error("Backend unavailable. {0}")]
    BackendUnavailable(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
}

impl ServerError {
    /// A stable machine-readable slug for the error body.
    fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Reservation(e) => match e {
                ReservationApiError::Insufficient { .. } => "insufficient_inventory",
                ReservationApiError::NotInitialized(_) => "not_initialized",
                ReservationApiError::NotFound(_) => "not_found",
                ReservationApiError::Forbidden => "forbidden",
                ReservationApiError::InvalidInput(_) => "invalid_request",
                ReservationApiError::IdempotencyInFlight => "idempotency_in_flight",
                ReservationApiError::StoreError(_) => "backend_unavailable",
            },
            Self::Checkout(e) => match e {
                CheckoutApiError::ReservationNotFound(_) | CheckoutApiError::OrderNotFound(_) => "not_found",
                CheckoutApiError::Forbidden => "forbidden",
                CheckoutApiError::StoreError(_) | CheckoutApiError::OrderPersistence(_) => "backend_unavailable",
            },
            Self::RateLimited { .. } => "rate_limited",
            Self::InvalidRequestBody(_) => "invalid_request",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::ConfigurationError(_) | Self::InitializeError(_) | Self::IOError(_) => "internal_error",
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Reservation(e) => match e {
                ReservationApiError::Insufficient { .. } |
                ReservationApiError::NotInitialized(_) |
                ReservationApiError::IdempotencyInFlight => StatusCode::CONFLICT,
                ReservationApiError::NotFound(_) => StatusCode::NOT_FOUND,
                ReservationApiError::Forbidden => StatusCode::FORBIDDEN,
                ReservationApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                ReservationApiError::StoreError(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::Checkout(e) => match e {
                CheckoutApiError::ReservationNotFound(_) | CheckoutApiError::OrderNotFound(_) => {
                    StatusCode::NOT_FOUND
                },
                CheckoutApiError::Forbidden => StatusCode::FORBIDDEN,
                CheckoutApiError::StoreError(_) | CheckoutApiError::OrderPersistence(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                },
            },
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ConfigurationError(_) | Self::InitializeError(_) | Self::IOError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({ "error": self.kind(), "detail": self.to_string() });
        // `available` is exclusive to insufficient-inventory responses, `retry_after` to rate limits.
        if let Self::Reservation(ReservationApiError::Insufficient { available }) = self {
            body["available"] = json!(available);
        }
        if let Self::RateLimited { retry_after } = self {
            body["retry_after"] = json!(retry_after);
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}

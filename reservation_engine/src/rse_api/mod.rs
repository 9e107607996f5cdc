//! Public API of the reservation engine.
//!
//! [`ReservationApi`] owns the reservation lifecycle against the hot-state store: initialize, status, reserve (with
//! idempotent replay), cancel, and the sweeper's release of expired holds. [`CheckoutApi`] converts a live
//! reservation into a durable order.
pub mod checkout_api;
pub mod errors;
pub mod reservation_api;

pub use checkout_api::CheckoutApi;
pub use errors::{CheckoutApiError, ReservationApiError};
pub use reservation_api::{ExpiryResult, ReservationApi, ReservationPolicy};

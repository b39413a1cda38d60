//! Checkout coordinator.
//!
//! [`CheckoutService::place_order`] turns a user's cart into a committed
//! order in one store transaction, then hands a fulfillment job to the
//! worker pool.

pub mod coordinator;
pub mod error;

pub use coordinator::CheckoutService;
pub use error::{CheckoutError, Result};

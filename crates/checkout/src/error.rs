//! Checkout error types.

use common::UserId;
use domain::DomainError;
use store::StoreError;
use thiserror::Error;

/// Reasons a checkout is rejected. No partial effect of a failed checkout
/// is ever visible.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The user never created a cart.
    #[error("Cart not found")]
    CartNotFound,

    /// The cart exists but holds no items.
    #[error("Cart is empty")]
    EmptyCart,

    /// The cart's owner has no user record. Indicates corrupt data.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// A cart line asks for more units than are in stock.
    #[error("Not enough stock for product: {product_name} (requested {requested}, available {available})")]
    InsufficientStock {
        product_name: String,
        requested: u32,
        available: u32,
    },

    /// The order total does not fit in cents.
    #[error("Order total out of range: {0}")]
    AmountOutOfRange(#[from] DomainError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CheckoutError {
    /// Short label used for the failure metric.
    pub fn reason(&self) -> &'static str {
        match self {
            CheckoutError::CartNotFound => "cart_not_found",
            CheckoutError::EmptyCart => "empty_cart",
            CheckoutError::UserNotFound(_) => "user_not_found",
            CheckoutError::InsufficientStock { .. } => "insufficient_stock",
            CheckoutError::AmountOutOfRange(_) => "amount_out_of_range",
            CheckoutError::Store(_) => "store",
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;

//! Domain error types.

use thiserror::Error;

use crate::Money;
use crate::cart::MAX_QUANTITY;

/// Validation failures for domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Quantities must be at least one and fit the store's integer column.
    #[error("Invalid quantity: {quantity} (must be between 1 and {max})", max = MAX_QUANTITY)]
    InvalidQuantity { quantity: u32 },

    /// A line total does not fit in an `i64` of cents.
    #[error("Amount out of range: {quantity} x {unit_price} overflows")]
    AmountOverflow { unit_price: Money, quantity: u32 },

    /// The sum of otherwise valid line totals does not fit.
    #[error("Total out of range")]
    TotalOverflow,

    /// Prices must not be negative.
    #[error("Invalid price: {price} (must not be negative)")]
    InvalidPrice { price: Money },

    /// Stock must fit the store's integer column.
    #[error("Invalid stock: {stock} (must be at most {max})", max = MAX_QUANTITY)]
    InvalidStock { stock: u32 },

    /// A required text field was blank.
    #[error("Field '{field}' is required")]
    MissingField { field: &'static str },

    /// Emails need a local part and a domain.
    #[error("Invalid email: '{0}'")]
    InvalidEmail(String),

    /// An order status string did not match any known status.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}

use common::ProductId;
use domain::{MAX_QUANTITY, OrderNumber};
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Merging into an existing cart line would exceed the per-line limit.
    #[error("Cart line for product {0} would exceed {max} units", max = MAX_QUANTITY)]
    CartLineLimit(ProductId),

    /// Another product already uses this SKU.
    #[error("Duplicate SKU: {0}")]
    DuplicateSku(String),

    /// Another user already uses this email.
    #[error("Duplicate email: {0}")]
    DuplicateEmail(String),

    /// The order number is already taken.
    #[error("Duplicate order number: {0}")]
    DuplicateOrderNumber(OrderNumber),

    /// A stored row could not be mapped back into the domain model.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// The store refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

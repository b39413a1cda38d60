//! Catalog error types.

use common::ProductId;
use domain::{DomainError, MAX_QUANTITY};
use store::StoreError;
use thiserror::Error;

/// Errors returned by the user, cart and catalog services.
///
/// Cache failures never show up here. They are logged and bypassed.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Input failed domain validation.
    #[error("Validation error: {0}")]
    Validation(#[from] DomainError),

    /// Product not found.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Adding to an existing cart line would take it past the line limit.
    #[error("Cart line for product {0} would exceed {max} units", max = MAX_QUANTITY)]
    CartLineLimit(ProductId),

    /// Another product already uses this SKU.
    #[error("SKU already exists: {0}")]
    DuplicateSku(String),

    /// Another user already registered this email.
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    /// Store error.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProductNotFound(id) => CatalogError::ProductNotFound(id),
            StoreError::CartLineLimit(id) => CatalogError::CartLineLimit(id),
            StoreError::DuplicateSku(sku) => CatalogError::DuplicateSku(sku),
            StoreError::DuplicateEmail(email) => CatalogError::DuplicateEmail(email),
            other => CatalogError::Store(other),
        }
    }
}

/// Convenience type alias for catalog results.
pub type Result<T> = std::result::Result<T, CatalogError>;

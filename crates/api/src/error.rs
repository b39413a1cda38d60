//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use catalog::CatalogError;
use checkout::CheckoutError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Missing, malformed or expired bearer token.
    Unauthorized(String),
    /// Checkout rejected or failed.
    Checkout(CheckoutError),
    /// User, cart or catalog operation failed.
    Catalog(CatalogError),
    /// Internal server error.
    Internal(String),
}

const INTERNAL_MESSAGE: &str = "Internal server error";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Catalog(err) => catalog_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match &err {
        CheckoutError::CartNotFound
        | CheckoutError::EmptyCart
        | CheckoutError::InsufficientStock { .. }
        | CheckoutError::AmountOutOfRange(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        CheckoutError::UserNotFound(_) | CheckoutError::Store(_) => {
            tracing::error!(error = %err, "checkout failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_MESSAGE.to_string(),
            )
        }
    }
}

fn catalog_error_to_response(err: CatalogError) -> (StatusCode, String) {
    match &err {
        CatalogError::Validation(_) | CatalogError::CartLineLimit(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        CatalogError::ProductNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        CatalogError::DuplicateSku(_) | CatalogError::DuplicateEmail(_) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        CatalogError::Store(_) => {
            tracing::error!(error = %err, "catalog operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_MESSAGE.to_string(),
            )
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

#[cfg(test)]
mod tests {
    use common::{ProductId, UserId};
    use domain::DomainError;
    use store::StoreError;

    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_checkout_errors_map_to_status() {
        assert_eq!(
            status_of(CheckoutError::EmptyCart.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CheckoutError::CartNotFound.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                CheckoutError::InsufficientStock {
                    product_name: "Widget".into(),
                    requested: 3,
                    available: 2,
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CheckoutError::AmountOutOfRange(DomainError::TotalOverflow).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CheckoutError::UserNotFound(UserId::new()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_catalog_errors_map_to_status() {
        assert_eq!(
            status_of(CatalogError::ProductNotFound(ProductId::new()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CatalogError::from(StoreError::CartLineLimit(ProductId::new())).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CatalogError::DuplicateSku("SKU-1".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CatalogError::Store(StoreError::Unavailable("down".into())).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthorized() {
        assert_eq!(
            status_of(ApiError::Unauthorized("no token".into())),
            StatusCode::UNAUTHORIZED
        );
    }
}

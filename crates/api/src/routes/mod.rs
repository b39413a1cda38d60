//! Request handlers, one module per resource.

pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod users;

use common::ProductId;
use uuid::Uuid;

use crate::error::ApiError;

fn parse_product_id(id: &str) -> Result<ProductId, ApiError> {
    let uuid = Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid product_id: {e}")))?;
    Ok(ProductId::from_uuid(uuid))
}

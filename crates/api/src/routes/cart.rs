//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::{Cart, CartItem};
use serde::{Deserialize, Serialize};
use store::Store;

use super::parse_product_id;
use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

/// Cart view. Totals that do not fit in cents are `null`; checking out such
/// a cart is rejected.
#[derive(Serialize)]
pub struct CartResponse {
    pub cart_id: Option<String>,
    pub items: Vec<CartItemResponse>,
    pub subtotal: Option<f64>,
    pub subtotal_cents: Option<i64>,
}

#[derive(Serialize)]
pub struct CartItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: Option<i64>,
    pub in_stock: u32,
}

impl From<&CartItem> for CartItemResponse {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product.id.to_string(),
            product_name: item.product.name.clone(),
            quantity: item.quantity,
            unit_price_cents: item.product.price.cents(),
            line_total_cents: item.line_total().ok().map(|total| total.cents()),
            in_stock: item.product.stock,
        }
    }
}

impl From<Option<Cart>> for CartResponse {
    fn from(cart: Option<Cart>) -> Self {
        match cart {
            Some(cart) => {
                let subtotal = cart.subtotal().ok();
                Self {
                    cart_id: Some(cart.id.to_string()),
                    items: cart.items.iter().map(CartItemResponse::from).collect(),
                    subtotal: subtotal.map(|s| s.as_decimal()),
                    subtotal_cents: subtotal.map(|s| s.cents()),
                }
            }
            None => Self {
                cart_id: None,
                items: Vec::new(),
                subtotal: Some(0.0),
                subtotal_cents: Some(0),
            },
        }
    }
}

/// GET /api/v1/cart — the caller's cart. Empty if they never added anything.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.carts.get_cart(user.0).await?;
    Ok(Json(cart.into()))
}

/// POST /api/v1/cart/items — add units of a product to the caller's cart.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.0))]
pub async fn add_item<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Json(req): Json<AddCartItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let product_id = parse_product_id(&req.product_id)?;
    let cart = state
        .carts
        .add_item(user.0, product_id, req.quantity)
        .await?;
    Ok(Json(Some(cart).into()))
}


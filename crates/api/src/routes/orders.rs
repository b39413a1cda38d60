//! Checkout and order history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{Order, OrderItem};
use serde::Serialize;
use store::Store;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct OrderPlacedResponse {
    pub message: &'static str,
    pub order_number: String,
    pub total: f64,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub status: String,
    pub total: f64,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id.to_string(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price.as_decimal(),
            unit_price_cents: item.unit_price.cents(),
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            order_number: order.order_number.to_string(),
            status: order.status.to_string(),
            total: order.total.as_decimal(),
            total_cents: order.total.cents(),
            created_at: order.created_at,
            items: order.items.iter().map(OrderItemResponse::from).collect(),
        }
    }
}

/// POST /api/v1/orders — check out the caller's cart.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0))]
pub async fn place<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<(StatusCode, Json<OrderPlacedResponse>), ApiError> {
    let order = state.checkout.place_order(user.0).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderPlacedResponse {
            message: "Order placed successfully",
            order_number: order.order_number.to_string(),
            total: order.total.as_decimal(),
            total_cents: order.total.cents(),
        }),
    ))
}

/// GET /api/v1/orders — the caller's orders, newest first.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<OrderListResponse>, ApiError> {
    let orders = state.checkout.orders_for_user(user.0).await?;
    Ok(Json(OrderListResponse {
        orders: orders.into_iter().map(OrderResponse::from).collect(),
    }))
}

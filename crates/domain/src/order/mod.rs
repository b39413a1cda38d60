//! Committed orders and their line items.

mod number;
mod status;

pub use number::{OrderNumber, OrderNumberGenerator};
pub use status::OrderStatus;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DomainError, Money, OrderId, ProductId, UserId};

/// A committed order.
///
/// The total is computed once from the item snapshots when the order is
/// built and never recomputed from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub total: Money,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

/// A purchased product line. The unit price is copied from the product at
/// checkout time so later catalog price changes do not affect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,

    /// Product name at the time of purchase.
    pub product_name: String,

    pub quantity: u32,

    /// Price per unit in cents, frozen at checkout.
    pub unit_price: Money,
}

impl Order {
    /// Builds a new pending order, fixing its total from the given items.
    ///
    /// Fails when a line total or the order total does not fit in cents.
    pub fn pending(
        user_id: UserId,
        order_number: OrderNumber,
        items: Vec<OrderItem>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let lines = items
            .iter()
            .map(OrderItem::line_total)
            .collect::<Result<Vec<_>, _>>()?;
        let total = Money::checked_sum(lines).ok_or(DomainError::TotalOverflow)?;

        Ok(Self {
            id: OrderId::new(),
            user_id,
            order_number,
            status: OrderStatus::Pending,
            total,
            items,
            created_at,
        })
    }

    /// Number of product lines in the order.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

impl OrderItem {
    /// Creates a new order item.
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this item (quantity * unit_price).
    pub fn line_total(&self) -> Result<Money, DomainError> {
        self.unit_price
            .checked_multiply(self.quantity)
            .ok_or(DomainError::AmountOverflow {
                unit_price: self.unit_price,
                quantity: self.quantity,
            })
    }
}

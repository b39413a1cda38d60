//! Shopping carts.

use serde::{Deserialize, Serialize};

use crate::{CartId, DomainError, Money, Product, UserId};

/// A user's cart, loaded together with the current snapshot of every
/// product it references.
///
/// A user has at most one cart. Clearing it removes the items but keeps the
/// cart itself for reuse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartItem>,
}

/// One product line in a cart. There is at most one line per product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn empty(id: CartId, user_id: UserId) -> Self {
        Self {
            id,
            user_id,
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all units across lines.
    pub fn unit_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Value of the cart at current catalog prices.
    pub fn subtotal(&self) -> Result<Money, DomainError> {
        let lines = self
            .items
            .iter()
            .map(CartItem::line_total)
            .collect::<Result<Vec<_>, _>>()?;
        Money::checked_sum(lines).ok_or(DomainError::TotalOverflow)
    }
}

impl CartItem {
    pub fn line_total(&self) -> Result<Money, DomainError> {
        self.product
            .price
            .checked_multiply(self.quantity)
            .ok_or(DomainError::AmountOverflow {
                unit_price: self.product.price,
                quantity: self.quantity,
            })
    }
}

/// Largest quantity a single cart line may hold.
pub const MAX_QUANTITY: u32 = i32::MAX as u32;

/// Rejects zero quantities and quantities above [`MAX_QUANTITY`].
pub fn validate_quantity(quantity: u32) -> Result<(), DomainError> {
    if quantity == 0 || quantity > MAX_QUANTITY {
        return Err(DomainError::InvalidQuantity { quantity });
    }
    Ok(())
}

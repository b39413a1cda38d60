//! Catalog products.

use serde::{Deserialize, Serialize};

use crate::{DomainError, MAX_QUANTITY, Money, ProductId};

/// A catalog product with its current price and available stock.
///
/// `stock` is unsigned so the "never negative" invariant holds by type; the
/// store additionally guards every decrement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub sku: String,
    pub price: Money,
    pub stock: u32,
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub sku: String,
    pub price: Money,
    pub stock: u32,
}

impl NewProduct {
    /// Checks the fields a product cannot exist without.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::MissingField { field: "name" });
        }
        if self.sku.trim().is_empty() {
            return Err(DomainError::MissingField { field: "sku" });
        }
        if self.price.is_negative() {
            return Err(DomainError::InvalidPrice { price: self.price });
        }
        if self.stock > MAX_QUANTITY {
            return Err(DomainError::InvalidStock { stock: self.stock });
        }
        Ok(())
    }

    /// Assigns an identifier, producing the stored product.
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            sku: self.sku,
            price: self.price,
            stock: self.stock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> NewProduct {
        NewProduct {
            name: "Widget".to_string(),
            description: String::new(),
            sku: "SKU-001".to_string(),
            price: Money::from_cents(1000),
            stock: 5,
        }
    }

    #[test]
    fn valid_product_passes() {
        assert_eq!(widget().validate(), Ok(()));
    }

    #[test]
    fn blank_name_is_rejected() {
        let product = NewProduct {
            name: "  ".to_string(),
            ..widget()
        };
        assert_eq!(
            product.validate(),
            Err(DomainError::MissingField { field: "name" })
        );
    }

    #[test]
    fn blank_sku_is_rejected() {
        let product = NewProduct {
            sku: String::new(),
            ..widget()
        };
        assert_eq!(
            product.validate(),
            Err(DomainError::MissingField { field: "sku" })
        );
    }

    #[test]
    fn negative_price_is_rejected() {
        let product = NewProduct {
            price: Money::from_cents(-1),
            ..widget()
        };
        assert!(matches!(
            product.validate(),
            Err(DomainError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn stock_beyond_column_range_is_rejected() {
        let product = NewProduct {
            stock: MAX_QUANTITY + 1,
            ..widget()
        };
        assert_eq!(
            product.validate(),
            Err(DomainError::InvalidStock {
                stock: MAX_QUANTITY + 1
            })
        );
    }

    #[test]
    fn free_products_are_allowed() {
        let product = NewProduct {
            price: Money::zero(),
            ..widget()
        };
        assert!(product.validate().is_ok());
    }
}

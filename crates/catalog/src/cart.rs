use common::{ProductId, UserId};
use domain::{Cart, validate_quantity};
use store::Store;

use crate::Result;

/// Manages the single cart each user owns.
pub struct CartService<S: Store> {
    store: S,
}

impl<S: Store> CartService<S> {
    /// Creates a new cart service.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds units of a product to the user's cart.
    ///
    /// The cart is created on first use. Adding a product that is already in
    /// the cart increases that line's quantity. Stock is not reserved here;
    /// it is checked at checkout.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        validate_quantity(quantity)?;
        let cart = self
            .store
            .add_cart_item(user_id, product_id, quantity)
            .await?;
        tracing::debug!(cart_id = %cart.id, lines = cart.items.len(), "cart updated");
        Ok(cart)
    }

    /// Returns the user's cart, or None if they never added anything.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        Ok(self.store.get_cart(user_id).await?)
    }
}

use async_trait::async_trait;
use common::{CartId, ProductId, UserId};
use domain::{Cart, NewProduct, Order, Product, User};

use crate::Result;

/// Core trait for store implementations.
///
/// Non-transactional methods serve the collaborator surfaces (users, catalog,
/// cart). Checkout goes through [`Store::begin`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Starts an atomic unit of work.
    ///
    /// Implementations must make the stock check and decrement of one
    /// transaction atomic relative to every other transaction touching the
    /// same products.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    /// Creates the identity row for a user.
    async fn create_user(&self, email: &str) -> Result<User>;

    /// Loads a user. Returns None if the user doesn't exist.
    async fn get_user(&self, user_id: UserId) -> Result<Option<User>>;

    /// Inserts a product. Fails with `DuplicateSku` if the SKU is taken.
    async fn create_product(&self, product: NewProduct) -> Result<Product>;

    /// Loads a product. Returns None if the product doesn't exist.
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Lists all products in creation order.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Adds units of a product to the user's cart.
    ///
    /// Creates the cart on first use. If the product is already in the cart
    /// its quantity is incremented instead of adding a second line.
    async fn add_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart>;

    /// Loads the user's cart with current product snapshots.
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>>;

    /// Returns all orders of a user with their items, newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;
}

/// An open atomic unit of work against the store.
///
/// Nothing written through a transaction is visible to others until
/// [`commit`](StoreTransaction::commit) succeeds. Dropping it rolls back.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Loads the user's cart with its items and the current product
    /// snapshot for each, locking those products for the rest of the
    /// transaction.
    async fn cart_with_items(&mut self, user_id: UserId) -> Result<Option<Cart>>;

    /// Loads a user inside the transaction.
    async fn user(&mut self, user_id: UserId) -> Result<Option<User>>;

    /// Decrements a product's stock by `quantity`.
    ///
    /// Returns `false` without changing anything when less than `quantity`
    /// units are available, so stock can never go negative.
    async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool>;

    /// Persists an order together with its items.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Deletes every item in the cart. The cart itself is kept.
    async fn clear_cart_items(&mut self, cart_id: CartId) -> Result<()>;

    /// Publishes all writes of this transaction.
    async fn commit(self: Box<Self>) -> Result<()>;
}

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{CartId, ProductId, UserId};
use domain::{Cart, CartItem, MAX_QUANTITY, NewProduct, Order, Product, User};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Result, StoreError,
    store::{Store, StoreTransaction},
};

#[derive(Debug, Clone)]
struct CartRecord {
    id: CartId,
    /// (product, quantity) in the order lines were first added.
    lines: Vec<(ProductId, u32)>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    products: Vec<Product>,
    carts: HashMap<UserId, CartRecord>,
    orders: Vec<Order>,
}

impl MemoryState {
    fn product(&self, product_id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == product_id)
    }

    fn product_mut(&mut self, product_id: ProductId) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.id == product_id)
    }

    fn cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let Some(record) = self.carts.get(&user_id) else {
            return Ok(None);
        };

        let mut items = Vec::with_capacity(record.lines.len());
        for (product_id, quantity) in &record.lines {
            let product = self.product(*product_id).ok_or_else(|| {
                StoreError::Corrupt(format!("cart item references missing product {product_id}"))
            })?;
            items.push(CartItem {
                product: product.clone(),
                quantity: *quantity,
            });
        }

        Ok(Some(Cart {
            id: record.id,
            user_id,
            items,
        }))
    }
}

/// In-memory store implementation for testing and local runs.
///
/// Transactions are serialized behind a single async mutex: a transaction
/// holds the lock from `begin` until it is committed or dropped, and works
/// on a private copy of the state that replaces the shared state only on
/// commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_on_insert_order: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures every subsequent `insert_order` to fail.
    pub fn set_fail_on_insert_order(&self, fail: bool) {
        self.fail_on_insert_order.store(fail, Ordering::SeqCst);
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Sets a product's price, as a catalog manager would.
    pub async fn set_price(&self, product_id: ProductId, price: domain::Money) -> Result<()> {
        let mut state = self.state.lock().await;
        let product = state
            .product_mut(product_id)
            .ok_or(StoreError::ProductNotFound(product_id))?;
        product.price = price;
        Ok(())
    }

    /// Returns true if a cart row exists for the user, whether or not it has items.
    pub async fn has_cart(&self, user_id: UserId) -> bool {
        self.state.lock().await.carts.contains_key(&user_id)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            staged,
            fail_on_insert_order: self.fail_on_insert_order.load(Ordering::SeqCst),
        }))
    }

    async fn create_user(&self, email: &str) -> Result<User> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail(email.to_string()));
        }
        let user = User::new(UserId::new(), email);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let mut state = self.state.lock().await;
        if state.products.iter().any(|p| p.sku == product.sku) {
            return Err(StoreError::DuplicateSku(product.sku));
        }
        let product = product.into_product(ProductId::new());
        state.products.push(product.clone());
        Ok(product)
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.lock().await.product(product_id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.state.lock().await.products.clone())
    }

    async fn add_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        let mut state = self.state.lock().await;
        if state.product(product_id).is_none() {
            return Err(StoreError::ProductNotFound(product_id));
        }

        if quantity > MAX_QUANTITY {
            return Err(StoreError::CartLineLimit(product_id));
        }

        let record = state.carts.entry(user_id).or_insert_with(|| CartRecord {
            id: CartId::new(),
            lines: Vec::new(),
        });
        match record.lines.iter_mut().find(|(id, _)| *id == product_id) {
            Some((_, existing)) => {
                *existing = existing
                    .checked_add(quantity)
                    .filter(|merged| *merged <= MAX_QUANTITY)
                    .ok_or(StoreError::CartLineLimit(product_id))?;
            }
            None => record.lines.push((product_id, quantity)),
        }

        state
            .cart(user_id)?
            .ok_or_else(|| StoreError::Corrupt(format!("cart for {user_id} vanished")))
    }

    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        self.state.lock().await.cart(user_id)
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        // Reverse insertion order first so equal timestamps still list the
        // later order first after the stable sort.
        let mut orders: Vec<Order> = state
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    fail_on_insert_order: bool,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn cart_with_items(&mut self, user_id: UserId) -> Result<Option<Cart>> {
        self.staged.cart(user_id)
    }

    async fn user(&mut self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.staged.users.get(&user_id).cloned())
    }

    async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool> {
        let product = self
            .staged
            .product_mut(product_id)
            .ok_or(StoreError::ProductNotFound(product_id))?;
        match product.stock.checked_sub(quantity) {
            Some(remaining) => {
                product.stock = remaining;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        if self.fail_on_insert_order {
            return Err(StoreError::Unavailable("order insert rejected".to_string()));
        }
        if self
            .staged
            .orders
            .iter()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(StoreError::DuplicateOrderNumber(order.order_number.clone()));
        }
        self.staged.orders.push(order.clone());
        Ok(())
    }

    async fn clear_cart_items(&mut self, cart_id: CartId) -> Result<()> {
        if let Some(record) = self.staged.carts.values_mut().find(|c| c.id == cart_id) {
            record.lines.clear();
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }
}

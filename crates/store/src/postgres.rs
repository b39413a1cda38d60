use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartId, OrderId, ProductId, UserId};
use domain::{
    Cart, CartItem, Money, NewProduct, Order, OrderItem, OrderNumber, OrderStatus, Product, User,
};
use sqlx::{
    PgPool, Postgres, Row, Transaction,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{Store, StoreTransaction},
};

const PRODUCT_COLUMNS: &str = "id, name, description, sku, price_cents, stock";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database with a bounded connection pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

fn constraint_of(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}

fn to_u32(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} is negative: {value}")))
}

fn to_i32(value: u32, column: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        sku: row.try_get("sku")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: to_u32(row.try_get("stock")?, "stock")?,
    })
}

fn row_to_cart_item(row: &PgRow) -> Result<CartItem> {
    Ok(CartItem {
        product: row_to_product(row)?,
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
    })
}

fn row_to_user(row: &PgRow) -> Result<User> {
    Ok(User::new(
        UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
        row.try_get::<String, _>("email")?,
    ))
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        order_number: OrderNumber::new(row.try_get::<String, _>("order_number")?),
        status: status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        total: Money::from_cents(row.try_get("total_cents")?),
        items: Vec::new(),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn row_to_order_item(row: &PgRow) -> Result<OrderItem> {
    Ok(OrderItem {
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        product_name: row.try_get("product_name")?,
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
    })
}

async fn load_cart_items(
    executor: impl sqlx::PgExecutor<'_>,
    cart_id: CartId,
    lock: bool,
) -> Result<Vec<CartItem>> {
    // Product rows are locked in id order so concurrent checkouts over
    // overlapping carts cannot deadlock.
    let sql = if lock {
        r#"
        SELECT ci.quantity, p.id, p.name, p.description, p.sku, p.price_cents, p.stock
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.cart_id = $1
        ORDER BY p.id
        FOR UPDATE OF p
        "#
    } else {
        r#"
        SELECT ci.quantity, p.id, p.name, p.description, p.sku, p.price_cents, p.stock
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.cart_id = $1
        ORDER BY ci.added_at, p.id
        "#
    };

    let rows = sqlx::query(sql)
        .bind(cart_id.as_uuid())
        .fetch_all(executor)
        .await?;

    rows.iter().map(row_to_cart_item).collect()
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn create_user(&self, email: &str) -> Result<User> {
        let row = sqlx::query("INSERT INTO users (id, email) VALUES ($1, $2) RETURNING id, email")
            .bind(Uuid::new_v4())
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if constraint_of(&e) == Some("users_email_key") {
                    return StoreError::DuplicateEmail(email.to_string());
                }
                StoreError::Database(e)
            })?;

        row_to_user(&row)
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, email FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let sql = format!(
            r#"
            INSERT INTO products (id, name, description, sku, price_cents, stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(&product.name)
            .bind(&product.description)
            .bind(&product.sku)
            .bind(product.price.cents())
            .bind(to_i32(product.stock, "stock")?)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if constraint_of(&e) == Some("products_sku_key") {
                    return StoreError::DuplicateSku(product.sku.clone());
                }
                StoreError::Database(e)
            })?;

        row_to_product(&row)
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(product_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at, id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(row_to_product).collect()
    }

    async fn add_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM products WHERE id = $1")
            .bind(product_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::ProductNotFound(product_id));
        }

        let cart_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO carts (id, user_id) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id.as_uuid())
        .fetch_one(&mut *tx)
        .await?;

        let quantity =
            i32::try_from(quantity).map_err(|_| StoreError::CartLineLimit(product_id))?;
        // The guard keeps the merged quantity inside the INTEGER column; a
        // skipped update affects no rows.
        let upserted = sqlx::query(
            r#"
            INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            WHERE cart_items.quantity <= $4 - EXCLUDED.quantity
            "#,
        )
        .bind(cart_id)
        .bind(product_id.as_uuid())
        .bind(quantity)
        .bind(i32::MAX)
        .execute(&mut *tx)
        .await?;
        if upserted.rows_affected() == 0 {
            return Err(StoreError::CartLineLimit(product_id));
        }

        let cart_id = CartId::from_uuid(cart_id);
        let items = load_cart_items(&mut *tx, cart_id, false).await?;
        tx.commit().await?;

        Ok(Cart {
            id: cart_id,
            user_id,
            items,
        })
    }

    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let cart_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        let Some(cart_id) = cart_id.map(CartId::from_uuid) else {
            return Ok(None);
        };

        let items = load_cart_items(&self.pool, cart_id, false).await?;
        Ok(Some(Cart {
            id: cart_id,
            user_id,
            items,
        }))
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, order_number, status, total_cents, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, order_number DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut orders = rows.iter().map(row_to_order).collect::<Result<Vec<_>>>()?;
        if orders.is_empty() {
            return Ok(orders);
        }

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id.as_uuid()).collect();
        let item_rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in &item_rows {
            let order_id: Uuid = row.try_get("order_id")?;
            items_by_order
                .entry(order_id)
                .or_default()
                .push(row_to_order_item(row)?);
        }

        for order in &mut orders {
            order.items = items_by_order
                .remove(&order.id.as_uuid())
                .unwrap_or_default();
        }

        Ok(orders)
    }
}

struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn cart_with_items(&mut self, user_id: UserId) -> Result<Option<Cart>> {
        // Locking the cart row serializes two checkouts of the same cart.
        let cart_id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM carts WHERE user_id = $1 FOR UPDATE")
                .bind(user_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await?;

        let Some(cart_id) = cart_id.map(CartId::from_uuid) else {
            return Ok(None);
        };

        let items = load_cart_items(&mut *self.tx, cart_id, true).await?;
        Ok(Some(Cart {
            id: cart_id,
            user_id,
            items,
        }))
    }

    async fn user(&mut self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, email FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - $1, updated_at = clock_timestamp()
            WHERE id = $2 AND stock >= $1
            "#,
        )
        .bind(to_i32(quantity, "quantity")?)
        .bind(product_id.as_uuid())
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, order_number, status, total_cents, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.order_number.as_str())
        .bind(order.status.as_str())
        .bind(order.total.cents())
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if constraint_of(&e) == Some("orders_order_number_key") {
                return StoreError::DuplicateOrderNumber(order.order_number.clone());
            }
            StoreError::Database(e)
        })?;

        for (position, item) in order.items.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| StoreError::Corrupt(format!("too many order items: {position}")))?;

            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, product_id, product_name, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(position)
            .bind(item.product_id.as_uuid())
            .bind(&item.product_name)
            .bind(to_i32(item.quantity, "quantity")?)
            .bind(item.unit_price.cents())
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn clear_cart_items(&mut self, cart_id: CartId) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

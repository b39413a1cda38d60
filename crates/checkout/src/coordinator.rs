use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use common::UserId;
use domain::{Order, OrderItem, OrderNumberGenerator};
use fulfillment::{FulfillmentError, FulfillmentJob, JobSubmitter};
use store::Store;

use crate::error::{CheckoutError, Result};

/// Converts carts into orders.
///
/// Stock checks, stock decrements, the order insert and clearing the cart
/// run in one store transaction. The fulfillment job is submitted only
/// after that transaction commits.
pub struct CheckoutService<S: Store> {
    store: S,
    jobs: JobSubmitter,
    order_numbers: Arc<OrderNumberGenerator>,
}

impl<S: Store + Clone> Clone for CheckoutService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            jobs: self.jobs.clone(),
            order_numbers: Arc::clone(&self.order_numbers),
        }
    }
}

impl<S: Store> CheckoutService<S> {
    /// Creates a new checkout service.
    pub fn new(store: S, jobs: JobSubmitter) -> Self {
        Self {
            store,
            jobs,
            order_numbers: Arc::new(OrderNumberGenerator::new()),
        }
    }

    /// Places an order for everything in the user's cart.
    ///
    /// Waits for queue space if the fulfillment queue is full. A job that
    /// cannot be queued because the pool is stopping is logged and dropped;
    /// the committed order is still returned.
    #[tracing::instrument(skip(self))]
    pub async fn place_order(&self, user_id: UserId) -> Result<Order> {
        let started = Instant::now();
        let result = self.commit_order(user_id).await;
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());

        let (order, user_email) = match result {
            Ok(committed) => committed,
            Err(e) => {
                metrics::counter!("checkout_failures_total", "reason" => e.reason()).increment(1);
                tracing::info!(reason = e.reason(), error = %e, "checkout rejected");
                return Err(e);
            }
        };

        metrics::counter!("checkout_orders_placed_total").increment(1);
        tracing::info!(
            order_number = %order.order_number,
            total = %order.total,
            items = order.item_count(),
            "order placed"
        );

        let job = FulfillmentJob::for_order(&order, user_email);
        if let Err(e) = self.jobs.submit(job).await {
            match e {
                FulfillmentError::QueueClosed => {
                    metrics::counter!("fulfillment_jobs_dropped_total").increment(1);
                    tracing::error!(
                        order_number = %order.order_number,
                        "job queue closed, fulfillment for committed order dropped"
                    );
                }
                other => {
                    tracing::error!(
                        order_number = %order.order_number,
                        error = %other,
                        "failed to queue fulfillment job"
                    );
                }
            }
        }

        Ok(order)
    }

    /// Runs the atomic part of checkout. Returns the order and the email
    /// the confirmation goes to.
    async fn commit_order(&self, user_id: UserId) -> Result<(Order, String)> {
        // Any early return drops `tx`, which rolls everything back.
        let mut tx = self.store.begin().await?;

        let cart = tx
            .cart_with_items(user_id)
            .await?
            .ok_or(CheckoutError::CartNotFound)?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        // Totals that do not fit are rejected before any stock moves.
        cart.subtotal()?;

        let user = tx
            .user(user_id)
            .await?
            .ok_or(CheckoutError::UserNotFound(user_id))?;

        let mut items = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let product = &item.product;
            let insufficient = || CheckoutError::InsufficientStock {
                product_name: product.name.clone(),
                requested: item.quantity,
                available: product.stock,
            };

            if item.quantity > product.stock {
                return Err(insufficient());
            }
            if !tx.decrement_stock(product.id, item.quantity).await? {
                return Err(insufficient());
            }

            items.push(OrderItem::new(
                product.id,
                product.name.clone(),
                item.quantity,
                product.price,
            ));
        }

        let order = Order::pending(user_id, self.order_numbers.next(), items, Utc::now())?;
        tx.insert_order(&order).await?;
        tx.clear_cart_items(cart.id).await?;
        tx.commit().await?;

        Ok((order, user.email))
    }

    /// Returns the user's orders with their items, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(self.store.orders_for_user(user_id).await?)
    }
}

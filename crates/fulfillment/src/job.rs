use common::OrderId;
use domain::{Order, OrderNumber};

/// The payload a worker needs to run the side effects of one order.
///
/// Jobs live only in the queue. They are not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentJob {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub user_email: String,
}

impl FulfillmentJob {
    /// Builds the job for a committed order.
    pub fn for_order(order: &Order, user_email: impl Into<String>) -> Self {
        Self {
            order_id: order.id,
            order_number: order.order_number.clone(),
            user_email: user_email.into(),
        }
    }
}

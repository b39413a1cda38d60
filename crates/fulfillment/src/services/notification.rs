//! Order confirmation dispatch.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use domain::OrderNumber;

use crate::{FulfillmentError, FulfillmentJob};

/// Sends the order confirmation to the customer.
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send_confirmation(&self, job: &FulfillmentJob) -> Result<(), FulfillmentError>;
}

/// Stands in for an email provider by sleeping for a fixed latency.
#[derive(Debug, Clone)]
pub struct SimulatedNotificationService {
    latency: Duration,
}

impl SimulatedNotificationService {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl NotificationService for SimulatedNotificationService {
    async fn send_confirmation(&self, job: &FulfillmentJob) -> Result<(), FulfillmentError> {
        tokio::time::sleep(self.latency).await;
        tracing::info!(
            order_number = %job.order_number,
            email = %job.user_email,
            "order confirmation sent"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    sent: Vec<(OrderNumber, String)>,
    fail_on_send: bool,
}

/// In-memory notification service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationService {
    state: Arc<Mutex<InMemoryNotificationState>>,
}

impl InMemoryNotificationService {
    /// Creates a new in-memory notification service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail every send while set.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_send = fail;
    }

    /// Returns the order numbers confirmed so far, in send order.
    pub fn sent(&self) -> Vec<OrderNumber> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sent
            .iter()
            .map(|(number, _)| number.clone())
            .collect()
    }

    /// Returns the number of confirmations sent.
    pub fn sent_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sent
            .len()
    }
}

#[async_trait]
impl NotificationService for InMemoryNotificationService {
    async fn send_confirmation(&self, job: &FulfillmentJob) -> Result<(), FulfillmentError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if state.fail_on_send {
            return Err(FulfillmentError::Notification(format!(
                "mail server rejected {}",
                job.user_email
            )));
        }

        state
            .sent
            .push((job.order_number.clone(), job.user_email.clone()));
        Ok(())
    }
}

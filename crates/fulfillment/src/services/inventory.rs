//! Inventory system sync.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use domain::OrderNumber;

use crate::{FulfillmentError, FulfillmentJob};

/// Tells the external inventory system (ERP) about a committed order.
#[async_trait]
pub trait InventorySyncService: Send + Sync {
    async fn sync_order(&self, job: &FulfillmentJob) -> Result<(), FulfillmentError>;
}

/// Stands in for the ERP integration by sleeping for a fixed latency.
#[derive(Debug, Clone)]
pub struct SimulatedInventorySyncService {
    latency: Duration,
}

impl SimulatedInventorySyncService {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl InventorySyncService for SimulatedInventorySyncService {
    async fn sync_order(&self, job: &FulfillmentJob) -> Result<(), FulfillmentError> {
        tokio::time::sleep(self.latency).await;
        tracing::info!(order_number = %job.order_number, "inventory synced");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    synced: Vec<OrderNumber>,
    fail_on_sync: bool,
}

/// In-memory inventory sync service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventorySyncService {
    state: Arc<Mutex<InMemoryInventoryState>>,
}

impl InMemoryInventorySyncService {
    /// Creates a new in-memory inventory sync service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail every sync while set.
    pub fn set_fail_on_sync(&self, fail: bool) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_sync = fail;
    }

    /// Returns the order numbers synced so far.
    pub fn synced(&self) -> Vec<OrderNumber> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .synced
            .clone()
    }
}

#[async_trait]
impl InventorySyncService for InMemoryInventorySyncService {
    async fn sync_order(&self, job: &FulfillmentJob) -> Result<(), FulfillmentError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if state.fail_on_sync {
            return Err(FulfillmentError::InventorySync(
                "ERP unavailable".to_string(),
            ));
        }

        state.synced.push(job.order_number.clone());
        Ok(())
    }
}

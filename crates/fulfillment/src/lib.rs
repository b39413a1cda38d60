//! Post-commit order fulfillment.
//!
//! A committed order is handed to a [`WorkerPool`] as a [`FulfillmentJob`]
//! through a [`JobSubmitter`]. Each job runs two steps in sequence:
//! 1. Send the order confirmation
//! 2. Sync the order with the inventory system
//!
//! A failing step is logged and skipped. Jobs are never retried.

pub mod error;
pub mod job;
pub mod pool;
pub mod services;
mod worker;

pub use error::{FulfillmentError, Result};
pub use job::FulfillmentJob;
pub use pool::{DrainSummary, JobSubmitter, PoolConfig, WorkerPool};
pub use services::{
    InMemoryInventorySyncService, InMemoryNotificationService, InventorySyncService,
    NotificationService, SimulatedInventorySyncService, SimulatedNotificationService,
};

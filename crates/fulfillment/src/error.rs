//! Fulfillment error types.

use thiserror::Error;

/// Errors that can occur while handing off or running a fulfillment job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FulfillmentError {
    /// Sending the order confirmation failed.
    #[error("Notification failed: {0}")]
    Notification(String),

    /// Syncing the order with the inventory system failed.
    #[error("Inventory sync failed: {0}")]
    InventorySync(String),

    /// The pool has begun stopping and accepts no more jobs.
    #[error("Job queue is closed")]
    QueueClosed,
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;

//! Integrations called by fulfillment workers.

pub mod inventory;
pub mod notification;

pub use inventory::{
    InMemoryInventorySyncService, InventorySyncService, SimulatedInventorySyncService,
};
pub use notification::{
    InMemoryNotificationService, NotificationService, SimulatedNotificationService,
};

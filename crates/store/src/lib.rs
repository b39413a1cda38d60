//! Persistent store for the checkout platform.
//!
//! [`Store`] is the boundary every service talks to. Checkout runs its
//! read-check-write sequence inside a [`StoreTransaction`]; dropping a
//! transaction without calling [`StoreTransaction::commit`] discards all of
//! its writes.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{Store, StoreTransaction};

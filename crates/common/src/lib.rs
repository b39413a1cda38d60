//! Identifier types shared by every crate in the checkout platform.

pub mod types;

pub use types::{CartId, OrderId, ProductId, UserId};

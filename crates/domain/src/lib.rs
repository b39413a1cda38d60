//! Domain model for the checkout platform.
//!
//! This crate holds the plain data types shared by the store, the checkout
//! coordinator and the HTTP layer:
//! - [`Product`] and [`NewProduct`] for the catalog
//! - [`Cart`] and [`CartItem`] for a user's pending purchase
//! - [`Order`], [`OrderItem`], [`OrderStatus`] and [`OrderNumber`] for committed orders
//! - [`Money`] for exact amounts in cents

pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, CartItem, MAX_QUANTITY, validate_quantity};
pub use common::{CartId, OrderId, ProductId, UserId};
pub use error::DomainError;
pub use money::Money;
pub use order::{Order, OrderItem, OrderNumber, OrderNumberGenerator, OrderStatus};
pub use product::{NewProduct, Product};
pub use user::{User, validate_email};

//! Collaborator services around checkout: user identities, carts and the
//! product catalog with its read-through cache.

pub mod cache;
pub mod cart;
pub mod error;
pub mod service;
pub mod users;

pub use cache::{
    ALL_PRODUCTS_KEY, CacheError, CatalogCache, InMemoryCatalogCache, PRODUCT_LIST_TTL,
    RedisCatalogCache,
};
pub use cart::CartService;
pub use error::{CatalogError, Result};
pub use service::CatalogService;
pub use users::UserService;

use std::sync::Arc;

use common::ProductId;
use domain::{NewProduct, Product};
use store::Store;

use crate::cache::{ALL_PRODUCTS_KEY, CatalogCache, PRODUCT_LIST_TTL};
use crate::{CatalogError, Result};

/// Product catalog with a read-through cache on the full listing.
///
/// Writes go to the store first. The cached listing is then invalidated in
/// a spawned task whose outcome never affects the write.
pub struct CatalogService<S: Store> {
    store: S,
    cache: Arc<dyn CatalogCache>,
}

impl<S: Store> CatalogService<S> {
    /// Creates a new catalog service.
    pub fn new(store: S, cache: Arc<dyn CatalogCache>) -> Self {
        Self { store, cache }
    }

    /// Validates and stores a new product, then drops the cached listing.
    #[tracing::instrument(skip(self, product), fields(sku = %product.sku))]
    pub async fn create_product(&self, product: NewProduct) -> Result<Product> {
        product.validate()?;
        let product = self.store.create_product(product).await?;
        tracing::info!(product_id = %product.id, "product created");

        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            if let Err(e) = cache.delete(ALL_PRODUCTS_KEY).await {
                tracing::warn!(error = %e, "failed to invalidate product cache");
            }
        });

        Ok(product)
    }

    /// Lists all products, serving from the cache when possible.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        match self.cache.get(ALL_PRODUCTS_KEY).await {
            Ok(Some(cached)) => match serde_json::from_str::<Vec<Product>>(&cached) {
                Ok(products) => {
                    metrics::counter!("catalog_cache_hits_total").increment(1);
                    return Ok(products);
                }
                Err(e) => tracing::warn!(error = %e, "discarding undecodable product cache entry"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "product cache read failed"),
        }

        metrics::counter!("catalog_cache_misses_total").increment(1);
        let products = self.store.list_products().await?;

        match serde_json::to_string(&products) {
            Ok(encoded) => {
                if let Err(e) = self
                    .cache
                    .set(ALL_PRODUCTS_KEY, encoded, PRODUCT_LIST_TTL)
                    .await
                {
                    tracing::warn!(error = %e, "product cache write failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode product list"),
        }

        Ok(products)
    }

    /// Loads one product.
    pub async fn get_product(&self, product_id: ProductId) -> Result<Product> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or(CatalogError::ProductNotFound(product_id))
    }
}

//! HTTP API server for the checkout platform.
//!
//! Exposes users, the product catalog, carts and checkout under `/api/v1`,
//! with structured logging (tracing) and Prometheus metrics. The
//! [`lifecycle`] module wires everything together and owns shutdown.

pub mod auth;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use catalog::{CartService, CatalogCache, CatalogService, UserService};
use checkout::CheckoutService;
use fulfillment::JobSubmitter;
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::TokenKeys;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub users: UserService<S>,
    pub carts: CartService<S>,
    pub catalog: CatalogService<S>,
    pub checkout: CheckoutService<S>,
    pub tokens: TokenKeys,
}

impl<S: Store + Clone> AppState<S> {
    /// Builds every service on top of one store.
    pub fn new(
        store: S,
        cache: Arc<dyn CatalogCache>,
        jobs: JobSubmitter,
        tokens: TokenKeys,
    ) -> Self {
        Self {
            users: UserService::new(store.clone()),
            carts: CartService::new(store.clone()),
            catalog: CatalogService::new(store.clone(), cache),
            checkout: CheckoutService::new(store, jobs),
            tokens,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let v1 = Router::new()
        .route("/users", post(routes::users::register::<S>))
        .route(
            "/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route("/cart", get(routes::cart::get::<S>))
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::place::<S>),
        );

    Router::new()
        .route("/health", get(routes::health::check))
        .nest("/api/v1", v1)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

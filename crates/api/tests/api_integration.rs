//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::AppState;
use api::auth::TokenKeys;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use catalog::InMemoryCatalogCache;
use fulfillment::{
    InMemoryInventorySyncService, InMemoryNotificationService, PoolConfig, WorkerPool,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    pool: WorkerPool,
    notifier: InMemoryNotificationService,
}

fn setup() -> TestApp {
    let store = InMemoryStore::new();
    let notifier = InMemoryNotificationService::new();
    let pool = WorkerPool::start(
        PoolConfig {
            queue_capacity: 8,
            worker_count: 2,
        },
        Arc::new(notifier.clone()),
        Arc::new(InMemoryInventorySyncService::new()),
    );
    let state = Arc::new(AppState::new(
        store,
        Arc::new(InMemoryCatalogCache::new()),
        pool.submitter(),
        TokenKeys::new(b"test-secret"),
    ));
    let app = api::create_app(state, get_metrics_handle());

    TestApp {
        app,
        pool,
        notifier,
    }
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn register(app: &axum::Router, email: &str) -> String {
    let (status, json) = send(
        app,
        "POST",
        "/api/v1/users",
        None,
        Some(json!({ "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["token"].as_str().unwrap().to_string()
}

async fn create_product(
    app: &axum::Router,
    token: &str,
    sku: &str,
    price_cents: i64,
    stock: u32,
) -> String {
    let (status, json) = send(
        app,
        "POST",
        "/api/v1/products",
        Some(token),
        Some(json!({
            "name": format!("Product {sku}"),
            "sku": sku,
            "price_cents": price_cents,
            "stock": stock,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

async fn add_to_cart(app: &axum::Router, token: &str, product_id: &str, quantity: u32) -> Value {
    let (status, json) = send(
        app,
        "POST",
        "/api/v1/cart/items",
        Some(token),
        Some(json!({ "product_id": product_id, "quantity": quantity })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json
}

#[tokio::test]
async fn test_health_check() {
    let t = setup();

    let (status, json) = send(&t.app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = setup();

    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let t = setup();

    for (method, uri) in [
        ("GET", "/api/v1/orders"),
        ("POST", "/api/v1/orders"),
        ("GET", "/api/v1/cart"),
    ] {
        let (status, json) = send(&t.app, method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert!(json["error"].is_string());
    }

    let (status, _) = send(&t.app, "GET", "/api/v1/orders", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_products_are_public() {
    let t = setup();
    let token = register(&t.app, "admin@example.com").await;
    create_product(&t.app, &token, "SKU-1", 1999, 4).await;

    let (status, json) = send(&t.app, "GET", "/api/v1/products", None, None).await;

    assert_eq!(status, StatusCode::OK);
    let products = json["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["sku"], "SKU-1");
    assert_eq!(products[0]["price_cents"], 1999);
    assert_eq!(products[0]["price"], 19.99);
}

#[tokio::test]
async fn test_checkout_flow() {
    let t = setup();
    let token = register(&t.app, "ada@example.com").await;
    let product_id = create_product(&t.app, &token, "SKU-1", 1000, 5).await;

    let cart = add_to_cart(&t.app, &token, &product_id, 3).await;
    assert_eq!(cart["subtotal_cents"], 3000);

    let (status, json) = send(&t.app, "POST", "/api/v1/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["message"], "Order placed successfully");
    assert_eq!(json["total"], 30.0);
    assert_eq!(json["total_cents"], 3000);
    let order_number = json["order_number"].as_str().unwrap().to_string();
    assert!(order_number.starts_with("ORD-"));

    let (status, json) = send(&t.app, "GET", "/api/v1/cart", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["cart_id"].is_string());
    assert_eq!(json["items"].as_array().unwrap().len(), 0);

    let (_, json) = send(&t.app, "GET", "/api/v1/products", None, None).await;
    assert_eq!(json["products"][0]["stock"], 2);

    let (status, json) = send(&t.app, "GET", "/api/v1/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let orders = json["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["order_number"], order_number.as_str());
    assert_eq!(orders[0]["status"], "pending");
    assert_eq!(orders[0]["items"][0]["quantity"], 3);
    assert_eq!(orders[0]["items"][0]["unit_price_cents"], 1000);

    let summary = t.pool.stop().await;
    assert_eq!(summary.jobs_processed, 1);
    assert_eq!(t.notifier.sent_count(), 1);
}

#[tokio::test]
async fn test_orders_empty_for_new_user() {
    let t = setup();
    let token = register(&t.app, "new@example.com").await;

    let (status, json) = send(&t.app, "GET", "/api/v1/orders", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["orders"], json!([]));
}

#[tokio::test]
async fn test_checkout_rejections_are_bad_requests() {
    let t = setup();
    let token = register(&t.app, "ada@example.com").await;

    // No cart yet
    let (status, json) = send(&t.app, "POST", "/api/v1/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Cart not found");

    // Not enough stock
    let product_id = create_product(&t.app, &token, "SKU-1", 1000, 2).await;
    add_to_cart(&t.app, &token, &product_id, 3).await;
    let (status, json) = send(&t.app, "POST", "/api/v1/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Product SKU-1"));

    let (_, json) = send(&t.app, "GET", "/api/v1/products", None, None).await;
    assert_eq!(json["products"][0]["stock"], 2);
}

#[tokio::test]
async fn test_empty_cart_after_checkout_is_rejected() {
    let t = setup();
    let token = register(&t.app, "ada@example.com").await;
    let product_id = create_product(&t.app, &token, "SKU-1", 1000, 5).await;
    add_to_cart(&t.app, &token, &product_id, 1).await;

    let (status, _) = send(&t.app, "POST", "/api/v1/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send(&t.app, "POST", "/api/v1/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Cart is empty");
}

#[tokio::test]
async fn test_cart_validation() {
    let t = setup();
    let token = register(&t.app, "ada@example.com").await;
    let product_id = create_product(&t.app, &token, "SKU-1", 1000, 5).await;

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/v1/cart/items",
        Some(&token),
        Some(json!({ "product_id": product_id, "quantity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &t.app,
        "POST",
        "/api/v1/cart/items",
        Some(&token),
        Some(json!({ "product_id": product_id, "quantity": 3_000_000_000u32 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Invalid quantity"));

    add_to_cart(&t.app, &token, &product_id, i32::MAX as u32).await;
    let (status, json) = send(
        &t.app,
        "POST",
        "/api/v1/cart/items",
        Some(&token),
        Some(json!({ "product_id": product_id, "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Cart line"));

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/v1/cart/items",
        Some(&token),
        Some(json!({ "product_id": "not-a-uuid", "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/v1/cart/items",
        Some(&token),
        Some(json!({ "product_id": uuid::Uuid::new_v4().to_string(), "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_sku_and_email_conflict() {
    let t = setup();
    let token = register(&t.app, "ada@example.com").await;
    create_product(&t.app, &token, "SKU-1", 1000, 5).await;

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/v1/products",
        Some(&token),
        Some(json!({ "name": "Again", "sku": "SKU-1", "price_cents": 1, "stock": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/v1/users",
        None,
        Some(json!({ "email": "ada@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_product_is_rejected() {
    let t = setup();
    let token = register(&t.app, "ada@example.com").await;

    let (status, json) = send(
        &t.app,
        "POST",
        "/api/v1/products",
        Some(&token),
        Some(json!({ "name": "", "sku": "SKU-1", "price_cents": 100, "stock": 1 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn test_overflowing_order_total_is_rejected() {
    let t = setup();
    let token = register(&t.app, "whale@example.com").await;
    let product_id = create_product(&t.app, &token, "SKU-HUGE", i64::MAX / 2, 3).await;

    let cart = add_to_cart(&t.app, &token, &product_id, 3).await;
    assert_eq!(cart["subtotal_cents"], Value::Null);
    assert_eq!(cart["items"][0]["line_total_cents"], Value::Null);

    let (status, json) = send(&t.app, "POST", "/api/v1/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("out of range"));

    let (_, json) = send(&t.app, "GET", "/api/v1/products", None, None).await;
    assert_eq!(json["products"][0]["stock"], 3);
    let (_, json) = send(&t.app, "GET", "/api/v1/orders", Some(&token), None).await;
    assert_eq!(json["orders"], json!([]));
}

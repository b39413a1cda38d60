//! End-to-end startup and shutdown of the server process.

use std::net::SocketAddr;
use std::time::Duration;

use api::config::Config;
use api::lifecycle::{Lifecycle, LifecycleState};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

fn config_with_latency(latency_ms: u64) -> Config {
    Config::from_lookup(|key| match key {
        "HOST" => Some("127.0.0.1".to_string()),
        "PORT" => Some("0".to_string()),
        "SHUTDOWN_GRACE_SECS" => Some("2".to_string()),
        "NOTIFICATION_LATENCY_MS" | "INVENTORY_SYNC_LATENCY_MS" => Some(latency_ms.to_string()),
        _ => None,
    })
}

fn test_config() -> Config {
    config_with_latency(0)
}

/// Sends one request over a fresh connection and returns the status code
/// and the JSON body.
async fn send_json(
    addr: SocketAddr,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (u16, Value) {
    let body = body.map(|b| b.to_string()).unwrap_or_default();
    let mut request = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    if let Some(token) = token {
        request.push_str(&format!("Authorization: Bearer {token}\r\n"));
    }
    request.push_str(&format!(
        "Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    ));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    let (head, payload) = response.split_once("\r\n\r\n").unwrap();
    let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
    let json = serde_json::from_str(payload).unwrap_or(Value::Null);
    (status, json)
}

async fn get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_serves_until_shutdown_then_stops() {
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let lifecycle = Lifecycle::new(test_config(), handle);
    let mut state = lifecycle.subscribe();
    let mut addr = lifecycle.local_addr();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let running = tokio::spawn(lifecycle.run(async {
        let _ = shutdown_rx.await;
    }));

    tokio::time::timeout(Duration::from_secs(5), addr.wait_for(Option::is_some))
        .await
        .unwrap()
        .unwrap();
    let addr = addr.borrow().unwrap();
    state
        .wait_for(|s| *s == LifecycleState::Running)
        .await
        .unwrap();

    let response = get(addr, "/health").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains(r#"{"status":"ok"}"#));

    shutdown_tx.send(()).unwrap();
    let report = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(report.jobs_processed, 0);
    assert_eq!(*state.borrow(), LifecycleState::Stopped);
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let config = Config::from_lookup(|key| match key {
        "HOST" => Some("127.0.0.1".to_string()),
        "PORT" => Some(port.to_string()),
        _ => None,
    });
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let lifecycle = Lifecycle::new(config, handle);
    let state = lifecycle.subscribe();

    let result = lifecycle.run(std::future::pending()).await;

    assert!(matches!(
        result,
        Err(api::lifecycle::LifecycleError::Bind { .. })
    ));
    assert_eq!(*state.borrow(), LifecycleState::Stopped);
}

#[tokio::test]
async fn test_accepted_jobs_are_drained_before_stopping() {
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let lifecycle = Lifecycle::new(config_with_latency(200), handle);
    let mut addr = lifecycle.local_addr();

    let mut states = lifecycle.subscribe();
    let observed = tokio::spawn(async move {
        let mut seen = vec![*states.borrow_and_update()];
        while states.changed().await.is_ok() {
            seen.push(*states.borrow_and_update());
        }
        seen
    });

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let running = tokio::spawn(lifecycle.run(async {
        let _ = shutdown_rx.await;
    }));

    tokio::time::timeout(Duration::from_secs(5), addr.wait_for(Option::is_some))
        .await
        .unwrap()
        .unwrap();
    let addr = addr.borrow().unwrap();

    let (status, user) = send_json(
        addr,
        "POST",
        "/api/v1/users",
        None,
        Some(json!({ "email": "ada@example.com" })),
    )
    .await;
    assert_eq!(status, 201);
    let token = user["token"].as_str().unwrap().to_string();

    let (status, product) = send_json(
        addr,
        "POST",
        "/api/v1/products",
        Some(&token),
        Some(json!({ "name": "Widget", "sku": "SKU-1", "price_cents": 1000, "stock": 5 })),
    )
    .await;
    assert_eq!(status, 201);
    let product_id = product["id"].as_str().unwrap().to_string();

    let (status, _) = send_json(
        addr,
        "POST",
        "/api/v1/cart/items",
        Some(&token),
        Some(json!({ "product_id": product_id, "quantity": 2 })),
    )
    .await;
    assert_eq!(status, 200);

    let (status, order) = send_json(addr, "POST", "/api/v1/orders", Some(&token), None).await;
    assert_eq!(status, 201);
    assert_eq!(order["total_cents"], 2000);

    // The job is still in flight under the simulated latency.
    shutdown_tx.send(()).unwrap();
    let report = tokio::time::timeout(Duration::from_secs(10), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(report.jobs_processed, 1);

    let seen = observed.await.unwrap();
    assert_eq!(seen.last(), Some(&LifecycleState::Stopped));
    let running_at = seen
        .iter()
        .position(|s| *s == LifecycleState::Running)
        .unwrap();
    let draining_at = seen
        .iter()
        .position(|s| *s == LifecycleState::Draining)
        .unwrap();
    assert!(running_at < draining_at, "{seen:?}");
}

//! HTTP transport integration tests.
//!
//! Starts an axum server and exercises it with reqwest.

use std::sync::Arc;
use std::time::Duration;

use keyed_lock::service;
use keyed_lock::InMemoryLeaseStore;

use crate::support::{test_state, TestState};

/// Bind to port 0 and return the actual address.
async fn start_server(state: Arc<TestState>) -> String {
    let app = service::router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn put_then_get() {
    let store = InMemoryLeaseStore::new();
    let base = start_server(test_state(&store, Duration::from_secs(5))).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/k/hello/0")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["text"], "hello");
    assert_eq!(body["count"], 1);

    let resp = client.get(format!("{base}/k")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["text"], "hello");
}

#[tokio::test]
async fn get_missing_is_null() {
    let store = InMemoryLeaseStore::new();
    let base = start_server(test_state(&store, Duration::from_secs(5))).await;

    let resp = reqwest::get(format!("{base}/nothing")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body.is_null());
}

#[tokio::test]
async fn second_message_does_not_overwrite() {
    let store = InMemoryLeaseStore::new();
    let base = start_server(test_state(&store, Duration::from_secs(5))).await;
    let client = reqwest::Client::new();

    client.get(format!("{base}/k/first/0")).send().await.unwrap();
    let resp = client.get(format!("{base}/k/second/0")).send().await.unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["text"], "first");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn contended_key_returns_conflict() {
    let store = InMemoryLeaseStore::new();
    // Two "processes" over one lease store; the second gives up quickly.
    let slow = start_server(test_state(&store, Duration::from_secs(5))).await;
    let impatient = start_server(test_state(&store, Duration::from_millis(50))).await;
    let client = reqwest::Client::new();

    let holder = tokio::spawn({
        let client = client.clone();
        async move { client.get(format!("{slow}/k/slow/500")).send().await.unwrap() }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let resp = client
        .get(format!("{impatient}/k/fast/0"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Cannot acquire lock for key: k");

    assert_eq!(holder.await.unwrap().status(), 200);
}

#[tokio::test]
async fn store_outage_returns_service_unavailable() {
    let store = InMemoryLeaseStore::new();
    let base = start_server(test_state(&store, Duration::from_millis(50))).await;
    store.set_available(false);

    let resp = reqwest::get(format!("{base}/k/hello/0")).await.unwrap();
    assert_eq!(resp.status(), 503);
}

//! Router contract tests driven with `tower::ServiceExt::oneshot`.
//!
//! # Test Strategy
//!
//! 1. **Lock service**: 200/409/404 contract and JSON shapes
//! 2. **Ephemeral service**: create/owner/delete round trip, 400 on bad path
//! 3. **Ring service**: membership + cache entry endpoints end to end
//! 4. **Cache-node service**: the per-node wire surface

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use coordination::{EphemeralNodeManager, LockManager};
use corelib::{CacheNode, HashRing, LocalProvisioner};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn send_get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::String(
        String::from_utf8_lossy(&bytes).into_owned(),
    ));
    (status, body)
}

// ============================================================================
// Lock service
// ============================================================================

#[tokio::test]
async fn test_lock_contention_over_http() {
    let app = services::lock_api::router(Arc::new(LockManager::new()));

    let acquire = json!({ "key": "resource_lock", "client_id": "client_1", "expiry": 10 });
    let (status, body) = send_json(&app, "POST", "/acquire_lock", acquire).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lock_key"], "resource_lock");
    assert_eq!(body["lock_status"], "locked");

    // A second client gets a conflict while the lock is live.
    let contender = json!({ "key": "resource_lock", "client_id": "client_2", "expiry": 10 });
    let (status, body) = send_json(&app, "POST", "/acquire_lock", contender.clone()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "error");

    let release = json!({ "key": "resource_lock", "client_id": "client_1" });
    let (status, _) = send_json(&app, "POST", "/release_lock", release).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(&app, "POST", "/acquire_lock", contender).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_lock_status_and_enumeration() {
    let app = services::lock_api::router(Arc::new(LockManager::new()));
    let acquire = json!({ "key": "t1", "client_id": "client_1", "expiry": 10 });
    send_json(&app, "POST", "/acquire_lock", acquire).await;

    let (status, body) = send_get(&app, "/lock_status/t1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lock_status"], "locked");
    assert_eq!(body["client_id"], "client_1");

    let (status, _) = send_get(&app, "/lock_status/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send_get(&app, "/all_locks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["locks"]["t1"], "locked");
}

#[tokio::test]
async fn test_release_requires_ownership() {
    let app = services::lock_api::router(Arc::new(LockManager::new()));
    let acquire = json!({ "key": "t1", "client_id": "client_1", "expiry": 10 });
    send_json(&app, "POST", "/acquire_lock", acquire).await;

    let foreign = json!({ "key": "t1", "client_id": "client_2" });
    let (status, _) = send_json(&app, "POST", "/release_lock", foreign).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The lock is still held by its owner.
    let (status, body) = send_get(&app, "/lock_status/t1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client_id"], "client_1");
}

// ============================================================================
// Ephemeral-node service
// ============================================================================

#[tokio::test]
async fn test_ephemeral_round_trip() {
    let app = services::ephemeral_api::router(Arc::new(EphemeralNodeManager::new()));

    let create = json!({ "path": "/locks/t1", "client_id": "client_1", "expiry": 30 });
    let (status, body) = send_json(&app, "POST", "/create_node", create).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["node_path"], "/locks/t1/0");

    let create = json!({ "path": "/locks/t1", "client_id": "client_2", "expiry": 30 });
    let (status, body) = send_json(&app, "POST", "/create_node", create).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["node_path"], "/locks/t1/1");

    let (status, body) = send_get(&app, "/current_lock_owner?path=/locks/t1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_lock_owner"], "client_1");

    let (status, body) = send_get(&app, "/node_status/locks/t1/0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client_id"], "client_1");

    let delete = json!({ "path": "/locks/t1/0" });
    let (status, _) = send_json(&app, "POST", "/delete_node", delete).await;
    assert_eq!(status, StatusCode::OK);

    // Ownership handed off to the queued client.
    let (status, body) = send_get(&app, "/current_lock_owner?path=/locks/t1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_lock_owner"], "client_2");
}

#[tokio::test]
async fn test_ephemeral_error_contract() {
    let app = services::ephemeral_api::router(Arc::new(EphemeralNodeManager::new()));

    let create = json!({ "path": "", "client_id": "client_1", "expiry": 30 });
    let (status, _) = send_json(&app, "POST", "/create_node", create).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let delete = json!({ "path": "/missing/0" });
    let (status, _) = send_json(&app, "POST", "/delete_node", delete).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_get(&app, "/current_lock_owner?path=/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Ring service
// ============================================================================

fn ring_app() -> Router {
    let ring = HashRing::with_servers(
        2,
        Arc::new(LocalProvisioner::new(3)),
        ["svr1", "svr2"],
    )
    .unwrap();
    services::ring_api::router(Arc::new(ring))
}

#[tokio::test]
async fn test_ring_cache_entry_round_trip() {
    let app = ring_app();

    let put = json!({ "key": "key1", "value": "value1" });
    let (status, _) = send_json(&app, "POST", "/put_cache_entry", put).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_get(&app, "/get_cache_entry/key1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("value1".into()));

    let (status, _) = send_get(&app, "/get_cache_entry/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ring_membership_endpoints() {
    let app = ring_app();

    let (status, body) = send_get(&app, "/get_servers").await;
    assert_eq!(status, StatusCode::OK);
    let servers = body["servers"].as_array().unwrap();
    assert_eq!(servers.len(), 2);
    assert_eq!(servers[0]["virtual_nodes"].as_array().unwrap().len(), 2);

    let (status, _) = send_json(&app, "POST", "/add_server", json!({ "server": "svr3" })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) =
        send_json(&app, "POST", "/remove_server", json!({ "server": "ghost" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(&app, "POST", "/add_server", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ring_put_requires_key_and_value() {
    let app = ring_app();
    let (status, _) =
        send_json(&app, "POST", "/put_cache_entry", json!({ "key": "key1" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Cache-node service
// ============================================================================

#[tokio::test]
async fn test_cache_node_surface() {
    let app = services::cache_api::router(Arc::new(CacheNode::new(1, 3)));

    let (status, body) = send_get(&app, "/get_cache_size").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cache_size"], 0);

    let put = json!({ "key": "key1", "value": "value1" });
    let (status, _) = send_json(&app, "POST", "/put_entry", put).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_get(&app, "/get_entry/key1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["key"], "key1");
    assert_eq!(body["value"], "value1");

    let (status, _) = send_get(&app, "/get_entry/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send_get(&app, "/get_cache_size").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cache_size"], 1);
}

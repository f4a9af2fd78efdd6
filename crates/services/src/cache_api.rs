//! HTTP surface for a single cache node process.
//!
//! One process per node; the ring service forwards entries here in remote
//! mode. Started with `instance_no cache_size` arguments.

use crate::config::CacheNodeConfig;
use crate::error::ApiError;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use corelib::{CacheNode, CacheStore};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Deserialize)]
struct PutEntryRequest {
    key: Option<String>,
    value: Option<String>,
}

/// Build the cache-node router over a shared node.
pub fn router(node: Arc<CacheNode>) -> Router {
    Router::new()
        .route("/get_cache_size", get(get_cache_size))
        .route("/put_entry", post(put_entry))
        .route("/get_entry/:key", get(get_entry))
        .with_state(node)
}

/// Run one cache node until shutdown.
pub async fn run(config: CacheNodeConfig) -> anyhow::Result<()> {
    let node = Arc::new(CacheNode::new(config.instance_no, config.cache_size));
    let app = router(node).layer(TraceLayer::new_for_http());
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(
        addr = %config.bind_addr,
        instance_no = %config.instance_no,
        cache_size = config.cache_size,
        "cache node listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(crate::shutdown_signal())
        .await?;
    Ok(())
}

async fn get_cache_size(
    State(node): State<Arc<CacheNode>>,
) -> Result<impl IntoResponse, ApiError> {
    let size = node.len().await?;
    Ok(Json(json!({ "cache_size": size })))
}

async fn put_entry(
    State(node): State<Arc<CacheNode>>,
    Json(req): Json<PutEntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (key, value) = match (req.key, req.value) {
        (Some(key), Some(value)) => (key, value),
        _ => {
            return Err(ApiError::InvalidArgument(
                "Key and Value must be provided.".into(),
            ))
        }
    };
    node.put(&key, &value).await?;
    Ok(format!("Entry for key {} added/updated.", key))
}

async fn get_entry(
    State(node): State<Arc<CacheNode>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match node.get(&key).await? {
        Some(value) => Ok(Json(json!({ "key": key, "value": value }))),
        None => Err(ApiError::NotFound(format!(
            "Key {} not found in cache",
            key
        ))),
    }
}

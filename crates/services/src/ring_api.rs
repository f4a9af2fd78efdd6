//! HTTP surface for the consistent-hashing ring.
//!
//! Server membership endpoints are meant for monitoring programs that grow
//! and shrink the ring with load; clients only use the cache-entry endpoints.

use crate::config::RingServiceConfig;
use crate::error::ApiError;
use crate::remote::RemoteProvisioner;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use corelib::{HashRing, LocalProvisioner, NodeProvisioner};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Deserialize)]
struct ServerRequest {
    server: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PutCacheEntryRequest {
    key: Option<String>,
    value: Option<String>,
}

/// Build the ring service router over a shared ring.
pub fn router(ring: Arc<HashRing>) -> Router {
    Router::new()
        .route("/add_server", post(add_server))
        .route("/remove_server", post(remove_server))
        .route("/get_servers", get(get_servers))
        .route("/put_cache_entry", post(put_cache_entry))
        .route("/get_cache_entry/:key", get(get_cache_entry))
        .with_state(ring)
}

/// Run the ring service until shutdown.
pub async fn run(config: RingServiceConfig) -> anyhow::Result<()> {
    let provisioner: Arc<dyn NodeProvisioner> = if config.run_mode_local {
        Arc::new(LocalProvisioner::new(config.cache_size))
    } else {
        Arc::new(RemoteProvisioner::new(config.cache_base_url.clone(), 5000))
    };
    let ring = Arc::new(HashRing::with_servers(
        config.replication_factor,
        provisioner,
        &config.servers,
    )?);

    let app = router(ring).layer(TraceLayer::new_for_http());
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, local = config.run_mode_local, "ring service listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(crate::shutdown_signal())
        .await?;
    Ok(())
}

async fn add_server(
    State(ring): State<Arc<HashRing>>,
    Json(req): Json<ServerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let server = req
        .server
        .ok_or_else(|| ApiError::InvalidArgument("server parameter is required".into()))?;
    info!(server, "received request to add server");
    ring.add_server(&server)?;
    Ok(format!("Server {} added to the hash ring.", server))
}

async fn remove_server(
    State(ring): State<Arc<HashRing>>,
    Json(req): Json<ServerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let server = req
        .server
        .ok_or_else(|| ApiError::InvalidArgument("server parameter is required".into()))?;
    info!(server, "received request to remove server");
    if ring.remove_server(&server) {
        Ok(format!("Server {} removed from the hash ring.", server))
    } else {
        Err(ApiError::NotFound(format!(
            "Server {} not found in the hash ring.",
            server
        )))
    }
}

async fn get_servers(State(ring): State<Arc<HashRing>>) -> impl IntoResponse {
    Json(json!({ "servers": ring.servers() }))
}

async fn put_cache_entry(
    State(ring): State<Arc<HashRing>>,
    Json(req): Json<PutCacheEntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (key, value) = match (req.key, req.value) {
        (Some(key), Some(value)) => (key, value),
        _ => {
            return Err(ApiError::InvalidArgument(
                "Key and Value must be provided.".into(),
            ))
        }
    };
    info!(key, "received request to put cache entry");
    ring.put_entry(&key, &value).await?;
    Ok(format!("Cache entry for key {} added.", key))
}

async fn get_cache_entry(
    State(ring): State<Arc<HashRing>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!(key, "received request to get cache entry");
    match ring.get_entry(&key).await? {
        Some(value) => Ok((StatusCode::OK, value)),
        None => Err(ApiError::NotFound(format!(
            "Key {} not found in cache.",
            key
        ))),
    }
}

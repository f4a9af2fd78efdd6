//! HTTP surface for the ephemeral-node service.

use crate::config::EphemeralServiceConfig;
use crate::error::ApiError;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use coordination::{EphemeralNodeManager, ExpiryCleaner, ExpirySweep};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Deserialize)]
struct CreateNodeRequest {
    path: Option<String>,
    client_id: Option<String>,
    expiry: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DeleteNodeRequest {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwnerQuery {
    path: Option<String>,
}

/// Build the ephemeral-node service router over a shared manager.
pub fn router(manager: Arc<EphemeralNodeManager>) -> Router {
    Router::new()
        .route("/create_node", post(create_node))
        .route("/delete_node", post(delete_node))
        .route("/node_status/*path", get(node_status))
        .route("/all_nodes", get(all_nodes))
        .route("/current_lock_owner", get(current_lock_owner))
        .with_state(manager)
}

/// Run the ephemeral-node service (with its expiry cleaner) until shutdown.
pub async fn run(config: EphemeralServiceConfig) -> anyhow::Result<()> {
    let manager = Arc::new(EphemeralNodeManager::new());
    let mut cleaner = ExpiryCleaner::start(
        Arc::clone(&manager) as Arc<dyn ExpirySweep>,
        config.cleanup_interval,
    );

    let app = router(manager).layer(TraceLayer::new_for_http());
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "ephemeral-node service listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(crate::shutdown_signal())
        .await?;

    cleaner.stop();
    Ok(())
}

async fn create_node(
    State(manager): State<Arc<EphemeralNodeManager>>,
    Json(req): Json<CreateNodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (path, client_id, expiry) = match (req.path, req.client_id, req.expiry) {
        (Some(path), Some(client_id), Some(expiry)) => (path, client_id, expiry),
        _ => {
            return Err(ApiError::InvalidArgument(
                "path, client_id and expiry must be provided.".into(),
            ))
        }
    };
    info!(path, client_id, "received request to create node");
    let node_path = manager.create(&path, &client_id, Duration::from_secs(expiry))?;
    Ok(Json(json!({
        "status": "success",
        "node_path": node_path,
        "client_id": client_id,
    })))
}

async fn delete_node(
    State(manager): State<Arc<EphemeralNodeManager>>,
    Json(req): Json<DeleteNodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let path = req
        .path
        .ok_or_else(|| ApiError::InvalidArgument("path must be provided.".into()))?;
    info!(path, "received request to delete node");
    if manager.delete(&path) {
        Ok(Json(json!({
            "status": "success",
            "message": format!("Node at path {} deleted.", path),
        })))
    } else {
        Err(ApiError::NotFound(format!(
            "Node at path {} not found.",
            path
        )))
    }
}

/// Wildcard route: the captured tail arrives without its leading slash, so
/// `/node_status/locks/t1/0` looks up the node at `/locks/t1/0`.
async fn node_status(
    State(manager): State<Arc<EphemeralNodeManager>>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let path = if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    };
    match manager.get(&path) {
        Some(node) => Ok(Json(json!({
            "status": "success",
            "node_path": node.path(),
            "client_id": node.client_id(),
        }))),
        None => Err(ApiError::NotFound(format!(
            "Node at path {} not found.",
            path
        ))),
    }
}

async fn all_nodes(State(manager): State<Arc<EphemeralNodeManager>>) -> impl IntoResponse {
    let nodes: HashMap<String, Option<String>> = manager
        .nodes()
        .into_iter()
        .map(|node| {
            (
                node.path().to_string(),
                node.client_id().map(str::to_string),
            )
        })
        .collect();
    Json(json!({ "status": "success", "nodes": nodes }))
}

async fn current_lock_owner(
    State(manager): State<Arc<EphemeralNodeManager>>,
    Query(query): Query<OwnerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let path = query
        .path
        .ok_or_else(|| ApiError::InvalidArgument("path parameter is required.".into()))?;
    match manager.owner(&path) {
        Some(owner) => Ok(Json(json!({
            "status": "success",
            "current_lock_owner": owner,
        }))),
        None => Err(ApiError::NotFound(format!(
            "No lock owner found for path {}.",
            path
        ))),
    }
}

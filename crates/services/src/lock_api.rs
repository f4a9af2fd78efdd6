//! HTTP surface for the named-lock service.

use crate::config::LockServiceConfig;
use crate::error::ApiError;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use coordination::{ExpiryCleaner, ExpirySweep, LockManager};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Deserialize)]
struct AcquireLockRequest {
    key: Option<String>,
    client_id: Option<String>,
    expiry: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ReleaseLockRequest {
    key: Option<String>,
    client_id: Option<String>,
}

/// Build the lock service router over a shared manager.
pub fn router(manager: Arc<LockManager>) -> Router {
    Router::new()
        .route("/acquire_lock", post(acquire_lock))
        .route("/release_lock", post(release_lock))
        .route("/lock_status/:key", get(lock_status))
        .route("/all_locks", get(all_locks))
        .with_state(manager)
}

/// Run the lock service (with its expiry cleaner) until shutdown.
pub async fn run(config: LockServiceConfig) -> anyhow::Result<()> {
    let manager = Arc::new(LockManager::new());
    let mut cleaner = ExpiryCleaner::start(
        Arc::clone(&manager) as Arc<dyn ExpirySweep>,
        config.cleanup_interval,
    );

    let app = router(manager).layer(TraceLayer::new_for_http());
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "lock service listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(crate::shutdown_signal())
        .await?;

    cleaner.stop();
    Ok(())
}

async fn acquire_lock(
    State(manager): State<Arc<LockManager>>,
    Json(req): Json<AcquireLockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (key, client_id, expiry) = match (req.key, req.client_id, req.expiry) {
        (Some(key), Some(client_id), Some(expiry)) => (key, client_id, expiry),
        _ => {
            return Err(ApiError::InvalidArgument(
                "key, client_id and expiry must be provided.".into(),
            ))
        }
    };
    let status = manager.acquire(&key, &client_id, Duration::from_secs(expiry))?;
    Ok(Json(json!({
        "status": "success",
        "lock_key": key,
        "lock_status": status,
    })))
}

async fn release_lock(
    State(manager): State<Arc<LockManager>>,
    Json(req): Json<ReleaseLockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (key, client_id) = match (req.key, req.client_id) {
        (Some(key), Some(client_id)) => (key, client_id),
        _ => {
            return Err(ApiError::InvalidArgument(
                "key and client_id must be provided.".into(),
            ))
        }
    };
    if manager.release(&key, &client_id) {
        Ok(Json(json!({
            "status": "success",
            "message": format!("Lock with key {} released.", key),
        })))
    } else {
        Err(ApiError::NotFound(format!(
            "Lock with key {} not found.",
            key
        )))
    }
}

async fn lock_status(
    State(manager): State<Arc<LockManager>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match manager.status(&key) {
        Some((status, client_id)) => Ok(Json(json!({
            "status": "success",
            "lock_key": key,
            "lock_status": status,
            "client_id": client_id,
        }))),
        None => Err(ApiError::NotFound(format!(
            "Lock with key {} not found.",
            key
        ))),
    }
}

async fn all_locks(State(manager): State<Arc<LockManager>>) -> impl IntoResponse {
    Json(json!({ "status": "success", "locks": manager.locks() }))
}

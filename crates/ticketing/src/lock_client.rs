//! Client side of the locking contract.
//!
//! The ticketing service never mutates a ticket without holding the named
//! lock for it. The HTTP implementation talks to the lock service; tests
//! drive the same trait against an in-process manager.

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Client view of the named-lock service.
#[async_trait]
pub trait LockClient: Send + Sync {
    /// Try to take the lock for `key`; `false` when another client holds it.
    async fn acquire(&self, key: &str, client_id: &str, ttl: Duration) -> Result<bool>;

    /// Whether `client_id` currently holds a live lock on `key`.
    async fn holds(&self, key: &str, client_id: &str) -> Result<bool>;
}

#[derive(Debug, Serialize)]
struct AcquireLockRequest<'a> {
    key: &'a str,
    client_id: &'a str,
    expiry: u64,
}

#[derive(Debug, Deserialize)]
struct LockStatusResponse {
    lock_status: String,
    client_id: String,
}

/// HTTP client for the lock service.
pub struct HttpLockClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpLockClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LockClient for HttpLockClient {
    async fn acquire(&self, key: &str, client_id: &str, ttl: Duration) -> Result<bool> {
        let url = format!("{}/acquire_lock", self.base_url);
        debug!(key, client_id, "requesting lock");
        let response = self
            .client
            .post(&url)
            .json(&AcquireLockRequest {
                key,
                client_id,
                expiry: ttl.as_secs(),
            })
            .send()
            .await
            .map_err(|err| Error::LockService(err.to_string()))?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::CONFLICT => Ok(false),
            status => Err(Error::LockService(format!(
                "lock service replied {} to acquire",
                status
            ))),
        }
    }

    async fn holds(&self, key: &str, client_id: &str) -> Result<bool> {
        let url = format!("{}/lock_status/{}", self.base_url, key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| Error::LockService(err.to_string()))?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => {
                let body: LockStatusResponse = response
                    .json()
                    .await
                    .map_err(|err| Error::LockService(err.to_string()))?;
                Ok(body.lock_status == "locked" && body.client_id == client_id)
            }
            status => Err(Error::LockService(format!(
                "lock service replied {} to status",
                status
            ))),
        }
    }
}

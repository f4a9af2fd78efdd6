//! Out-of-process cache nodes.
//!
//! In remote mode the ring's parent handles are endpoint descriptors rather
//! than in-process stores: put/get are forwarded to a cache-node process over
//! HTTP with JSON bodies. A failed call is reported to the caller as a
//! put/get failure; it never removes the server from the ring.

use async_trait::async_trait;
use corelib::error::{Error, Result};
use corelib::store::{CacheStore, NodeProvisioner};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Debug, Serialize)]
struct PutEntryRequest<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Debug, Deserialize)]
struct GetEntryResponse {
    value: String,
}

#[derive(Debug, Deserialize)]
struct CacheSizeResponse {
    cache_size: usize,
}

/// Endpoint descriptor for a cache-node process, usable wherever an
/// in-process node is.
pub struct RemoteCacheNode {
    base_url: String,
    instance_no: u128,
    client: reqwest::Client,
}

impl RemoteCacheNode {
    pub fn new(base_url: impl Into<String>, instance_no: u128) -> Self {
        Self {
            base_url: base_url.into(),
            instance_no,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CacheStore for RemoteCacheNode {
    fn instance_no(&self) -> u128 {
        self.instance_no
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let url = format!("{}/put_entry", self.base_url);
        debug!(url = %url, key, "forwarding put to cache node");
        let response = self
            .client
            .post(&url)
            .json(&PutEntryRequest { key, value })
            .send()
            .await
            .map_err(|err| {
                error!(key, %err, "put forwarding failed");
                Error::Backend(err.to_string())
            })?;
        if !response.status().is_success() {
            return Err(Error::Backend(format!(
                "cache node replied {} to put",
                response.status()
            )));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let url = format!("{}/get_entry/{}", self.base_url, key);
        debug!(url = %url, key, "forwarding get to cache node");
        let response = self.client.get(&url).send().await.map_err(|err| {
            error!(key, %err, "get forwarding failed");
            Error::Backend(err.to_string())
        })?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: GetEntryResponse = response
                    .json()
                    .await
                    .map_err(|err| Error::Backend(err.to_string()))?;
                Ok(Some(body.value))
            }
            status => Err(Error::Backend(format!(
                "cache node replied {} to get",
                status
            ))),
        }
    }

    async fn len(&self) -> Result<usize> {
        let url = format!("{}/get_cache_size", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| Error::Backend(err.to_string()))?;
        let body: CacheSizeResponse = response
            .json()
            .await
            .map_err(|err| Error::Backend(err.to_string()))?;
        Ok(body.cache_size)
    }
}

/// Hands out endpoint descriptors with sequentially assigned ports.
///
/// Starting the node processes themselves (containers, supervisors) is
/// outside this crate; the provisioner only records where each node is
/// expected to listen.
pub struct RemoteProvisioner {
    base_url: String,
    next_port: AtomicU16,
}

impl RemoteProvisioner {
    /// `base_url` without a port, e.g. `http://0.0.0.0`. Ports are assigned
    /// from `port_base + 1` upward, one per provisioned server.
    pub fn new(base_url: impl Into<String>, port_base: u16) -> Self {
        Self {
            base_url: base_url.into(),
            next_port: AtomicU16::new(port_base + 1),
        }
    }
}

impl NodeProvisioner for RemoteProvisioner {
    fn provision(&self, server: &str, instance_no: u128) -> Result<Arc<dyn CacheStore>> {
        let port = self.next_port.fetch_add(1, Ordering::SeqCst);
        let endpoint = format!("{}:{}", self.base_url, port);
        debug!(server, endpoint = %endpoint, "provisioning remote cache node");
        Ok(Arc::new(RemoteCacheNode::new(endpoint, instance_no)))
    }
}

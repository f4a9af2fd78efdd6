//! Backing-store seams for the ring.
//!
//! The ring routes to a `CacheStore` without caring whether the store is an
//! in-process [`crate::cache::CacheNode`] or a remote endpoint reached over
//! HTTP. `NodeProvisioner` is the membership-side seam: it produces the
//! backing store for a server when that server joins the ring.

use crate::cache::CacheNode;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A key/value store a ring parent token can route to.
///
/// Remote implementations perform a network round-trip, hence the async
/// surface; the in-process node completes immediately.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Identity of the backing node (the parent token value on the ring).
    fn instance_no(&self) -> u128;

    /// Store `value` under `key`.
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Fetch the value under `key`. `Ok(None)` means the key is not cached.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Current number of cached entries.
    async fn len(&self) -> Result<usize>;
}

/// Produces the backing store for a server joining the ring.
///
/// This is where deployment mode lives: the local provisioner builds
/// in-process nodes, while an out-of-process provisioner hands out endpoint
/// descriptors for externally managed node processes.
pub trait NodeProvisioner: Send + Sync {
    fn provision(&self, server: &str, instance_no: u128) -> Result<Arc<dyn CacheStore>>;
}

/// Provisioner for in-process cache nodes.
#[derive(Debug, Clone)]
pub struct LocalProvisioner {
    cache_size: usize,
}

impl LocalProvisioner {
    pub fn new(cache_size: usize) -> Self {
        Self { cache_size }
    }
}

impl NodeProvisioner for LocalProvisioner {
    fn provision(&self, _server: &str, instance_no: u128) -> Result<Arc<dyn CacheStore>> {
        Ok(Arc::new(CacheNode::new(instance_no, self.cache_size)))
    }
}

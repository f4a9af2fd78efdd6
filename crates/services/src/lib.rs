//! HTTP services for the coordination + caching kit.
//!
//! Four thin axum surfaces over the core crates:
//! - the ring service (consistent-hash routed caching)
//! - the cache-node service (one process per node in remote mode)
//! - the named-lock service
//! - the ephemeral-node service
//!
//! Each `run` function builds its state, binds, and serves until Ctrl-C.

pub mod cache_api;
pub mod config;
pub mod ephemeral_api;
pub mod error;
pub mod lock_api;
pub mod remote;
pub mod ring_api;

pub use config::{
    CacheNodeConfig, EphemeralServiceConfig, LockServiceConfig, RingServiceConfig,
};
pub use error::ApiError;
pub use remote::{RemoteCacheNode, RemoteProvisioner};

use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Initialize structured logging, honoring `RUST_LOG`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Resolves when the process receives Ctrl-C.
pub(crate) async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "failed to listen for shutdown signal");
    }
}

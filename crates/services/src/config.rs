//! Environment-variable configuration for the services.
//!
//! Every service reads its knobs from the environment with defaults matching
//! the documented deployment: ring and lock services on 6000, ephemeral-node
//! service on 6001, cache nodes on 5000.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, raw, "unparseable environment value, using default");
            default
        }),
        Err(_) => default,
    }
}

fn env_or_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Configuration for the ring service.
#[derive(Debug, Clone)]
pub struct RingServiceConfig {
    pub bind_addr: SocketAddr,
    /// Capacity of each cache node.
    pub cache_size: usize,
    /// Servers added to the ring at startup.
    pub servers: Vec<String>,
    /// Token positions per server (parent + aliases).
    pub replication_factor: usize,
    /// In-process cache nodes when true; remote node endpoints when false.
    pub run_mode_local: bool,
    /// Base URL remote cache nodes are reachable under.
    pub cache_base_url: String,
}

impl RingServiceConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 6000))),
            cache_size: env_or("CACHE_SIZE", 3),
            servers: env_or_string("SERVERS", "server1,server2")
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            replication_factor: env_or("REPLICATION_FACTOR", 2),
            run_mode_local: env_or("RUN_MODE_LOCAL", true),
            cache_base_url: env_or_string("CACHE_BASE_URL", "http://0.0.0.0"),
        }
    }
}

/// Configuration for one cache node process.
#[derive(Debug, Clone)]
pub struct CacheNodeConfig {
    pub bind_addr: SocketAddr,
    pub instance_no: u128,
    pub cache_size: usize,
}

impl CacheNodeConfig {
    pub fn new(instance_no: u128, cache_size: usize) -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 5000))),
            instance_no,
            cache_size,
        }
    }
}

/// Configuration for the named-lock service.
#[derive(Debug, Clone)]
pub struct LockServiceConfig {
    pub bind_addr: SocketAddr,
    pub cleanup_interval: Duration,
}

impl LockServiceConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 6000))),
            cleanup_interval: Duration::from_secs(env_or("CLEANUP_INTERVAL", 5)),
        }
    }
}

/// Configuration for the ephemeral-node service.
#[derive(Debug, Clone)]
pub struct EphemeralServiceConfig {
    pub bind_addr: SocketAddr,
    pub cleanup_interval: Duration,
}

impl EphemeralServiceConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 6001))),
            cleanup_interval: Duration::from_secs(env_or("CLEANUP_INTERVAL", 10)),
        }
    }
}

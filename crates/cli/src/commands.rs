//! Subcommands, one per service process.

use clap::Subcommand;
use services::{
    CacheNodeConfig, EphemeralServiceConfig, LockServiceConfig, RingServiceConfig,
};
use ticketing::TicketServiceConfig;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the consistent-hashing ring service (default port 6000).
    Ring,
    /// Run a single cache node process (default port 5000).
    CacheNode {
        /// Identity of this node on the ring.
        instance_no: u64,
        /// Maximum number of cached entries.
        cache_size: usize,
    },
    /// Run the named-lock service (default port 6000).
    Locks,
    /// Run the ephemeral-node service (default port 6001).
    EphemeralNodes,
    /// Run the ticket reservation service (default port 6005).
    Ticketing,
}

impl Command {
    pub fn run(self) -> anyhow::Result<()> {
        services::init_tracing();
        let runtime = tokio::runtime::Runtime::new()?;
        match self {
            Command::Ring => runtime.block_on(services::ring_api::run(
                RingServiceConfig::from_env(),
            )),
            Command::CacheNode {
                instance_no,
                cache_size,
            } => runtime.block_on(services::cache_api::run(CacheNodeConfig::new(
                u128::from(instance_no),
                cache_size,
            ))),
            Command::Locks => runtime.block_on(services::lock_api::run(
                LockServiceConfig::from_env(),
            )),
            Command::EphemeralNodes => runtime.block_on(services::ephemeral_api::run(
                EphemeralServiceConfig::from_env(),
            )),
            Command::Ticketing => runtime.block_on(ticketing::api::run(
                TicketServiceConfig::from_env(),
            )),
        }
    }
}

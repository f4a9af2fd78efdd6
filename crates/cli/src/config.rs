//! Top-level CLI configuration.

use crate::commands::Command;
use clap::Parser;

/// Service launcher. Service-specific knobs come from the environment; see
/// each service's config for the variables it reads.
#[derive(Debug, Parser)]
#[command(name = "ringlock", version, about = "Coordination + caching services")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    pub fn run(self) -> anyhow::Result<()> {
        self.command.run()
    }
}

//! Launcher for the coordination + caching services.
//!
//! One subcommand per process family:
//! - the ring service and its cache nodes
//! - the named-lock and ephemeral-node services
//! - the ticket reservation service

pub mod commands;
pub mod config;

pub use commands::Command;
pub use config::CliConfig;

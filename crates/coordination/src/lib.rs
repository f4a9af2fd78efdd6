//! Distributed coordination primitives.
//!
//! Two interchangeable lock registries share a TTL-based expiry cleaner:
//! - a flat named-lock registry (one owner per key, fenced by client id)
//! - a hierarchical ephemeral-node registry (sequential children under a
//!   parent path; the smallest live sequence owns the lock)

pub mod cleaner;
pub mod ephemeral;
pub mod error;
pub mod lock;
pub mod lock_manager;

pub use cleaner::{ExpiryCleaner, ExpirySweep};
pub use ephemeral::{EphemeralNode, EphemeralNodeManager};
pub use error::{Error, Result};
pub use lock::{LockEntry, LockStatus};
pub use lock_manager::LockManager;

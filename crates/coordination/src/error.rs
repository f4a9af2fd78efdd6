//! Error types for lock operations.

/// Result type alias for the coordination crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the coordination crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Raised when attempting to acquire a lock that is already held by
    /// another client. Carries the current holder's id.
    #[error("lock is already held by another client {owner}")]
    LockAlreadyHeld { owner: String },
    /// A node path was missing or malformed.
    #[error("cannot create a node without a valid parent path for client {client_id}")]
    InvalidPath { client_id: String },
}

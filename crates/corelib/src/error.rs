//! Error types for the core library.

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The ring has no servers to route to. Distinct from a key miss, which
    /// is reported as `Ok(None)`.
    #[error("no servers available in the hash ring")]
    NoServersAvailable,
    /// A named entity (key, server) was not found.
    #[error("{0} not found")]
    NotFound(String),
    /// A caller-supplied argument was missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A backing-store call failed (remote cache node unreachable, bad reply).
    #[error("backend call failed: {0}")]
    Backend(String),
}

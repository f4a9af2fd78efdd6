//! Error types for the ticketing service.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("lock service error: {0}")]
    LockService(String),
    #[error("unknown ticket {0}")]
    UnknownTicket(i32),
    #[error("invalid ticket state {0}")]
    InvalidState(String),
}

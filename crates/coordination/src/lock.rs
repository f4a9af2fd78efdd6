//! Lightweight representation of a named lock.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Observable state of a lock, computed lazily against the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockStatus {
    Locked,
    Expired,
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockStatus::Locked => write!(f, "locked"),
            LockStatus::Expired => write!(f, "expired"),
        }
    }
}

/// A held lock: one owner, a TTL, and the instant it was last acquired.
///
/// Status is never stored; it is recomputed on every read so expiry is
/// observable even between cleaner ticks.
#[derive(Debug, Clone)]
pub struct LockEntry {
    key: String,
    client_id: String,
    ttl: Duration,
    acquired_at: Instant,
}

impl LockEntry {
    pub(crate) fn new(key: &str, client_id: &str, ttl: Duration) -> Self {
        Self {
            key: key.to_string(),
            client_id: client_id.to_string(),
            ttl,
            acquired_at: Instant::now(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Current status against the clock.
    pub fn status(&self) -> LockStatus {
        if self.acquired_at.elapsed() > self.ttl {
            LockStatus::Expired
        } else {
            LockStatus::Locked
        }
    }

    /// Restart the TTL clock. Used when the holder renews, or when a new
    /// client takes over an expired lock.
    pub(crate) fn reacquire(&mut self, client_id: &str, ttl: Duration) {
        self.client_id = client_id.to_string();
        self.ttl = ttl;
        self.acquired_at = Instant::now();
    }
}

//! Named-lock registry: one owner per key, fenced by client id and TTL.

use crate::cleaner::ExpirySweep;
use crate::error::{Error, Result};
use crate::lock::{LockEntry, LockStatus};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Manager for per-key mutual exclusion.
///
/// # State machine per key
///
/// ```text
/// absent ──acquire──▶ locked(owner=c)
/// locked ──acquire by same c──▶ locked (renewed)
/// locked ──acquire by other c, not expired──▶ LockAlreadyHeld
/// locked ──acquire by other c, expired──▶ locked(owner=c')   (steal)
/// locked ──release by owner──▶ absent
/// expired ──cleaner sweep──▶ absent
/// ```
///
/// All operations run under one exclusion region per manager, so they are
/// linearizable against a single instance.
#[derive(Default)]
pub struct LockManager {
    locks: RwLock<HashMap<String, LockEntry>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire, renew, or steal the lock for `key`.
    ///
    /// Renewal (same `client_id`) and stealing (previous holder expired)
    /// both restart the TTL clock. A live lock held by someone else yields
    /// [`Error::LockAlreadyHeld`] carrying the current owner.
    pub fn acquire(&self, key: &str, client_id: &str, ttl: Duration) -> Result<LockStatus> {
        debug!(key, client_id, "attempting to acquire lock");
        let mut locks = self.locks.write();
        match locks.entry(key.to_string()) {
            Entry::Vacant(entry) => {
                debug!(key, client_id, "creating new lock");
                entry.insert(LockEntry::new(key, client_id, ttl));
                Ok(LockStatus::Locked)
            }
            Entry::Occupied(mut entry) => {
                let lock = entry.get_mut();
                if lock.client_id() == client_id {
                    debug!(key, client_id, "renewing lock");
                    lock.reacquire(client_id, ttl);
                    Ok(LockStatus::Locked)
                } else if lock.status() == LockStatus::Expired {
                    debug!(key, client_id, "acquiring expired lock for new client");
                    lock.reacquire(client_id, ttl);
                    Ok(LockStatus::Locked)
                } else {
                    warn!(key, client_id, owner = lock.client_id(), "lock already held");
                    Err(Error::LockAlreadyHeld {
                        owner: lock.client_id().to_string(),
                    })
                }
            }
        }
    }

    /// Release the lock for `key`.
    ///
    /// Only the current owner may release; anyone else (or an absent key)
    /// gets `false` and no mutation.
    pub fn release(&self, key: &str, client_id: &str) -> bool {
        debug!(key, client_id, "releasing lock");
        let mut locks = self.locks.write();
        let owner_matches = match locks.get(key) {
            Some(lock) if lock.client_id() == client_id => true,
            Some(lock) => {
                warn!(
                    key,
                    client_id,
                    owner = lock.client_id(),
                    "release refused: requester is not the owner"
                );
                false
            }
            None => false,
        };
        if owner_matches {
            locks.remove(key);
        }
        owner_matches
    }

    /// Lazily evaluated status and owner of `key`, `None` when absent.
    pub fn status(&self, key: &str) -> Option<(LockStatus, String)> {
        let locks = self.locks.read();
        locks
            .get(key)
            .map(|lock| (lock.status(), lock.client_id().to_string()))
    }

    /// Snapshot of all locks and their current status. Diagnostic surface.
    pub fn locks(&self) -> HashMap<String, LockStatus> {
        self.locks
            .read()
            .iter()
            .map(|(key, lock)| (key.clone(), lock.status()))
            .collect()
    }

    /// Number of registered locks, expired entries included.
    pub fn len(&self) -> usize {
        self.locks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.read().is_empty()
    }
}

impl ExpirySweep for LockManager {
    /// Garbage-collect lapsed entries. Clients never depend on this for
    /// correctness: status is recomputed on every read.
    fn sweep(&self) {
        let mut locks = self.locks.write();
        locks.retain(|key, lock| {
            let live = lock.status() == LockStatus::Locked;
            if !live {
                debug!(key, owner = lock.client_id(), "cleaning up expired lock");
            }
            live
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(10);

    #[test]
    fn test_acquire_then_conflict() {
        let manager = LockManager::new();
        manager.acquire("resource_lock", "client_1", TTL).unwrap();
        let err = manager
            .acquire("resource_lock", "client_2", TTL)
            .unwrap_err();
        assert!(matches!(err, Error::LockAlreadyHeld { owner } if owner == "client_1"));
    }

    #[test]
    fn test_release_fencing() {
        let manager = LockManager::new();
        manager.acquire("resource_lock", "client_1", TTL).unwrap();
        // Non-owner release must not mutate.
        assert!(!manager.release("resource_lock", "client_2"));
        assert_eq!(
            manager.status("resource_lock").unwrap().1,
            "client_1".to_string()
        );
        assert!(manager.release("resource_lock", "client_1"));
        assert!(manager.status("resource_lock").is_none());
        // Releasing an absent key is false.
        assert!(!manager.release("resource_lock", "client_1"));
    }

    #[test]
    fn test_renewal_keeps_ownership() {
        let manager = LockManager::new();
        let ttl = Duration::from_millis(80);
        manager.acquire("resource_lock", "client_1", ttl).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        manager.acquire("resource_lock", "client_1", ttl).unwrap();
        // Past the original deadline but inside the renewed one.
        std::thread::sleep(Duration::from_millis(50));
        let (status, owner) = manager.status("resource_lock").unwrap();
        assert_eq!(status, LockStatus::Locked);
        assert_eq!(owner, "client_1");
    }

    #[test]
    fn test_steal_after_expiry() {
        let manager = LockManager::new();
        let ttl = Duration::from_millis(40);
        manager.acquire("resource_lock", "client_1", ttl).unwrap();
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(
            manager.status("resource_lock").unwrap().0,
            LockStatus::Expired
        );
        manager.acquire("resource_lock", "client_2", ttl).unwrap();
        let (status, owner) = manager.status("resource_lock").unwrap();
        assert_eq!(status, LockStatus::Locked);
        assert_eq!(owner, "client_2");
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let manager = LockManager::new();
        manager
            .acquire("short", "client_1", Duration::from_millis(30))
            .unwrap();
        manager.acquire("long", "client_2", TTL).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        manager.sweep();
        assert!(manager.status("short").is_none());
        assert!(manager.status("long").is_some());
        assert_eq!(manager.len(), 1);
    }
}

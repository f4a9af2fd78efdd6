//! LRU cache node.
//!
//! One node in the cluster where cached entries live. Two structures back it:
//! a hash map from key to slot index for O(1) lookup, and an arena-based
//! doubly-linked list that maintains usage order with the most recently used
//! entry at the tail and the least recently used at the head. Links are
//! `usize` indices into the arena (no raw pointers, no `unsafe`), with
//! `NIL` marking the ends of the list.

use crate::error::Result;
use crate::store::CacheStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// Sentinel index for absent links.
const NIL: usize = usize::MAX;

/// One entry in the arena.
#[derive(Debug)]
struct Slot {
    key: String,
    value: String,
    prev: usize,
    next: usize,
}

/// Bounded LRU key/value cache with O(1) `put`/`get`.
///
/// # Invariants
///
/// - `len() <= capacity` after every operation
/// - the map and the recency list always hold the same key set
/// - `head` is the least recently used entry, `tail` the most recently used
///
/// Not thread-safe on its own; [`CacheNode`] wraps it in the per-instance
/// exclusion region.
#[derive(Debug)]
pub struct LruCache {
    capacity: usize,
    map: HashMap<String, usize>,
    slots: Vec<Slot>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
}

impl LruCache {
    /// Create a cache bounded to `capacity` entries.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "LruCache capacity must be > 0");
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
        }
    }

    /// Insert or overwrite `key`. The entry becomes the most recently used;
    /// if the insert pushed the cache over capacity, the least recently used
    /// entry is evicted.
    pub fn put(&mut self, key: &str, value: &str) {
        if let Some(&idx) = self.map.get(key) {
            // Existing key: refresh value and recency, size is unchanged.
            self.unlink(idx);
            self.slots[idx].value = value.to_string();
            self.push_tail(idx);
            return;
        }
        let idx = self.alloc(key.to_string(), value.to_string());
        self.map.insert(key.to_string(), idx);
        self.push_tail(idx);
        if self.map.len() > self.capacity {
            self.evict_lru();
        }
    }

    /// Look up `key`, counting the access as a use.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let idx = *self.map.get(key)?;
        self.unlink(idx);
        self.push_tail(idx);
        Some(self.slots[idx].value.clone())
    }

    /// Number of entries currently cached.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when no entries are cached.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn alloc(&mut self, key: String, value: String) -> usize {
        let slot = Slot {
            key,
            value,
            prev: NIL,
            next: NIL,
        };
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = slot;
            idx
        } else {
            self.slots.push(slot);
            self.slots.len() - 1
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        if prev == NIL {
            self.head = next;
        } else {
            self.slots[prev].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.slots[next].prev = prev;
        }
        self.slots[idx].prev = NIL;
        self.slots[idx].next = NIL;
    }

    fn push_tail(&mut self, idx: usize) {
        self.slots[idx].prev = self.tail;
        self.slots[idx].next = NIL;
        if self.tail == NIL {
            self.head = idx;
        } else {
            self.slots[self.tail].next = idx;
        }
        self.tail = idx;
    }

    fn evict_lru(&mut self) {
        let idx = self.head;
        debug_assert_ne!(idx, NIL, "eviction on an empty list");
        self.unlink(idx);
        let key = std::mem::take(&mut self.slots[idx].key);
        debug!(key = %key, "evicting least recently used entry");
        self.map.remove(&key);
        self.slots[idx].value.clear();
        self.free.push(idx);
    }
}

/// A cache node: an [`LruCache`] plus the instance identity it is known by
/// on the ring, behind a single exclusion region.
#[derive(Debug)]
pub struct CacheNode {
    instance_no: u128,
    inner: Mutex<LruCache>,
}

impl CacheNode {
    pub fn new(instance_no: u128, cache_size: usize) -> Self {
        Self {
            instance_no,
            inner: Mutex::new(LruCache::new(cache_size)),
        }
    }
}

#[async_trait]
impl CacheStore for CacheNode {
    fn instance_no(&self) -> u128 {
        self.instance_no
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        debug!(instance_no = %self.instance_no, key, "cache node put");
        self.inner.lock().put(key, value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        debug!(instance_no = %self.instance_no, key, "cache node get");
        Ok(self.inner.lock().get(key))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let mut cache = LruCache::new(3);
        cache.put("key1", "value1");
        cache.put("key2", "value2");
        assert_eq!(cache.get("key1"), Some("value1".to_string()));
        assert_eq!(cache.get("missing"), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_eviction_order() {
        let mut cache = LruCache::new(3);
        cache.put("key1", "value1");
        cache.put("key2", "value2");
        cache.put("key3", "value3");
        // key1 becomes most recently used, so key2 is now the LRU entry.
        assert_eq!(cache.get("key1"), Some("value1".to_string()));
        cache.put("key4", "value4");
        assert_eq!(cache.get("key2"), None);
        assert_eq!(cache.get("key3"), Some("value3".to_string()));
        assert_eq!(cache.get("key4"), Some("value4".to_string()));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_overwrite_keeps_size() {
        let mut cache = LruCache::new(2);
        cache.put("key1", "value1");
        cache.put("key1", "value2");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("key1"), Some("value2".to_string()));
    }

    #[test]
    fn test_overwrite_refreshes_recency() {
        let mut cache = LruCache::new(2);
        cache.put("key1", "value1");
        cache.put("key2", "value2");
        cache.put("key1", "value1b");
        // key2 is now the LRU entry and should be evicted first.
        cache.put("key3", "value3");
        assert_eq!(cache.get("key2"), None);
        assert_eq!(cache.get("key1"), Some("value1b".to_string()));
    }

    #[test]
    fn test_bound_holds_under_churn() {
        let mut cache = LruCache::new(4);
        for i in 0..100 {
            cache.put(&format!("key{}", i), &format!("value{}", i));
            assert!(cache.len() <= 4);
        }
        // Only the four most recent survive.
        for i in 96..100 {
            assert_eq!(
                cache.get(&format!("key{}", i)),
                Some(format!("value{}", i))
            );
        }
        assert_eq!(cache.get("key95"), None);
    }

    #[tokio::test]
    async fn test_cache_node_store() {
        let node = CacheNode::new(7, 2);
        assert_eq!(node.instance_no(), 7);
        node.put("key1", "value1").await.unwrap();
        assert_eq!(node.get("key1").await.unwrap(), Some("value1".to_string()));
        assert_eq!(node.get("nope").await.unwrap(), None);
        assert_eq!(node.len().await.unwrap(), 1);
    }
}

//! Minimal guarded key/value table
//!
//! [`Store`] is the substrate under the higher layers: a `HashMap` behind a
//! single reader-writer lock. Besides the self-locking accessors it exposes
//! the raw lock guards, so callers can build compound check-then-act
//! operations (test-and-insert, clear-then-extend) without nesting another
//! abstraction on top.

use std::collections::HashMap;
use std::hash::Hash;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A thread-safe map with both locking and pre-locked accessors
///
/// No iteration-order or fairness guarantees beyond mutual exclusion.
#[derive(Debug, Default)]
pub struct Store<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store seeded with an existing map
    pub fn with_map(map: HashMap<K, V>) -> Self {
        Self {
            inner: RwLock::new(map),
        }
    }

    /// Get a value by key
    pub async fn get(&self, key: &K) -> Option<V> {
        let map = self.inner.read().await;
        map.get(key).cloned()
    }

    /// Insert a value, returning the previous one if present
    pub async fn insert(&self, key: K, value: V) -> Option<V> {
        let mut map = self.inner.write().await;
        map.insert(key, value)
    }

    /// Remove a value by key, returning it if present
    pub async fn remove(&self, key: &K) -> Option<V> {
        let mut map = self.inner.write().await;
        map.remove(key)
    }

    /// Check whether a key is present
    pub async fn contains_key(&self, key: &K) -> bool {
        let map = self.inner.read().await;
        map.contains_key(key)
    }

    /// Number of entries
    pub async fn len(&self) -> usize {
        let map = self.inner.read().await;
        map.len()
    }

    /// Check whether the store is empty
    pub async fn is_empty(&self) -> bool {
        let map = self.inner.read().await;
        map.is_empty()
    }

    /// Clone the full contents
    pub async fn snapshot(&self) -> HashMap<K, V> {
        let map = self.inner.read().await;
        map.clone()
    }

    /// Acquire the read guard directly
    ///
    /// For callers that need several lookups under one lock acquisition.
    pub async fn read(&self) -> RwLockReadGuard<'_, HashMap<K, V>> {
        self.inner.read().await
    }

    /// Acquire the write guard directly
    ///
    /// For compound check-then-act operations; the guard gives full mutable
    /// access to the underlying map.
    pub async fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, V>> {
        self.inner.write().await
    }
}

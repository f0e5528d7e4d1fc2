//! Update strategies and stock sink implementations

use crate::cache::Cache;
use crate::error::Result;
use crate::refresh::source::{Dataset, Sink};
use crate::store::Store;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::sync::Arc;

/// Policy governing how a fetched dataset is merged into existing sink state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStrategy {
    /// Sink contents become exactly the fetched dataset (clear, then insert
    /// all); for sources that always return the full set
    Replace,

    /// Fetched entries overwrite-or-add; entries absent from the fetch are
    /// left untouched
    Merge,

    /// Same as [`UpdateStrategy::Merge`], named to emphasize that nothing is
    /// ever deleted
    UpsertOnly,

    /// Upsert-only as well; this strategy does not track or apply deletions
    /// (no tombstone contract is defined)
    Incremental,
}

/// Sink writing into a [`Store`] under a single write-lock acquisition
pub struct StoreSink<K, V> {
    store: Arc<Store<K, V>>,
    strategy: UpdateStrategy,
}

impl<K, V> StoreSink<K, V> {
    /// Create a sink over a shared store with the given strategy
    pub fn new(store: Arc<Store<K, V>>, strategy: UpdateStrategy) -> Self {
        Self { store, strategy }
    }

    /// The configured update strategy
    pub fn strategy(&self) -> UpdateStrategy {
        self.strategy
    }
}

#[async_trait]
impl<K, V> Sink<K, V> for StoreSink<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn apply(&self, data: Dataset<K, V>) -> Result<()> {
        let mut map = self.store.write().await;

        match self.strategy {
            UpdateStrategy::Replace => {
                *map = data;
            }
            UpdateStrategy::Merge | UpdateStrategy::UpsertOnly | UpdateStrategy::Incremental => {
                map.extend(data);
            }
        }

        Ok(())
    }
}

/// Sink writing into a keyed [`Cache`]
///
/// Unlike [`StoreSink`] the replace path is not atomic: readers may observe
/// the cache empty between the clear and the bulk insert.
pub struct CacheSink<K, V> {
    cache: Arc<Cache<K, V>>,
    strategy: UpdateStrategy,
}

impl<K, V> CacheSink<K, V> {
    /// Create a sink over a shared cache with the given strategy
    pub fn new(cache: Arc<Cache<K, V>>, strategy: UpdateStrategy) -> Self {
        Self { cache, strategy }
    }

    /// The configured update strategy
    pub fn strategy(&self) -> UpdateStrategy {
        self.strategy
    }
}

#[async_trait]
impl<K, V> Sink<K, V> for CacheSink<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn apply(&self, data: Dataset<K, V>) -> Result<()> {
        if self.strategy == UpdateStrategy::Replace {
            self.cache.clear().await;
        }
        self.cache.set_many(data).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(pairs: &[(&str, i32)]) -> Dataset<String, i32> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    #[tokio::test]
    async fn test_store_sink_replace() {
        let store = Arc::new(Store::new());
        store.insert("stale".to_string(), 0).await;

        let sink = StoreSink::new(Arc::clone(&store), UpdateStrategy::Replace);
        sink.apply(dataset(&[("a", 1), ("b", 2)])).await.unwrap();

        assert_eq!(store.get(&"stale".to_string()).await, None);
        assert_eq!(store.get(&"a".to_string()).await, Some(1));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_store_sink_merge_keeps_absent_keys() {
        let store = Arc::new(Store::new());
        store.insert("kept".to_string(), 9).await;

        let sink = StoreSink::new(Arc::clone(&store), UpdateStrategy::Merge);
        sink.apply(dataset(&[("a", 1)])).await.unwrap();

        assert_eq!(store.get(&"kept".to_string()).await, Some(9));
        assert_eq!(store.get(&"a".to_string()).await, Some(1));
    }

    #[tokio::test]
    async fn test_incremental_is_upsert_only() {
        let store = Arc::new(Store::new());
        store.insert("kept".to_string(), 9).await;

        let sink = StoreSink::new(Arc::clone(&store), UpdateStrategy::Incremental);
        sink.apply(dataset(&[("a", 1)])).await.unwrap();

        // No deletions are applied under Incremental.
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_cache_sink_replace() {
        let cache: Arc<Cache<String, i32>> = Arc::new(Cache::builder().build());
        cache.set("stale".to_string(), 0).await;

        let sink = CacheSink::new(Arc::clone(&cache), UpdateStrategy::Replace);
        sink.apply(dataset(&[("a", 1)])).await.unwrap();

        assert!(!cache.has(&"stale".to_string()).await);
        assert_eq!(cache.get_cached(&"a".to_string()).await, Some(1));
    }

    #[tokio::test]
    async fn test_cache_sink_merge() {
        let cache: Arc<Cache<String, i32>> = Arc::new(Cache::builder().build());
        cache.set("kept".to_string(), 9).await;

        let sink = CacheSink::new(Arc::clone(&cache), UpdateStrategy::UpsertOnly);
        sink.apply(dataset(&[("a", 1)])).await.unwrap();

        assert_eq!(cache.get_cached(&"kept".to_string()).await, Some(9));
        assert_eq!(cache.get_cached(&"a".to_string()).await, Some(1));
    }

    #[test]
    fn test_strategy_serde() {
        let json = serde_json::to_string(&UpdateStrategy::UpsertOnly).unwrap();
        assert_eq!(json, "\"upsertonly\"");

        let strategy: UpdateStrategy = serde_json::from_str("\"replace\"").unwrap();
        assert_eq!(strategy, UpdateStrategy::Replace);
    }
}

//! Keyed cache built from per-key entries
//!
//! [`Cache`] maps keys to [`CacheEntry`] slots created lazily on first
//! touch. The structural map (insert/remove of whole entries) sits behind a
//! coarse reader-writer lock; each entry's value is separately guarded by
//! its own lock, so generation work on one key never blocks unrelated keys.
//!
//! Entries are removed only by explicit delete/clear, never by a background
//! sweep. An expired entry stays allocated but reads as absent.

use crate::cache::config::CacheConfig;
use crate::cache::entry::CacheEntry;
use crate::cache::types::{CacheStats, KeyFn, KeyedGenerator, Lookup, StatCounters};
use crate::error::{FlowError, Result};
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Generic thread-safe in-memory cache
pub struct Cache<K, V> {
    config: CacheConfig,
    storage: RwLock<HashMap<K, Arc<CacheEntry<V>>>>,
    key_fn: Option<KeyFn<K, V>>,
    generator: Option<KeyedGenerator<K, V>>,
    stats: StatCounters,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Create a cache from a configuration, with no key fn or generator
    pub fn new(config: CacheConfig) -> Self {
        let capacity = config.initial_capacity;
        let storage = if capacity > 0 {
            HashMap::with_capacity(capacity)
        } else {
            HashMap::new()
        };

        Self {
            config,
            storage: RwLock::new(storage),
            key_fn: None,
            generator: None,
            stats: StatCounters::default(),
        }
    }

    /// Create a new builder
    pub fn builder() -> CacheBuilder<K, V> {
        CacheBuilder::default()
    }

    /// The configuration this cache was built with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Retrieve or create the entry for a key
    ///
    /// Read-locked probe first so the common case (entry exists) never pays
    /// write-lock cost; falls back to a write-locked re-check-then-insert.
    async fn entry(&self, key: &K) -> Arc<CacheEntry<V>> {
        {
            let storage = self.storage.read().await;
            if let Some(entry) = storage.get(key) {
                return Arc::clone(entry);
            }
        }

        let mut storage = self.storage.write().await;

        // Double-check after acquiring the write lock.
        if let Some(entry) = storage.get(key) {
            return Arc::clone(entry);
        }

        let entry = Arc::new(CacheEntry::new(self.config.ttl));
        storage.insert(key.clone(), Arc::clone(&entry));
        entry
    }

    /// Retrieve a value by key without falling back to the generator
    pub async fn get_cached(&self, key: &K) -> Option<V> {
        let entry = {
            let storage = self.storage.read().await;
            storage.get(key).cloned()
        };

        let value = match entry {
            Some(entry) => entry.get_cached().await,
            None => None,
        };

        match &value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        value
    }

    /// Retrieve a value by key, or run the cache-wide generator on a miss
    ///
    /// The generator is invoked without any lock held; its result is stored
    /// on success. A failing generator leaves prior cached state untouched.
    pub async fn get_or_generate(&self, key: &K) -> Result<Lookup<V>> {
        let entry = self.entry(key).await;

        if let Some(value) = entry.get_cached().await {
            self.stats.record_hit();
            return Ok(Lookup::Hit(value));
        }
        self.stats.record_miss();

        let Some(generator) = &self.generator else {
            return Ok(Lookup::Missing);
        };

        self.stats.record_generation();
        let value = generator(key).await?;
        entry.set(value.clone()).await;
        Ok(Lookup::Generated(value))
    }

    /// Retrieve a value, using the generator when one is configured
    pub async fn get(&self, key: &K) -> Result<Option<V>> {
        if self.generator.is_some() {
            Ok(self.get_or_generate(key).await?.into_value())
        } else {
            Ok(self.get_cached(key).await)
        }
    }

    /// Store a value under a key
    ///
    /// Returns `true` if a live value was overwritten.
    pub async fn set(&self, key: K, value: V) -> bool {
        let entry = self.entry(&key).await;
        entry.set(value).await
    }

    /// Store a value using the key-extraction function
    ///
    /// Without a key fn configured this is a no-op returning `false`, not an
    /// error. Returns `true` if a live value was overwritten.
    pub async fn set_value(&self, value: V) -> bool {
        let Some(key_fn) = &self.key_fn else {
            return false;
        };

        let key = key_fn(&value);
        self.set(key, value).await
    }

    /// Store multiple values
    ///
    /// Returns the count of entries that were live immediately before the
    /// operation, not the count attempted.
    pub async fn set_many(&self, items: HashMap<K, V>) -> usize {
        let mut overwritten = 0;
        for (key, value) in items {
            if self.set(key, value).await {
                overwritten += 1;
            }
        }
        overwritten
    }

    /// Remove a value by key
    ///
    /// Returns `true` if a live value was deleted.
    pub async fn delete(&self, key: &K) -> bool {
        let mut storage = self.storage.write().await;

        let Some(entry) = storage.remove(key) else {
            return false;
        };

        entry.has().await
    }

    /// Remove multiple keys
    ///
    /// Returns the count of entries that were live immediately before the
    /// operation.
    pub async fn delete_many(&self, keys: &[K]) -> usize {
        let mut deleted = 0;
        for key in keys {
            if self.delete(key).await {
                deleted += 1;
            }
        }
        deleted
    }

    /// Check whether a key holds a live value
    pub async fn has(&self, key: &K) -> bool {
        let entry = {
            let storage = self.storage.read().await;
            storage.get(key).cloned()
        };

        match entry {
            Some(entry) => entry.has().await,
            None => false,
        }
    }

    /// Remove all entries
    pub async fn clear(&self) {
        let mut storage = self.storage.write().await;
        let count = storage.len();
        storage.clear();
        debug!(count, "cache cleared");
    }

    /// Number of live entries
    ///
    /// Requires a full liveness sweep, O(size).
    pub async fn len(&self) -> usize {
        let storage = self.storage.read().await;
        let mut count = 0;
        for entry in storage.values() {
            if entry.has().await {
                count += 1;
            }
        }
        count
    }

    /// Check whether the cache holds no live entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All keys holding live values, in unspecified order
    pub async fn keys(&self) -> Vec<K> {
        let storage = self.storage.read().await;
        let mut keys = Vec::with_capacity(storage.len());
        for (key, entry) in storage.iter() {
            if entry.has().await {
                keys.push(key.clone());
            }
        }
        keys
    }

    /// All live values, in unspecified order
    pub async fn values(&self) -> Vec<V> {
        let storage = self.storage.read().await;
        let mut values = Vec::with_capacity(storage.len());
        for entry in storage.values() {
            if let Some(value) = entry.get_cached().await {
                values.push(value);
            }
        }
        values
    }

    /// Visit all live key-value pairs, in unspecified order
    ///
    /// Iteration stops when the visitor returns `false`. Expired entries are
    /// skipped silently.
    pub async fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let storage = self.storage.read().await;
        for (key, entry) in storage.iter() {
            if let Some(value) = entry.get_cached().await {
                if !visitor(key, &value) {
                    break;
                }
            }
        }
    }

    /// Force regeneration of the value for a key
    ///
    /// Errors if no generator is configured or the generator fails; a
    /// failing generator leaves prior cached state untouched.
    pub async fn update(&self, key: &K) -> Result<()> {
        let Some(generator) = &self.generator else {
            return Err(FlowError::NoGenerator);
        };

        // Generator runs without any cache lock held.
        let value = generator(key).await?;
        self.set(key.clone(), value).await;
        Ok(())
    }

    /// Extract the key from a value using the key fn, if configured
    pub fn key_of(&self, value: &V) -> Option<K> {
        self.key_fn.as_ref().map(|key_fn| key_fn(value))
    }

    /// Collect current statistics (live-entry count requires a sweep)
    pub async fn stats(&self) -> CacheStats {
        let entries = self.len().await;
        self.stats.collect(entries)
    }
}

/// Builder for a [`Cache`], attaching the non-serializable parts of its
/// construction: the key-extraction function and the keyed generator
pub struct CacheBuilder<K, V> {
    config: CacheConfig,
    key_fn: Option<KeyFn<K, V>>,
    generator: Option<KeyedGenerator<K, V>>,
}

impl<K, V> Default for CacheBuilder<K, V> {
    fn default() -> Self {
        Self {
            config: CacheConfig::default(),
            key_fn: None,
            generator: None,
        }
    }
}

impl<K, V> CacheBuilder<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Set the entry time-to-live (`Duration::ZERO` = no expiration)
    pub fn ttl(mut self, ttl: std::time::Duration) -> Self {
        self.config.ttl = if ttl.is_zero() { None } else { Some(ttl) };
        self
    }

    /// Set the initial capacity of the underlying map
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.config.initial_capacity = capacity;
        self
    }

    /// Use a prebuilt configuration
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the key-extraction function used by [`Cache::set_value`]
    pub fn key_fn<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&V) -> K + Send + Sync + 'static,
    {
        self.key_fn = Some(Arc::new(key_fn));
        self
    }

    /// Set the cache-wide keyed generator
    pub fn generator<F, Fut>(mut self, generator: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
        K: 'static,
    {
        self.generator = Some(Arc::new(move |key: &K| generator(key.clone()).boxed()));
        self
    }

    /// Build the cache
    pub fn build(self) -> Cache<K, V> {
        let mut cache = Cache::new(self.config);
        cache.key_fn = self.key_fn;
        cache.generator = self.generator;
        cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_basic_set_and_get() {
        let cache: Cache<String, i32> = Cache::builder().build();

        assert_eq!(cache.get_cached(&"a".to_string()).await, None);
        assert!(!cache.has(&"a".to_string()).await);

        cache.set("a".to_string(), 1).await;
        assert_eq!(cache.get_cached(&"a".to_string()).await, Some(1));
        assert!(cache.has(&"a".to_string()).await);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache: Cache<String, i32> =
            Cache::builder().ttl(Duration::from_millis(100)).build();

        cache.set("a".to_string(), 1).await;
        assert!(cache.has(&"a".to_string()).await);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!cache.has(&"a".to_string()).await);

        // Expired entries stay allocated but read as absent.
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_set_and_delete_liveness_contract() {
        let cache: Cache<String, i32> = Cache::builder().build();

        assert!(!cache.set("a".to_string(), 1).await);
        assert!(cache.set("a".to_string(), 2).await);

        assert!(cache.delete(&"a".to_string()).await);
        assert!(!cache.delete(&"a".to_string()).await);
    }

    #[tokio::test]
    async fn test_generator() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let gen_calls = Arc::clone(&calls);

        let cache: Cache<String, usize> = Cache::builder()
            .generator(move |key: String| {
                let calls = Arc::clone(&gen_calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(key.len())
                }
            })
            .build();

        let lookup = cache.get_or_generate(&"hello".to_string()).await.unwrap();
        assert_eq!(lookup, Lookup::Generated(5));

        let lookup = cache.get_or_generate(&"hello".to_string()).await.unwrap();
        assert_eq!(lookup, Lookup::Hit(5));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_generator_failure_leaves_state() {
        let cache: Cache<String, i32> = Cache::builder()
            .generator(|_key: String| async { Err(FlowError::Generator("down".to_string())) })
            .build();

        cache.set("a".to_string(), 5).await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(cache.update(&"a".to_string()).await.is_err());
        assert_eq!(cache.get_cached(&"a".to_string()).await, Some(5));
    }

    #[tokio::test]
    async fn test_set_value_requires_key_fn() {
        let plain: Cache<String, String> = Cache::builder().build();
        assert!(!plain.set_value("orphan".to_string()).await);
        assert_eq!(plain.len().await, 0);

        let keyed: Cache<String, String> = Cache::builder()
            .key_fn(|v: &String| v.chars().take(1).collect())
            .build();

        keyed.set_value("apple".to_string()).await;
        assert_eq!(keyed.get_cached(&"a".to_string()).await, Some("apple".to_string()));
        assert_eq!(keyed.key_of(&"banana".to_string()), Some("b".to_string()));
    }

    #[tokio::test]
    async fn test_set_many_and_delete_many() {
        let cache: Cache<String, i32> = Cache::builder().build();

        cache.set("a".to_string(), 1).await;

        let mut items = HashMap::new();
        items.insert("a".to_string(), 10);
        items.insert("b".to_string(), 20);
        items.insert("c".to_string(), 30);

        // Only "a" was live before the bulk insert.
        assert_eq!(cache.set_many(items).await, 1);
        assert_eq!(cache.len().await, 3);

        let deleted = cache
            .delete_many(&["a".to_string(), "b".to_string(), "missing".to_string()])
            .await;
        assert_eq!(deleted, 2);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_keys_values_skip_expired() {
        let cache: Cache<String, i32> =
            Cache::builder().ttl(Duration::from_millis(60)).build();

        cache.set("old".to_string(), 1).await;
        tokio::time::sleep(Duration::from_millis(90)).await;
        cache.set("new".to_string(), 2).await;

        assert_eq!(cache.keys().await, vec!["new".to_string()]);
        assert_eq!(cache.values().await, vec![2]);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_for_each_continuation() {
        let cache: Cache<String, i32> = Cache::builder().build();
        cache.set("a".to_string(), 1).await;
        cache.set("b".to_string(), 2).await;
        cache.set("c".to_string(), 3).await;

        let mut visited = 0;
        cache
            .for_each(|_key, _value| {
                visited += 1;
                false
            })
            .await;
        assert_eq!(visited, 1);

        let mut all = 0;
        cache
            .for_each(|_key, _value| {
                all += 1;
                true
            })
            .await;
        assert_eq!(all, 3);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache: Cache<String, i32> = Cache::builder().build();
        cache.set("a".to_string(), 1).await;
        cache.set("b".to_string(), 2).await;

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_stats() {
        let cache: Cache<String, i32> = Cache::builder().build();

        cache.set("a".to_string(), 1).await;
        cache.get_cached(&"a".to_string()).await;
        cache.get_cached(&"missing".to_string()).await;

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hit_rate(), 50.0);
    }

    #[tokio::test]
    async fn test_concurrent_entry_creation() {
        let cache: Arc<Cache<String, i32>> = Arc::new(Cache::builder().build());

        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.set("shared".to_string(), i).await;
                cache.get_cached(&"shared".to_string()).await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }

        // Exactly one entry exists for the contended key.
        assert_eq!(cache.len().await, 1);
    }
}

//! Single-slot cache entry with TTL support
//!
//! A [`CacheEntry`] holds one optional value behind its own lock, so
//! generation work on one entry never blocks unrelated entries. Expired
//! values are not removed in the background; they are simply treated as
//! absent by every read until overwritten or deleted.

use crate::cache::types::{Generator, Lookup};
use crate::error::{FlowError, Result};
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Inner state guarded by the entry lock
#[derive(Debug)]
struct EntryState<V> {
    value: Option<V>,
    expires_at: Option<Instant>,
}

impl<V> EntryState<V> {
    /// A value is live iff it is present and has not exceeded its TTL
    fn is_live(&self) -> bool {
        match (&self.value, self.expires_at) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(expires_at)) => Instant::now() < expires_at,
        }
    }
}

/// A thread-safe cache slot for a single value with optional TTL and
/// optional lazy generator
pub struct CacheEntry<V> {
    state: RwLock<EntryState<V>>,
    ttl: Option<Duration>,
    generator: Option<Generator<V>>,
}

impl<V> CacheEntry<V>
where
    V: Clone + Send + Sync,
{
    /// Create an empty entry
    ///
    /// `ttl`: expiration time for stored values (`None` = no expiration).
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            state: RwLock::new(EntryState {
                value: None,
                expires_at: None,
            }),
            ttl,
            generator: None,
        }
    }

    /// Create an empty entry with a lazy generator
    pub fn with_generator<F, Fut>(ttl: Option<Duration>, generator: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let mut entry = Self::new(ttl);
        entry.generator = Some(Arc::new(move || generator().boxed()));
        entry
    }

    /// Retrieve the value without falling back to the generator
    ///
    /// Returns `None` if the entry is empty or expired.
    pub async fn get_cached(&self) -> Option<V> {
        let state = self.state.read().await;
        if state.is_live() {
            state.value.clone()
        } else {
            None
        }
    }

    /// Retrieve the value, or run the generator on a miss
    ///
    /// The generator is invoked **without holding the entry lock**, so other
    /// operations on this entry are not blocked for the duration of
    /// generation. Two concurrent cold misses may therefore both run the
    /// generator; cross-caller dedup belongs to the coalescing layer.
    ///
    /// A failing generator leaves any prior cached state untouched.
    pub async fn get_or_generate(&self) -> Result<Lookup<V>> {
        if let Some(value) = self.get_cached().await {
            return Ok(Lookup::Hit(value));
        }

        let Some(generator) = &self.generator else {
            return Ok(Lookup::Missing);
        };

        let value = generator().await?;
        self.set(value.clone()).await;
        Ok(Lookup::Generated(value))
    }

    /// Retrieve the value, using the generator when one is configured
    pub async fn get(&self) -> Result<Option<V>> {
        if self.generator.is_some() {
            Ok(self.get_or_generate().await?.into_value())
        } else {
            Ok(self.get_cached().await)
        }
    }

    /// Store a value
    ///
    /// Always refreshes the expiry from "now", even when overwriting a
    /// not-yet-expired value. Returns `true` if a live value was overwritten.
    pub async fn set(&self, value: V) -> bool {
        let mut state = self.state.write().await;
        let was_live = state.is_live();

        state.value = Some(value);
        state.expires_at = self.ttl.map(|ttl| Instant::now() + ttl);

        was_live
    }

    /// Remove the value
    ///
    /// Returns `true` if a live value was deleted.
    pub async fn delete(&self) -> bool {
        let mut state = self.state.write().await;
        let was_live = state.is_live();

        state.value = None;
        state.expires_at = None;

        was_live
    }

    /// Remove the value, discarding the liveness status
    pub async fn clear(&self) {
        self.delete().await;
    }

    /// Check whether a live value is present
    pub async fn has(&self) -> bool {
        self.get_cached().await.is_some()
    }

    /// Force regeneration via the stored generator
    ///
    /// Overwrites unconditionally on success; a failing generator leaves the
    /// entry untouched. Errors if no generator is configured.
    pub async fn update(&self) -> Result<()> {
        let Some(generator) = &self.generator else {
            return Err(FlowError::NoGenerator);
        };

        // Generator runs without the entry lock held.
        let value = generator().await?;
        self.set(value).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_set_and_get() {
        let entry: CacheEntry<String> = CacheEntry::new(None);

        assert_eq!(entry.get_cached().await, None);
        assert!(!entry.has().await);

        entry.set("hello".to_string()).await;
        assert_eq!(entry.get_cached().await, Some("hello".to_string()));
        assert!(entry.has().await);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let entry: CacheEntry<String> = CacheEntry::new(Some(Duration::from_millis(100)));

        entry.set("test".to_string()).await;
        assert!(entry.has().await);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(entry.get_cached().await, None);
        assert!(!entry.has().await);
    }

    #[tokio::test]
    async fn test_set_refreshes_expiry() {
        let entry: CacheEntry<i32> = CacheEntry::new(Some(Duration::from_millis(120)));

        entry.set(1).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        // Overwriting a live value restarts its TTL.
        assert!(entry.set(2).await);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(entry.get_cached().await, Some(2));
    }

    #[tokio::test]
    async fn test_delete_returns_liveness() {
        let entry: CacheEntry<String> = CacheEntry::new(None);

        assert!(!entry.delete().await);

        entry.set("test".to_string()).await;
        assert!(entry.delete().await);
        assert!(!entry.delete().await);
    }

    #[tokio::test]
    async fn test_set_on_expired_returns_false() {
        let entry: CacheEntry<i32> = CacheEntry::new(Some(Duration::from_millis(50)));

        entry.set(1).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(!entry.set(2).await);
        assert_eq!(entry.get_cached().await, Some(2));
    }

    #[tokio::test]
    async fn test_generator_on_miss() {
        let entry = CacheEntry::with_generator(None, || async { Ok(42) });

        let lookup = entry.get_or_generate().await.unwrap();
        assert_eq!(lookup, Lookup::Generated(42));

        // Second lookup is a hit.
        let lookup = entry.get_or_generate().await.unwrap();
        assert_eq!(lookup, Lookup::Hit(42));
    }

    #[tokio::test]
    async fn test_generator_failure_leaves_state() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let fail = Arc::new(AtomicBool::new(false));
        let fail_flag = Arc::clone(&fail);

        let entry = CacheEntry::with_generator(Some(Duration::from_millis(50)), move || {
            let fail = Arc::clone(&fail_flag);
            async move {
                if fail.load(Ordering::SeqCst) {
                    Err(FlowError::Generator("boom".to_string()))
                } else {
                    Ok(7)
                }
            }
        });

        entry.update().await.unwrap();
        assert_eq!(entry.get_cached().await, Some(7));

        fail.store(true, Ordering::SeqCst);
        assert!(entry.update().await.is_err());

        // Failed generation did not clear the prior value.
        assert_eq!(entry.get_cached().await, Some(7));
    }

    #[tokio::test]
    async fn test_update_without_generator() {
        let entry: CacheEntry<i32> = CacheEntry::new(None);
        assert!(matches!(
            entry.update().await,
            Err(FlowError::NoGenerator)
        ));
    }

    #[tokio::test]
    async fn test_update_refreshes_value() {
        use std::sync::atomic::{AtomicI32, Ordering};

        let counter = Arc::new(AtomicI32::new(0));
        let gen_counter = Arc::clone(&counter);

        let entry = CacheEntry::with_generator(None, move || {
            let counter = Arc::clone(&gen_counter);
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) }
        });

        entry.update().await.unwrap();
        assert_eq!(entry.get_cached().await, Some(1));

        entry.update().await.unwrap();
        assert_eq!(entry.get_cached().await, Some(2));
    }

    #[tokio::test]
    async fn test_missing_without_generator() {
        let entry: CacheEntry<i32> = CacheEntry::new(None);
        let lookup = entry.get_or_generate().await.unwrap();
        assert_eq!(lookup, Lookup::Missing);
    }
}

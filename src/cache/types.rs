//! Core type definitions for the cache layer

use crate::error::Result;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lazy generator for a single cache entry
pub type Generator<V> = Arc<dyn Fn() -> BoxFuture<'static, Result<V>> + Send + Sync>;

/// Lazy generator keyed by the cache key
pub type KeyedGenerator<K, V> = Arc<dyn Fn(&K) -> BoxFuture<'static, Result<V>> + Send + Sync>;

/// Pure key-extraction function, used by value-keyed bulk inserts
pub type KeyFn<K, V> = Arc<dyn Fn(&V) -> K + Send + Sync>;

/// Result of a generator-backed lookup
///
/// Distinguishes a live cached value from one produced by the generator on
/// this call, and from a miss with no generator configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    /// A live value was already cached
    Hit(V),

    /// The generator ran and its result is now cached
    Generated(V),

    /// No live value and no generator to fall back to
    Missing,
}

impl<V> Lookup<V> {
    /// Extract the value, if any
    pub fn into_value(self) -> Option<V> {
        match self {
            Lookup::Hit(v) | Lookup::Generated(v) => Some(v),
            Lookup::Missing => None,
        }
    }

    /// Whether the value was already cached before this lookup
    pub fn was_cached(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }
}

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheStats {
    /// Total number of cache hits
    pub hits: u64,

    /// Total number of cache misses
    pub misses: u64,

    /// Number of generator invocations triggered by misses
    pub generations: u64,

    /// Number of live (non-expired) entries at collection time
    pub entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, generations: {}, entries: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.generations,
            self.entries
        )
    }
}

/// Internal atomic counters behind [`CacheStats`]
#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    pub(crate) hits: AtomicU64,
    pub(crate) misses: AtomicU64,
    pub(crate) generations: AtomicU64,
}

impl StatCounters {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_generation(&self) {
        self.generations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn collect(&self, entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            generations: self.generations.load(Ordering::Relaxed),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_into_value() {
        assert_eq!(Lookup::Hit(1).into_value(), Some(1));
        assert_eq!(Lookup::Generated(2).into_value(), Some(2));
        assert_eq!(Lookup::<i32>::Missing.into_value(), None);
    }

    #[test]
    fn test_lookup_was_cached() {
        assert!(Lookup::Hit(1).was_cached());
        assert!(!Lookup::Generated(1).was_cached());
        assert!(!Lookup::<i32>::Missing.was_cached());
    }

    #[test]
    fn test_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 80.0);
    }

    #[test]
    fn test_stats_zero_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_stats_display() {
        let stats = CacheStats {
            hits: 100,
            misses: 50,
            generations: 10,
            entries: 75,
        };

        let display = format!("{}", stats);
        assert!(display.contains("hits: 100"));
        assert!(display.contains("misses: 50"));
    }

    #[test]
    fn test_counters_collect() {
        let counters = StatCounters::default();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();
        counters.record_generation();

        let stats = counters.collect(5);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.generations, 1);
        assert_eq!(stats.entries, 5);
    }
}

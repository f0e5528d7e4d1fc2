//! Configuration for the cache layer

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a keyed cache
///
/// The TTL is fixed per cache: it is stamped onto an entry when a value is
/// written and is never renewed by reads. `None` means entries do not expire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live for cache entries (`None` = no expiration)
    pub ttl: Option<Duration>,

    /// Initial capacity of the underlying map (0 = default)
    pub initial_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: None,
            initial_capacity: 0,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ttl) = self.ttl {
            if ttl.is_zero() {
                return Err("ttl must be None or greater than zero".to_string());
            }
        }
        Ok(())
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    ttl: Option<Duration>,
    initial_capacity: Option<usize>,
}

impl CacheConfigBuilder {
    /// Set the entry time-to-live
    ///
    /// `Duration::ZERO` is normalized to "no expiration".
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = if ttl.is_zero() { None } else { Some(ttl) };
        self
    }

    /// Set the initial capacity of the underlying map
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            ttl: self.ttl.or(defaults.ttl),
            initial_capacity: self.initial_capacity.unwrap_or(defaults.initial_capacity),
        }
    }
}

//! # Keyed caching layer
//!
//! A cache is a map from key to [`CacheEntry`], each entry created lazily on
//! first touch and holding its value behind its own lock.
//!
//! ## Features
//!
//! - **TTL-based expiration**: values are stamped with a fixed per-cache TTL
//!   at write time and read as absent once it elapses
//! - **Lazy generation**: an optional cache-wide generator fills misses,
//!   invoked without holding any lock
//! - **Bulk operations**: `set_many` / `delete_many` report prior-live counts
//! - **Key extraction**: an optional key fn enables value-keyed inserts
//!
//! There is no background sweep and no size-based eviction; entries leave
//! the map only through explicit delete/clear.
//!
//! ## Example
//!
//! ```rust
//! use flowcache::cache::Cache;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let cache: Cache<String, String> = Cache::builder()
//!     .ttl(Duration::from_secs(3600))
//!     .build();
//!
//! cache.set("query:123".to_string(), "cached response".to_string()).await;
//!
//! if let Some(value) = cache.get_cached(&"query:123".to_string()).await {
//!     println!("cache hit: {}", value);
//! }
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod store;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use entry::CacheEntry;
pub use store::{Cache, CacheBuilder};
pub use types::{CacheStats, Generator, KeyFn, KeyedGenerator, Lookup};

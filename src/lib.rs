//! # flowcache
//!
//! An in-process concurrent caching and request-coalescing layer:
//!
//! - **Keyed caching** ([`cache`]): lazily-computed, optionally
//!   time-limited values behind per-entry locks
//! - **Single-flight coalescing** ([`flight`]): many concurrent callers
//!   share one in-flight computation per key, each free to cancel its own
//!   wait without affecting the others
//! - **Background refresh** ([`refresh`]): a timer-driven loop pulling bulk
//!   datasets from a source into a sink under a configurable update
//!   strategy, with composable fetch middleware
//! - **Guarded map** ([`store`]): the minimal mutex-guarded substrate the
//!   layers above are built on
//!
//! ## Coalescing into a cache
//!
//! ```no_run
//! use flowcache::cache::Cache;
//! use flowcache::flight::Deduplicator;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache: Arc<Cache<String, String>> = Arc::new(
//!         Cache::builder().ttl(Duration::from_secs(300)).build(),
//!     );
//!
//!     let dedup: Deduplicator<String, String> = Deduplicator::new();
//!
//!     // Ten concurrent requests for the same key run the computation once;
//!     // the winner's completion handler would typically populate `cache`.
//!     let outcome = dedup
//!         .get_or_compute("user:42".to_string(), async {
//!             Ok("profile data".to_string())
//!         })
//!         .await;
//!
//!     if let Some(Ok(value)) = outcome {
//!         cache.set("user:42".to_string(), value).await;
//!     }
//! }
//! ```
//!
//! ## Periodic refresh
//!
//! See the [`refresh`] module for the source/sink/strategy model and the
//! middleware chain.

pub mod cache;
pub mod error;
pub mod flight;
pub mod pool;
pub mod refresh;
pub mod store;

// Re-export main types for convenience
pub use cache::{Cache, CacheBuilder, CacheConfig, CacheEntry, CacheStats, Lookup};
pub use error::{FlowError, Result};
pub use flight::{BroadcastFuture, Completer, Deduplicator, Outcome};
pub use pool::RoundRobin;
pub use refresh::{
    CacheSink, Dataset, FnSource, Refresher, RefreshStatus, Sink, Source, StoreSink,
    UpdateStrategy,
};
pub use store::Store;

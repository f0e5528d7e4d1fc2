//! # Background refresh layer
//!
//! Periodically pulls a bulk dataset from a [`Source`], runs it through an
//! ordered chain of fetch middleware and applies it to a [`Sink`] under a
//! configurable update strategy.
//!
//! ## Example
//!
//! ```no_run
//! use flowcache::refresh::{FnSource, Refresher, StoreSink, UpdateStrategy};
//! use flowcache::store::Store;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> flowcache::Result<()> {
//! let store: Arc<Store<String, String>> = Arc::new(Store::new());
//!
//! let source = FnSource::new(|| async {
//!     // e.g. poll an HTTP endpoint here
//!     Ok(HashMap::from([("region".to_string(), "eu-1".to_string())]))
//! });
//!
//! let mut refresher = Refresher::new(
//!     source,
//!     StoreSink::new(Arc::clone(&store), UpdateStrategy::Replace),
//!     Duration::from_secs(30),
//! );
//!
//! refresher.start_sync().await?;
//! // ... later
//! refresher.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod middleware;
pub mod refresher;
pub mod sink;
pub mod source;

pub use middleware::{compose, logged, middleware_fn, retry, Middleware};
pub use refresher::{ErrorHandler, RefreshStatus, Refresher, SuccessHandler};
pub use sink::{CacheSink, StoreSink, UpdateStrategy};
pub use source::{fetch_fn, Dataset, FetchFn, FnSource, Sink, Source};

//! # Single-flight coalescing layer
//!
//! Ensures at most one in-progress computation exists per key, with
//! concurrent requesters sharing its result.
//!
//! - [`BroadcastFuture`]: one computation's outcome, observable by any
//!   number of waiters, including ones subscribing after completion
//! - [`Deduplicator`]: a keyed table of in-flight broadcast futures whose
//!   entries self-evict on completion
//!
//! ## Example
//!
//! ```rust
//! use flowcache::flight::Deduplicator;
//!
//! # async fn example() {
//! let dedup: Deduplicator<String, String> = Deduplicator::new();
//!
//! // Concurrent calls with the same key share one producer task.
//! let outcome = dedup
//!     .get_or_compute("user:42".to_string(), async {
//!         Ok("profile".to_string())
//!     })
//!     .await;
//!
//! assert_eq!(outcome.unwrap().unwrap(), "profile");
//! # }
//! ```

pub mod broadcast;
pub mod dedup;

pub use broadcast::{BroadcastFuture, Completer, Outcome};
pub use dedup::{CompletionHandler, Deduplicator};

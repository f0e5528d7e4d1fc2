//! Keyed single-flight request coalescing
//!
//! The [`Deduplicator`] couples a [`Store`] of in-flight
//! [`BroadcastFuture`]s with caller-supplied computations so that concurrent
//! requests for the same key share one producer task. The table holds at
//! most one live future per key: inserted under the map's write lock by the
//! first request, evicted by the producer after its completion handler has
//! run. A request arriving after eviction starts a fresh, causally unrelated
//! computation.

use crate::error::Result;
use crate::flight::broadcast::{BroadcastFuture, Outcome};
use crate::store::Store;
use futures::FutureExt;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Invoked exactly once per computation with the key and the final outcome,
/// after the outcome has been broadcast and before the key is evicted
///
/// The outcome is `None` when the computation produced no result (it
/// panicked).
pub type CompletionHandler<K, V> = Arc<dyn Fn(&K, &Outcome<V>) + Send + Sync>;

/// Coalesces concurrent computations per key
pub struct Deduplicator<K, V> {
    inflight: Arc<Store<K, BroadcastFuture<V>>>,
    on_complete: Option<CompletionHandler<K, V>>,
}

impl<K, V> Default for Deduplicator<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Deduplicator<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty deduplicator
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Store::new()),
            on_complete: None,
        }
    }

    /// Set the completion handler
    ///
    /// Typical use: writing the final value into a durable cache. The
    /// handler runs before eviction, so a subsequent request for the same
    /// key observes its effects. Handler failures are terminal side effects
    /// and are not propagated anywhere.
    pub fn with_completion_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&K, &Outcome<V>) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(handler));
        self
    }

    /// Request the value for `key`, sharing any in-flight computation
    ///
    /// If a computation for `key` is already running, `compute` is dropped
    /// unused and this call joins the existing future. Otherwise `compute`
    /// is launched as the producer. Returns the broadcast outcome; `None`
    /// means the producer finished without a result.
    pub async fn get_or_compute<F>(&self, key: K, compute: F) -> Outcome<V>
    where
        F: Future<Output = Result<V>> + Send + 'static,
    {
        let future = {
            let mut map = self.inflight.write().await;
            match map.get(&key) {
                Some(existing) => existing.clone(),
                None => {
                    let (future, _handle) = self.launch(key.clone(), compute, &mut map);
                    future
                }
            }
        };

        future.wait().await
    }

    /// Launch the computation for `key` without waiting on it
    ///
    /// Returns the producer task handle, or `None` if a computation for the
    /// key is already in flight (nothing is launched then).
    pub async fn start<F>(&self, key: K, compute: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = Result<V>> + Send + 'static,
    {
        let mut map = self.inflight.write().await;
        if map.contains_key(&key) {
            return None;
        }

        let (_future, handle) = self.launch(key, compute, &mut map);
        Some(handle)
    }

    /// Join an in-flight computation for `key`, if any
    ///
    /// Returns `None` when no computation is in flight; otherwise the
    /// broadcast outcome once the producer completes.
    pub async fn join(&self, key: &K) -> Option<Outcome<V>> {
        let future = self.inflight.get(key).await?;
        Some(future.wait().await)
    }

    /// Check whether a computation for `key` is currently in flight
    pub async fn in_flight(&self, key: &K) -> bool {
        self.inflight.contains_key(key).await
    }

    /// Insert a fresh future for `key` and spawn its producer task
    ///
    /// Must be called with the map's write lock held; insertion and the
    /// presence check in the callers form one atomic test-and-insert.
    fn launch<F>(
        &self,
        key: K,
        compute: F,
        map: &mut std::collections::HashMap<K, BroadcastFuture<V>>,
    ) -> (BroadcastFuture<V>, JoinHandle<()>)
    where
        F: Future<Output = Result<V>> + Send + 'static,
    {
        let (future, completer) = BroadcastFuture::new();
        map.insert(key.clone(), future.clone());

        let inflight = Arc::clone(&self.inflight);
        let on_complete = self.on_complete.clone();

        let handle = tokio::spawn(async move {
            // Broadcast first, then the handler, then eviction: the handler
            // runs-before any fresh computation for this key can start. A
            // panicking computation must still reach eviction, so the unwind
            // is caught; the dropped completer broadcasts absence.
            let outcome = match AssertUnwindSafe(compute).catch_unwind().await {
                Ok(result) => {
                    completer.complete(result.clone());
                    Some(result)
                }
                Err(_panic) => {
                    warn!("in-flight computation panicked");
                    drop(completer);
                    None
                }
            };

            if let Some(handler) = &on_complete {
                handler(&key, &outcome);
            }
            inflight.remove(&key).await;
            debug!("in-flight computation evicted");
        });

        (future, handle)
    }
}

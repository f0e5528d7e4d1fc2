//! One-shot result broadcast to a dynamic set of waiters
//!
//! A [`BroadcastFuture`] is the outcome of exactly one asynchronous
//! computation, observable by any number of waiters registered before or
//! after completion. The state machine is explicit: one lock guards both the
//! "already completed?" check and subscriber registration, so a waiter can
//! never fall between the completion transition and its own registration.
//!
//! The producer side is a [`Completer`]. Completing delivers the same
//! outcome to every registered subscriber; dropping the completer without
//! completing broadcasts absence instead. Cancelling a single waiter (by
//! dropping its `wait` future or timing out) removes only that waiter's
//! subscription and has no effect on the producer or on siblings.

use crate::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// The broadcast outcome: `Some` carries the producer's result (value or
/// error), `None` means the producer finished without producing one
pub type Outcome<T> = Option<Result<T>>;

enum State<T> {
    Pending {
        next_id: u64,
        subscribers: HashMap<u64, oneshot::Sender<Outcome<T>>>,
    },
    Completed(Outcome<T>),
}

fn lock_state<T>(shared: &Arc<Mutex<State<T>>>) -> MutexGuard<'_, State<T>> {
    // No code path panics while holding this lock; recover rather than
    // poison-propagate.
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Removes this waiter's subscription if its `wait` future is dropped
/// before the outcome arrives
struct Subscription<T> {
    shared: Arc<Mutex<State<T>>>,
    id: u64,
    armed: bool,
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = lock_state(&self.shared);
        if let State::Pending { subscribers, .. } = &mut *state {
            subscribers.remove(&self.id);
        }
    }
}

/// A shareable handle to one in-flight computation's outcome
pub struct BroadcastFuture<T> {
    shared: Arc<Mutex<State<T>>>,
}

impl<T> Clone for BroadcastFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> BroadcastFuture<T>
where
    T: Clone,
{
    /// Create a pending future and its producer-side completer
    pub fn new() -> (Self, Completer<T>) {
        let shared = Arc::new(Mutex::new(State::Pending {
            next_id: 0,
            subscribers: HashMap::new(),
        }));

        let future = Self {
            shared: Arc::clone(&shared),
        };
        let completer = Completer {
            shared,
            done: false,
        };
        (future, completer)
    }

    /// Launch a producer task for `fut` and return the observable future
    /// together with the task handle
    pub fn spawn<F>(fut: F) -> (Self, JoinHandle<()>)
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (future, completer) = Self::new();
        let handle = tokio::spawn(async move {
            let result = fut.await;
            completer.complete(result);
        });
        (future, handle)
    }

    /// Wait for the outcome
    ///
    /// Late joiners on a completed future return immediately with the cached
    /// outcome. Dropping this future before completion (losing a `select!`,
    /// a surrounding timeout firing) unsubscribes only this waiter and
    /// yields nothing to it; the producer and all other waiters are
    /// unaffected.
    pub async fn wait(&self) -> Outcome<T> {
        let (rx, mut subscription) = {
            let mut state = lock_state(&self.shared);
            match &mut *state {
                State::Completed(outcome) => return outcome.clone(),
                State::Pending {
                    next_id,
                    subscribers,
                } => {
                    let id = *next_id;
                    *next_id += 1;

                    let (tx, rx) = oneshot::channel();
                    subscribers.insert(id, tx);

                    let subscription = Subscription {
                        shared: Arc::clone(&self.shared),
                        id,
                        armed: true,
                    };
                    (rx, subscription)
                }
            }
        };

        // Sender dropped without a value means the producer signalled
        // absence; same shape as cancellation, caused by the other side.
        let outcome = rx.await.ok().flatten();
        subscription.armed = false;
        outcome
    }

    /// Wait for the outcome, giving up after `timeout`
    ///
    /// Returns `None` on elapse without affecting the producer or any other
    /// waiter.
    pub async fn wait_timeout(&self, timeout: std::time::Duration) -> Outcome<T> {
        match tokio::time::timeout(timeout, self.wait()).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => None,
        }
    }

    /// Check whether the producer has completed
    pub fn is_completed(&self) -> bool {
        matches!(*lock_state(&self.shared), State::Completed(_))
    }
}

/// Producer-side handle that completes a [`BroadcastFuture`] exactly once
///
/// Dropping the completer without calling [`Completer::complete`] broadcasts
/// absence to all current and future waiters.
pub struct Completer<T> {
    shared: Arc<Mutex<State<T>>>,
    done: bool,
}

impl<T> Completer<T>
where
    T: Clone,
{
    /// Deliver the final result to every waiter
    pub fn complete(mut self, result: Result<T>) {
        self.done = true;

        let mut state = lock_state(&self.shared);
        if matches!(*state, State::Completed(_)) {
            return;
        }

        // Transition and drain atomically: anyone registering after this
        // lock is released sees Completed and takes the fast path.
        let previous =
            std::mem::replace(&mut *state, State::Completed(Some(result.clone())));
        if let State::Pending { subscribers, .. } = previous {
            for (_, tx) in subscribers {
                let _ = tx.send(Some(result.clone()));
            }
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        self.done = true;

        let mut state = lock_state(&self.shared);
        if matches!(*state, State::Completed(_)) {
            return;
        }
        let previous = std::mem::replace(&mut *state, State::Completed(None));
        if let State::Pending { subscribers, .. } = previous {
            // Closing every channel without a value broadcasts absence.
            drop(subscribers);
        }
    }
}

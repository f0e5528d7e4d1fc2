//! Fetch middleware: composable wrappers around the fetch capability
//!
//! A middleware maps one fetch capability to another, letting cross-cutting
//! concerns (retry, logging, validation) wrap the base fetch without the
//! refresh loop knowing about them. The chain is composed so that the
//! **first-registered** middleware is the **outermost** call: it sees the
//! call first and the result last.

use crate::error::Result;
use crate::refresh::source::FetchFn;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A transform from fetch capability to fetch capability
pub type Middleware<T> = Arc<dyn Fn(FetchFn<T>) -> FetchFn<T> + Send + Sync>;

/// Build a [`Middleware`] from a plain function
pub fn middleware_fn<T, F>(f: F) -> Middleware<T>
where
    F: Fn(FetchFn<T>) -> FetchFn<T> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Compose a middleware chain around a base fetch
///
/// Applied in reverse registration order so the first-registered middleware
/// ends up outermost.
pub fn compose<T>(base: FetchFn<T>, middlewares: &[Middleware<T>]) -> FetchFn<T> {
    let mut fetch = base;
    for middleware in middlewares.iter().rev() {
        fetch = middleware(fetch);
    }
    fetch
}

/// Retry middleware: re-run a failing fetch up to `max_retries` extra times
/// with a fixed delay between attempts
pub fn retry<T>(max_retries: u32, delay: Duration) -> Middleware<T>
where
    T: Send + 'static,
{
    Arc::new(move |next: FetchFn<T>| {
        let next = Arc::clone(&next);
        let fetch: FetchFn<T> = Arc::new(move || {
            let next = Arc::clone(&next);
            async move {
                let mut attempt = 0;
                loop {
                    match next().await {
                        Ok(data) => return Ok(data),
                        Err(err) if attempt < max_retries => {
                            attempt += 1;
                            warn!(attempt, error = %err, "fetch failed, retrying");
                            tokio::time::sleep(delay).await;
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
            .boxed()
        });
        fetch
    })
}

/// Logging middleware: trace each fetch and its result under `label`
pub fn logged<T>(label: &str) -> Middleware<T>
where
    T: Send + 'static,
{
    let label = label.to_string();
    Arc::new(move |next: FetchFn<T>| {
        let next = Arc::clone(&next);
        let label = label.clone();
        let fetch: FetchFn<T> = Arc::new(move || {
            let next = Arc::clone(&next);
            let label = label.clone();
            async move {
                debug!(%label, "fetch starting");
                match next().await {
                    Ok(data) => {
                        debug!(%label, "fetch succeeded");
                        Ok(data)
                    }
                    Err(err) => {
                        warn!(%label, error = %err, "fetch failed");
                        Err(err)
                    }
                }
            }
            .boxed()
        });
        fetch
    })
}

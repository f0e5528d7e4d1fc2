//! Source and sink abstractions consumed by the refresher

use crate::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// A bulk dataset fetched from a source: a mapping from key to value
pub type Dataset<K, V> = HashMap<K, V>;

/// A source of data for periodic refresh
#[async_trait]
pub trait Source<T>: Send + Sync {
    /// Fetch the current dataset from the source
    async fn fetch(&self) -> Result<T>;
}

/// A destination for fetched data
#[async_trait]
pub trait Sink<K, V>: Send + Sync {
    /// Apply a fetched dataset to the underlying storage
    async fn apply(&self, data: Dataset<K, V>) -> Result<()>;
}

/// First-class fetch capability; the unit middlewares wrap
pub type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// Build a [`FetchFn`] from an async closure
pub fn fetch_fn<T, F, Fut>(f: F) -> FetchFn<T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Adapter turning a [`FetchFn`] into a [`Source`]
pub struct FnSource<T> {
    fetch: FetchFn<T>,
}

impl<T> FnSource<T> {
    /// Wrap an async closure as a source
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self { fetch: fetch_fn(f) }
    }
}

#[async_trait]
impl<T: Send + 'static> Source<T> for FnSource<T> {
    async fn fetch(&self) -> Result<T> {
        (self.fetch)().await
    }
}

/// Convert a shared source into a fetch capability
pub(crate) fn source_fetch<T: Send + 'static>(source: Arc<dyn Source<T>>) -> FetchFn<T> {
    Arc::new(move || {
        let source = Arc::clone(&source);
        async move { source.fetch().await }.boxed()
    })
}

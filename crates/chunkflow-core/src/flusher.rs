//! The caller-supplied batch sink.

use std::future::Future;

use async_trait::async_trait;

use crate::error::ChunkError;

/// Trait for delivering a batch of items somewhere (an API, a database, ...).
///
/// Batches arrive in push order and never overlap: the next flush is not
/// started until the previous one has returned. A returned error is not
/// retried; the batch is lost from the sink's point of view.
#[async_trait]
pub trait Flusher<T>: Send + Sync {
    async fn flush(&self, values: Vec<T>) -> Result<(), ChunkError>;
}

/// A [`Flusher`] backed by an async closure. Build one with [`flush_fn`].
pub struct FnFlusher<F> {
    f: F,
}

/// Wrap `Fn(Vec<T>) -> impl Future<Output = Result<(), ChunkError>>` as a [`Flusher`].
pub fn flush_fn<F>(f: F) -> FnFlusher<F> {
    FnFlusher { f }
}

#[async_trait]
impl<T, F, Fut> Flusher<T> for FnFlusher<F>
where
    T: Send + 'static,
    F: Fn(Vec<T>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ChunkError>> + Send + 'static,
{
    async fn flush(&self, values: Vec<T>) -> Result<(), ChunkError> {
        (self.f)(values).await
    }
}

//! The caller-supplied page source.

use std::future::Future;

use async_trait::async_trait;

use crate::error::ChunkError;
use crate::page::Page;
use crate::stats::FetchStats;

/// Input to a single fetch call.
#[derive(Debug, Clone)]
pub struct FetchRequest<M> {
    /// Snapshot of the iterator's counters at the time of the call.
    pub stats: FetchStats,
    /// The most recent meta returned by the fetcher (or the initial meta).
    pub meta: M,
}

impl<M> FetchRequest<M> {
    /// Items fetched so far, usable as the next offset. Saturates at
    /// `usize::MAX` where the count does not fit.
    pub fn offset(&self) -> usize {
        usize::try_from(self.stats.items).unwrap_or(usize::MAX)
    }
}

/// Trait for fetching pages from a data source.
///
/// Return `Ok(None)` or a `done` page when there is nothing more to fetch.
/// Any `Err` ends the stream through the iterator's error path; retries are
/// the implementation's own business.
#[async_trait]
pub trait Fetcher<T, M>: Send + Sync {
    async fn fetch(&self, req: FetchRequest<M>) -> Result<Option<Page<T, M>>, ChunkError>;
}

/// A [`Fetcher`] backed by an async closure. Build one with [`fetch_fn`].
pub struct FnFetcher<F> {
    f: F,
}

/// Wrap `Fn(FetchRequest<M>) -> impl Future<Output = Result<Option<Page<T, M>>, ChunkError>>`
/// as a [`Fetcher`].
pub fn fetch_fn<F>(f: F) -> FnFetcher<F> {
    FnFetcher { f }
}

#[async_trait]
impl<T, M, F, Fut> Fetcher<T, M> for FnFetcher<F>
where
    T: Send + 'static,
    M: Send + 'static,
    F: Fn(FetchRequest<M>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Page<T, M>>, ChunkError>> + Send + 'static,
{
    async fn fetch(&self, req: FetchRequest<M>) -> Result<Option<Page<T, M>>, ChunkError> {
        (self.f)(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closure_fetcher_sees_offset() {
        let data: Vec<u32> = (0..10).collect();
        let fetcher: Box<dyn Fetcher<u32, ()>> = Box::new(fetch_fn(move |req: FetchRequest<()>| {
            let page = data.iter().skip(req.offset()).take(4).copied().collect::<Vec<_>>();
            async move { Ok::<_, ChunkError>(Some(Page::<u32, ()>::values(page))) }
        }));

        let mut stats = FetchStats::new();
        stats.items = 8;
        let page = fetcher
            .fetch(FetchRequest { stats, meta: () })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.values, Some(vec![8, 9]));
    }

    #[test]
    fn offset_saturates_instead_of_wrapping() {
        let mut stats = FetchStats::new();
        stats.items = u64::from(u32::MAX) + 5;
        let req = FetchRequest { stats, meta: () };
        assert!(req.offset() as u64 >= u64::from(u32::MAX));
    }
}

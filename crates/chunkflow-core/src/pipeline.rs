//! Drive a [`Chunker`] into a [`Bulker`].
//!
//! The two halves know nothing about each other; this is just the loop a
//! caller would otherwise write by hand: pull one item, push it, and flush the
//! remainder at the end.

use serde::{Deserialize, Serialize};

use crate::bulker::Bulker;
use crate::chunker::Chunker;
use crate::error::ChunkError;
use crate::stats::{BulkStats, FetchStats};

/// Counters from both sides of a completed [`pipe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeSummary {
    pub fetch: FetchStats,
    pub bulk: BulkStats,
    /// Items pulled from the chunker.
    pub yields: u64,
}

/// Move every item from `chunker` into `bulker`, one single-item push per
/// item, then close the bulker.
///
/// Stops at the first error from either side. If the chunker fails, the
/// bulker is dropped without its final flush.
pub async fn pipe<T, M>(
    chunker: &mut Chunker<T, M>,
    mut bulker: Bulker<T>,
) -> Result<PipeSummary, ChunkError>
where
    T: Send + 'static,
    M: Clone + Send + 'static,
{
    while let Some(item) = chunker.next().await? {
        bulker.push_one(item).await?;
    }
    let bulk = bulker.done().await?;

    tracing::debug!(
        yields = chunker.yields(),
        pushes = bulk.pushes,
        flushes = bulk.flushes,
        "pipe complete"
    );

    Ok(PipeSummary {
        fetch: chunker.stats().clone(),
        bulk,
        yields: chunker.yields(),
    })
}

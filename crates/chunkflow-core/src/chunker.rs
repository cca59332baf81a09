//! Paged pull iterator.
//!
//! A [`Chunker`] turns a page-at-a-time [`Fetcher`] into an item-at-a-time
//! sequence. It keeps a FIFO tank of fetched items; each call to
//! [`Chunker::next`] hands out one item, refilling the tank from the fetcher
//! only once it has been drained.
//!
//! # States
//!
//! ```text
//! Idle → Fetching → (Delivering | Idle)* → Finished
//!           └──────────────────────────→ Errored
//! any non-terminal ────────────────────→ Cancelled
//! ```
//!
//! Every terminal state stamps the stats and resolves the
//! [`ExhaustedSignal`] exactly once. No fetch happens after that.

use std::collections::VecDeque;

use futures::stream::{self, Stream};

use crate::builder::ChunkerBuilder;
use crate::config::{ChunkerConfig, ErrorPolicy};
use crate::error::{ChunkError, ErrorInfo};
use crate::fetcher::{FetchRequest, Fetcher};
use crate::page::Page;
use crate::signal::{self, Exhausted, ExhaustedSender, ExhaustedSignal};
use crate::stats::FetchStats;

/// Lifecycle of a [`Chunker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkerState {
    /// Tank empty, no fetch in flight.
    Idle,
    /// Waiting on the fetcher.
    Fetching,
    /// Handing out items from a non-empty tank.
    Delivering,
    /// The data ran out.
    Finished,
    /// A fetch failed or returned a malformed page.
    Errored,
    /// Stopped by [`Chunker::cancel`] or by being dropped.
    Cancelled,
}

impl ChunkerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Errored | Self::Cancelled)
    }
}

impl std::fmt::Display for ChunkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Fetching => write!(f, "fetching"),
            Self::Delivering => write!(f, "delivering"),
            Self::Finished => write!(f, "finished"),
            Self::Errored => write!(f, "errored"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

enum Refill {
    Filled,
    Done,
}

/// Lazily pulls items out of a paged data source, one page in flight at a time.
pub struct Chunker<T, M = ()> {
    fetcher: Box<dyn Fetcher<T, M>>,
    config: ChunkerConfig,
    policy: ErrorPolicy,
    tank: VecDeque<T>,
    meta: M,
    stats: FetchStats,
    yields: u64,
    state: ChunkerState,
    exhausted_tx: ExhaustedSender,
    exhausted: ExhaustedSignal,
}

impl<T, M> Chunker<T, M>
where
    T: Send + 'static,
    M: Clone + Send + 'static,
{
    /// Create a chunker with default options and the given initial meta.
    pub fn new(fetcher: impl Fetcher<T, M> + 'static, meta: M) -> Self {
        Self::from_parts(
            Box::new(fetcher),
            ChunkerConfig::default(),
            ErrorPolicy::default(),
            meta,
        )
    }

    /// Start a [`ChunkerBuilder`] with a default initial meta.
    pub fn builder(fetcher: impl Fetcher<T, M> + 'static) -> ChunkerBuilder<T, M>
    where
        M: Default,
    {
        ChunkerBuilder::new(fetcher)
    }

    pub(crate) fn from_parts(
        fetcher: Box<dyn Fetcher<T, M>>,
        config: ChunkerConfig,
        policy: ErrorPolicy,
        meta: M,
    ) -> Self {
        let (exhausted_tx, exhausted) = signal::channel();
        Self {
            fetcher,
            config,
            policy,
            tank: VecDeque::new(),
            meta,
            stats: FetchStats::new(),
            yields: 0,
            state: ChunkerState::Idle,
            exhausted_tx,
            exhausted,
        }
    }

    /// Pull the next item.
    ///
    /// Returns `Ok(None)` once the data has run out, and on every call after
    /// a terminal state. An error is returned at most once, and only if the
    /// [`ErrorPolicy`] surfaces it.
    pub async fn next(&mut self) -> Result<Option<T>, ChunkError> {
        if self.state.is_terminal() {
            return Ok(None);
        }

        if self.tank.is_empty() {
            match self.refill().await {
                Ok(Refill::Filled) => {}
                Ok(Refill::Done) => {
                    self.finish();
                    return Ok(None);
                }
                Err(e) => return self.fail(e).map(|()| None),
            }
        }

        match self.tank.pop_front() {
            Some(item) => {
                self.yields += 1;
                self.state = if self.tank.is_empty() {
                    ChunkerState::Idle
                } else {
                    ChunkerState::Delivering
                };
                Ok(Some(item))
            }
            None => {
                self.finish();
                Ok(None)
            }
        }
    }

    /// Fetch until the tank holds at least one item or the source is done.
    /// Empty pages are counted and skipped.
    async fn refill(&mut self) -> Result<Refill, ChunkError> {
        self.stats.mark_started();

        loop {
            self.state = ChunkerState::Fetching;
            let req = FetchRequest {
                stats: self.stats.clone(),
                meta: self.meta.clone(),
            };

            let Some(page) = self.fetcher.fetch(req).await? else {
                tracing::debug!(fetches = self.stats.fetches, "fetcher returned no result");
                return Ok(Refill::Done);
            };
            let Page { values, done, meta } = page;

            let count = values.as_ref().map(Vec::len).unwrap_or(0);
            let done = done
                || values.is_none()
                || (self.config.treat_no_results_as_done && count == 0);

            if done && count > 0 {
                return Err(ChunkError::ConflictingSignal { count });
            }

            if let Some(meta) = meta {
                self.meta = meta;
            }

            let values = match values {
                Some(values) if !done => values,
                _ => return Ok(Refill::Done),
            };

            self.stats.fetches += 1;
            if values.is_empty() {
                tracing::debug!(fetches = self.stats.fetches, "empty page, fetching again");
                continue;
            }

            self.stats.items += count as u64;
            self.tank.extend(values);
            tracing::debug!(
                fetches = self.stats.fetches,
                items = self.stats.items,
                count,
                "page fetched"
            );
            return Ok(Refill::Filled);
        }
    }

    fn fail(&mut self, err: ChunkError) -> Result<(), ChunkError> {
        tracing::warn!(
            error = %err,
            yields = self.yields,
            fetches = self.stats.fetches,
            "chunker stopped on error"
        );
        self.terminate(ChunkerState::Errored, Some(ErrorInfo::from(&err)));
        self.policy.apply(err)
    }

    fn finish(&mut self) {
        self.terminate(ChunkerState::Finished, None);
        tracing::info!(
            yields = self.yields,
            fetches = self.stats.fetches,
            items = self.stats.items,
            elapsed_ms = self.stats.elapsed_ms,
            "chunker exhausted"
        );
    }

    /// Consume the chunker as a [`Stream`]. The stream ends after the last
    /// item, or after yielding the first surfaced error.
    pub fn into_stream(self) -> impl Stream<Item = Result<T, ChunkError>> + Send {
        stream::unfold(self, |mut chunker| async move {
            match chunker.next().await {
                Ok(Some(item)) => Some((Ok(item), chunker)),
                Ok(None) => None,
                Err(e) => Some((Err(e), chunker)),
            }
        })
    }

    /// Borrow the chunker as a [`Stream`], leaving stats and meta readable
    /// once the stream is done.
    pub fn stream(&mut self) -> impl Stream<Item = Result<T, ChunkError>> + Send + '_ {
        stream::unfold(self, |chunker| async move {
            match chunker.next().await {
                Ok(Some(item)) => Some((Ok(item), chunker)),
                Ok(None) => None,
                Err(e) => Some((Err(e), chunker)),
            }
        })
    }
}

impl<T, M> Chunker<T, M> {
    /// Stop the iterator. Buffered items are discarded and the exhausted
    /// signal resolves with a cancellation error. No-op once terminal.
    pub fn cancel(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        let dropped = self.tank.len();
        self.terminate(
            ChunkerState::Cancelled,
            Some(ErrorInfo::from(&ChunkError::Cancelled)),
        );
        tracing::info!(yields = self.yields, dropped, "chunker cancelled");
    }

    fn terminate(&mut self, state: ChunkerState, error: Option<ErrorInfo>) {
        self.state = state;
        self.tank.clear();
        self.stats.mark_finished();
        self.exhausted_tx.resolve(Exhausted {
            error,
            yields: self.yields,
        });
    }

    /// Fetch-side counters.
    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }

    /// The meta that will be passed to the next fetch.
    pub fn meta(&self) -> &M {
        &self.meta
    }

    /// Items handed to the consumer so far.
    pub fn yields(&self) -> u64 {
        self.yields
    }

    /// Items fetched but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.tank.len()
    }

    pub fn state(&self) -> ChunkerState {
        self.state
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// `true` once the iterator has reached a terminal state.
    pub fn is_exhausted(&self) -> bool {
        self.state.is_terminal()
    }

    /// A handle that resolves when the iterator reaches a terminal state.
    pub fn exhausted(&self) -> ExhaustedSignal {
        self.exhausted.clone()
    }
}

impl<T, M> Drop for Chunker<T, M> {
    fn drop(&mut self) {
        if !self.exhausted_tx.is_resolved() {
            tracing::debug!(yields = self.yields, "chunker dropped before exhaustion");
            self.cancel();
        }
    }
}

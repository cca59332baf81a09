//! Fluent builder API for creating chunkers.
//!
//! # Example
//!
//! ```rust,no_run
//! use chunkflow_core::{fetch_fn, Chunker, ChunkError, ErrorPolicy, FetchRequest, Page};
//!
//! let fetcher = fetch_fn(|req: FetchRequest<()>| async move {
//!     let start = req.offset() as u64;
//!     let values: Vec<u64> = (start..(start + 10).min(95)).collect();
//!     let done = values.is_empty();
//!     Ok::<_, ChunkError>(Some(Page::<u64, ()>::values(values).finished(done)))
//! });
//!
//! let chunker = Chunker::builder(fetcher)
//!     .treat_no_results_as_done(true)
//!     .error_policy(ErrorPolicy::Suppress)
//!     .build();
//! ```

use crate::chunker::Chunker;
use crate::config::{ChunkerConfig, ErrorPolicy};
use crate::error::ChunkError;
use crate::fetcher::Fetcher;

/// Fluent builder for [`Chunker`].
pub struct ChunkerBuilder<T, M> {
    fetcher: Box<dyn Fetcher<T, M>>,
    config: ChunkerConfig,
    policy: ErrorPolicy,
    meta: M,
}

impl<T, M> ChunkerBuilder<T, M>
where
    T: Send + 'static,
    M: Clone + Send + 'static,
{
    pub fn new(fetcher: impl Fetcher<T, M> + 'static) -> Self
    where
        M: Default,
    {
        Self {
            fetcher: Box::new(fetcher),
            config: ChunkerConfig::default(),
            policy: ErrorPolicy::default(),
            meta: M::default(),
        }
    }

    /// Replace all options at once (e.g. with a deserialized config).
    pub fn config(mut self, config: ChunkerConfig) -> Self {
        self.config = config;
        self
    }

    /// End the stream on the first empty page instead of fetching again.
    pub fn treat_no_results_as_done(mut self, yes: bool) -> Self {
        self.config.treat_no_results_as_done = yes;
        self
    }

    /// Set the initial meta passed to the first fetch.
    pub fn meta(mut self, meta: M) -> Self {
        self.meta = meta;
        self
    }

    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Shorthand for `error_policy(ErrorPolicy::handle(f))`.
    pub fn on_error<F>(self, f: F) -> Self
    where
        F: Fn(ChunkError) -> Result<(), ChunkError> + Send + Sync + 'static,
    {
        self.error_policy(ErrorPolicy::handle(f))
    }

    pub fn build(self) -> Chunker<T, M> {
        Chunker::from_parts(self.fetcher, self.config, self.policy, self.meta)
    }
}

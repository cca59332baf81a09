//! chunkflow-core: paged pull iterator and threshold batching sink.
//!
//! # Architecture
//!
//! ```text
//! Fetcher ──pages──▶ Chunker ──item──▶ (caller loop) ──items──▶ Bulker ──batches──▶ Flusher
//!                      ├── tank         (FIFO of fetched items)        ├── buffer
//!                      ├── FetchStats   (read by the fetcher)          └── BulkStats
//!                      └── ExhaustedSignal (one-shot terminal outcome)
//! ```
//!
//! The [`Chunker`] and [`Bulker`] are independent; [`pipeline::pipe`] is the
//! ready-made caller loop that connects them.

pub mod builder;
pub mod bulker;
pub mod chunker;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod flusher;
pub mod page;
pub mod pipeline;
pub mod signal;
pub mod stats;

pub use builder::ChunkerBuilder;
pub use bulker::{Bulker, BulkerState};
pub use chunker::{Chunker, ChunkerState};
pub use config::{BulkerConfig, ChunkerConfig, ErrorPolicy};
pub use error::{ChunkError, ErrorInfo, ErrorKind};
pub use fetcher::{fetch_fn, FetchRequest, Fetcher};
pub use flusher::{flush_fn, Flusher};
pub use page::Page;
pub use pipeline::{pipe, PipeSummary};
pub use signal::{Exhausted, ExhaustedSignal};
pub use stats::{BulkStats, FetchStats};

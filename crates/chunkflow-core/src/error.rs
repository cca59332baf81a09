//! Error types for the chunkflow pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the paged iterator, the batching sink, or the
/// collaborators plugged into them.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// A page claimed more data was coming but did not carry a list of values.
    #[error("expected result of type array - got {found}")]
    Shape { found: String },

    /// A page signalled `done` while still delivering values.
    #[error(
        "received done signal along with {count} fetched values - only signal done when there are no more values to fetch"
    )]
    ConflictingSignal { count: usize },

    /// The caller's fetch function failed.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The caller's flush function failed.
    #[error("Flush error: {0}")]
    Flush(String),

    /// The caller's error handler raised its own error.
    #[error("Error handler failed: {0}")]
    Consumer(String),

    /// The sink no longer accepts pushes.
    #[error("Bulker is {state} and no longer accepts pushes")]
    Closed { state: String },

    /// Invalid construction options.
    #[error("Invalid config: {0}")]
    Config(String),

    /// The iterator was cancelled before reaching the end of the data.
    #[error("Chunker cancelled")]
    Cancelled,
}

impl ChunkError {
    /// Build a fetch-side transport error from anything printable.
    pub fn fetch(e: impl std::fmt::Display) -> Self {
        Self::Fetch(e.to_string())
    }

    /// Build a flush-side transport error from anything printable.
    pub fn flush(e: impl std::fmt::Display) -> Self {
        Self::Flush(e.to_string())
    }

    /// Returns `true` if a fetched page was rejected by the iterator itself.
    pub fn is_malformed_page(&self) -> bool {
        matches!(self, Self::Shape { .. } | Self::ConflictingSignal { .. })
    }

    /// Returns `true` if the error came out of a caller-supplied fetch or flush.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Flush(_))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Shape { .. } => ErrorKind::Shape,
            Self::ConflictingSignal { .. } => ErrorKind::ConflictingSignal,
            Self::Fetch(_) | Self::Flush(_) => ErrorKind::Transport,
            Self::Consumer(_) => ErrorKind::Consumer,
            Self::Closed { .. } => ErrorKind::Closed,
            Self::Config(_) => ErrorKind::Config,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Coarse classification of a [`ChunkError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Shape,
    ConflictingSignal,
    Transport,
    Consumer,
    Closed,
    Config,
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shape => write!(f, "shape"),
            Self::ConflictingSignal => write!(f, "conflicting-signal"),
            Self::Transport => write!(f, "transport"),
            Self::Consumer => write!(f, "consumer"),
            Self::Closed => write!(f, "closed"),
            Self::Config => write!(f, "config"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A cloneable record of an error, kept on the exhausted signal after the
/// error itself has been handed to the error policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ChunkError> for ErrorInfo {
    fn from(e: &ChunkError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

//! Construction options for the iterator and the sink.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ChunkError;

/// Options for a [`Chunker`](crate::chunker::Chunker).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Treat a page with an empty `values` list as the end of the data
    /// instead of skipping it and fetching again.
    #[serde(default)]
    pub treat_no_results_as_done: bool,
}

/// Options for a [`Bulker`](crate::bulker::Bulker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkerConfig {
    /// Buffer length at which a flush is triggered. Must be at least 1.
    #[serde(default = "default_threshold")]
    pub threshold: usize,
}

fn default_threshold() -> usize {
    100
}

impl Default for BulkerConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

impl BulkerConfig {
    pub fn with_threshold(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.threshold == 0 {
            return Err(ChunkError::Config(
                "threshold must be a positive integer".into(),
            ));
        }
        Ok(())
    }
}

/// Handler signature for [`ErrorPolicy::Handle`].
pub type ErrorHandler = Arc<dyn Fn(ChunkError) -> Result<(), ChunkError> + Send + Sync>;

/// What the iterator does with an error once it has reached its terminal state.
#[derive(Clone, Default)]
pub enum ErrorPolicy {
    /// Hand the error back to the caller of `next()`.
    #[default]
    Rethrow,
    /// End the stream quietly. The error is still recorded on the exhausted signal.
    Suppress,
    /// Let a caller function decide: `Ok(())` suppresses, `Err(e)` surfaces `e`.
    Handle(ErrorHandler),
}

impl ErrorPolicy {
    pub fn handle<F>(f: F) -> Self
    where
        F: Fn(ChunkError) -> Result<(), ChunkError> + Send + Sync + 'static,
    {
        Self::Handle(Arc::new(f))
    }

    pub(crate) fn apply(&self, err: ChunkError) -> Result<(), ChunkError> {
        match self {
            Self::Rethrow => Err(err),
            Self::Suppress => Ok(()),
            Self::Handle(f) => f(err),
        }
    }
}

impl std::fmt::Debug for ErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rethrow => write!(f, "Rethrow"),
            Self::Suppress => write!(f, "Suppress"),
            Self::Handle(_) => write!(f, "Handle(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulker_config_defaults_from_json() {
        let cfg: BulkerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.threshold, 100);
        let cfg: ChunkerConfig = serde_json::from_str("{}").unwrap();
        assert!(!cfg.treat_no_results_as_done);
    }

    #[test]
    fn zero_threshold_rejected() {
        let err = BulkerConfig::with_threshold(0).validate().unwrap_err();
        assert!(matches!(err, ChunkError::Config(_)));
        assert!(BulkerConfig::with_threshold(1).validate().is_ok());
    }

    #[test]
    fn policies() {
        assert!(ErrorPolicy::Rethrow.apply(ChunkError::Cancelled).is_err());
        assert!(ErrorPolicy::Suppress.apply(ChunkError::Cancelled).is_ok());
        let transform = ErrorPolicy::handle(|e| Err(ChunkError::Consumer(format!("wrapped: {e}"))));
        let err = transform.apply(ChunkError::fetch("down")).unwrap_err();
        assert_eq!(err.to_string(), "Error handler failed: wrapped: Fetch error: down");
    }
}

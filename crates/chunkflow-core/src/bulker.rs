//! Threshold batching sink.
//!
//! A [`Bulker`] accumulates pushed items and hands them to a [`Flusher`] as
//! one batch whenever the buffer reaches the threshold. [`Bulker::done`]
//! flushes whatever is left.
//!
//! Flush policy:
//! - a flush takes the whole buffer, so one large push produces one batch
//!   larger than the threshold rather than several threshold-sized ones;
//! - flushes run one at a time, inside the push that triggered them.

use crate::config::BulkerConfig;
use crate::error::ChunkError;
use crate::flusher::Flusher;
use crate::stats::BulkStats;

/// Whether a [`Bulker`] still accepts pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkerState {
    Open,
    /// A flush failed. The sink rejects further pushes.
    Failed,
}

impl std::fmt::Display for BulkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Re-aggregates pushed items into threshold-sized batches.
pub struct Bulker<T> {
    flusher: Box<dyn Flusher<T>>,
    threshold: usize,
    buffer: Vec<T>,
    stats: BulkStats,
    state: BulkerState,
}

impl<T: Send + 'static> Bulker<T> {
    /// Create a sink flushing every `threshold` items. `threshold` must be at least 1.
    pub fn new(flusher: impl Flusher<T> + 'static, threshold: usize) -> Result<Self, ChunkError> {
        Self::from_config(flusher, BulkerConfig::with_threshold(threshold))
    }

    pub fn from_config(
        flusher: impl Flusher<T> + 'static,
        config: BulkerConfig,
    ) -> Result<Self, ChunkError> {
        config.validate()?;
        Ok(Self {
            flusher: Box::new(flusher),
            threshold: config.threshold,
            buffer: Vec::new(),
            stats: BulkStats::default(),
            state: BulkerState::Open,
        })
    }

    /// Append a group of items, flushing if the buffer reaches the threshold.
    ///
    /// Counts one push and `values.len()` items whether or not a flush
    /// happens. An empty group is counted as a push and appends nothing.
    /// A flush failure is returned here and leaves the sink [`BulkerState::Failed`].
    pub async fn push(&mut self, values: Vec<T>) -> Result<(), ChunkError> {
        self.ensure_open()?;

        self.stats.pushes += 1;
        self.stats.items += values.len() as u64;
        self.buffer.extend(values);

        if self.buffer.len() >= self.threshold {
            self.flush().await?;
        }
        Ok(())
    }

    /// Push a single item.
    pub async fn push_one(&mut self, item: T) -> Result<(), ChunkError> {
        self.push(vec![item]).await
    }

    /// Flush any remainder and return the final counters.
    pub async fn done(mut self) -> Result<BulkStats, ChunkError> {
        self.ensure_open()?;

        if !self.buffer.is_empty() {
            self.flush().await?;
        }

        tracing::info!(
            pushes = self.stats.pushes,
            items = self.stats.items,
            flushes = self.stats.flushes,
            "bulker done"
        );
        Ok(self.stats)
    }

    async fn flush(&mut self) -> Result<(), ChunkError> {
        let batch = std::mem::take(&mut self.buffer);
        let size = batch.len();
        self.stats.flushes += 1;
        tracing::debug!(size, flush = self.stats.flushes, "flushing batch");

        if let Err(e) = self.flusher.flush(batch).await {
            self.state = BulkerState::Failed;
            tracing::warn!(error = %e, size, "flush failed, batch dropped");
            return Err(e);
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), ChunkError> {
        match self.state {
            BulkerState::Open => Ok(()),
            state => Err(ChunkError::Closed {
                state: state.to_string(),
            }),
        }
    }
}

impl<T> Bulker<T> {
    pub fn stats(&self) -> BulkStats {
        self.stats
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Items waiting for the next flush.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn state(&self) -> BulkerState {
        self.state
    }
}

impl<T> Drop for Bulker<T> {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            tracing::warn!(
                buffered = self.buffer.len(),
                "bulker dropped with unflushed items; call done() to flush them"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flusher::flush_fn;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Records every batch; fails on the batch numbers listed in `fail_on`.
    #[derive(Default)]
    struct Recorder {
        batches: Arc<Mutex<Vec<Vec<u32>>>>,
        fail_on: Vec<usize>,
        in_flight: AtomicBool,
    }

    #[async_trait]
    impl Flusher<u32> for Recorder {
        async fn flush(&self, values: Vec<u32>) -> Result<(), ChunkError> {
            assert!(
                !self.in_flight.swap(true, Ordering::SeqCst),
                "flushes overlapped"
            );
            tokio::task::yield_now().await;
            let n = {
                let mut batches = self.batches.lock().unwrap();
                batches.push(values);
                batches.len()
            };
            self.in_flight.store(false, Ordering::SeqCst);
            if self.fail_on.contains(&n) {
                return Err(ChunkError::flush(format!("batch {n} rejected")));
            }
            Ok(())
        }
    }

    fn recorder() -> (Recorder, Arc<Mutex<Vec<Vec<u32>>>>) {
        let r = Recorder::default();
        let batches = r.batches.clone();
        (r, batches)
    }

    fn sizes(batches: &Arc<Mutex<Vec<Vec<u32>>>>) -> Vec<usize> {
        batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    #[tokio::test]
    async fn flushes_at_threshold_and_remainder_on_done() {
        let (flusher, batches) = recorder();
        let mut bulker = Bulker::new(flusher, 3).unwrap();
        for i in 0..10 {
            bulker.push_one(i).await.unwrap();
        }
        assert_eq!(bulker.buffered(), 1);
        assert_eq!(sizes(&batches), vec![3, 3, 3]);

        let stats = bulker.done().await.unwrap();
        assert_eq!(sizes(&batches), vec![3, 3, 3, 1]);
        assert_eq!(
            stats,
            BulkStats {
                pushes: 10,
                items: 10,
                flushes: 4
            }
        );

        let flat: Vec<u32> = batches.lock().unwrap().concat();
        assert_eq!(flat, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn exact_multiple_leaves_nothing_for_done() {
        let (flusher, batches) = recorder();
        let mut bulker = Bulker::new(flusher, 5).unwrap();
        for i in 0..10 {
            bulker.push_one(i).await.unwrap();
        }
        let stats = bulker.done().await.unwrap();
        assert_eq!(sizes(&batches), vec![5, 5]);
        assert_eq!(stats.flushes, 2);
    }

    #[tokio::test]
    async fn oversized_push_is_one_batch() {
        let (flusher, batches) = recorder();
        let mut bulker = Bulker::new(flusher, 3).unwrap();
        bulker.push(vec![1, 2]).await.unwrap();
        bulker.push(vec![3, 4, 5, 6, 7]).await.unwrap();

        assert_eq!(*batches.lock().unwrap(), vec![vec![1, 2, 3, 4, 5, 6, 7]]);
        assert_eq!(bulker.buffered(), 0);
    }

    #[tokio::test]
    async fn pushes_count_calls_not_flushes() {
        let (flusher, batches) = recorder();
        let mut bulker = Bulker::new(flusher, 10).unwrap();
        bulker.push(vec![1, 2, 3, 4]).await.unwrap();
        bulker.push(vec![]).await.unwrap();

        let stats = bulker.stats();
        assert_eq!(stats.pushes, 2);
        assert_eq!(stats.items, 4);
        assert_eq!(stats.flushes, 0);
        assert!(batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn done_on_empty_buffer_does_not_flush() {
        let (flusher, batches) = recorder();
        let bulker = Bulker::new(flusher, 2).unwrap();
        let stats = bulker.done().await.unwrap();
        assert_eq!(stats, BulkStats::default());
        assert!(batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn flush_failure_propagates_and_closes() {
        let r = Recorder {
            fail_on: vec![2],
            ..Default::default()
        };
        let batches = r.batches.clone();
        let mut bulker = Bulker::new(r, 2).unwrap();

        bulker.push(vec![1, 2]).await.unwrap();
        bulker.push_one(3).await.unwrap();
        let err = bulker.push_one(4).await.unwrap_err();
        assert!(matches!(err, ChunkError::Flush(ref m) if m == "batch 2 rejected"));

        // Counters reflect accepted pushes, not deliveries.
        assert_eq!(bulker.stats().pushes, 3);
        assert_eq!(bulker.stats().items, 4);
        assert_eq!(bulker.buffered(), 0);
        assert_eq!(bulker.state(), BulkerState::Failed);

        let err = bulker.push_one(5).await.unwrap_err();
        assert!(matches!(err, ChunkError::Closed { .. }));
        assert_eq!(sizes(&batches), vec![2, 2]);
        assert!(bulker.done().await.is_err());
    }

    #[tokio::test]
    async fn failure_in_final_flush_reaches_done() {
        let r = Recorder {
            fail_on: vec![1],
            ..Default::default()
        };
        let mut bulker = Bulker::new(r, 10).unwrap();
        bulker.push_one(1).await.unwrap();
        assert!(bulker.done().await.unwrap_err().is_transport());
    }

    #[test]
    fn zero_threshold_rejected() {
        let flusher = flush_fn(|_values: Vec<u32>| async { Ok::<(), ChunkError>(()) });
        assert!(matches!(Bulker::new(flusher, 0), Err(ChunkError::Config(_))));
    }

    #[tokio::test]
    async fn unbounded_threshold_flushes_only_on_done() {
        let (flusher, batches) = recorder();
        let mut bulker = Bulker::new(flusher, usize::MAX).unwrap();
        for i in 0..50 {
            bulker.push_one(i).await.unwrap();
        }
        bulker.push(vec![50, 51]).await.unwrap();
        assert!(batches.lock().unwrap().is_empty());
        assert_eq!(bulker.buffered(), 52);

        let stats = bulker.done().await.unwrap();
        assert_eq!(sizes(&batches), vec![52]);
        assert_eq!(stats.flushes, 1);
    }

    #[tokio::test]
    async fn closure_flusher() {
        let out = Arc::new(Mutex::new(Vec::new()));
        let sink = out.clone();
        let flusher = flush_fn(move |values: Vec<u32>| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(values);
                Ok::<(), ChunkError>(())
            }
        });
        let mut bulker = Bulker::new(flusher, 2).unwrap();
        for i in 0..5 {
            bulker.push_one(i).await.unwrap();
        }
        bulker.done().await.unwrap();
        assert_eq!(*out.lock().unwrap(), vec![vec![0, 1], vec![2, 3], vec![4]]);
    }
}

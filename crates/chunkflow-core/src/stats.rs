//! Progress counters for the iterator and the sink.

use serde::{Deserialize, Serialize};

/// Current time as unix milliseconds.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Fetch-side progress, handed to every fetch call so the fetcher can derive
/// offsets ("items fetched so far") from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStats {
    /// Fetch calls that returned a page of values, including empty pages.
    /// The terminal `done` page is not counted.
    pub fetches: u64,
    /// Items received across all pages.
    pub items: u64,
    /// Unix ms of the first fetch attempt.
    pub started_at: Option<i64>,
    /// Unix ms of construction.
    pub created_at: i64,
    /// Unix ms at which the iterator reached a terminal state.
    pub finished_at: Option<i64>,
    /// `finished_at - started_at`, 0 if fetching never started.
    pub elapsed_ms: i64,
}

impl FetchStats {
    pub(crate) fn new() -> Self {
        Self {
            fetches: 0,
            items: 0,
            started_at: None,
            created_at: now_ms(),
            finished_at: None,
            elapsed_ms: 0,
        }
    }

    /// Stamp `started_at` on the first call only.
    pub(crate) fn mark_started(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(now_ms());
        }
    }

    pub(crate) fn mark_finished(&mut self) {
        let finished_at = now_ms();
        self.finished_at = Some(finished_at);
        self.elapsed_ms = self
            .started_at
            .map(|s| finished_at.saturating_sub(s))
            .unwrap_or(0);
    }

    /// Returns `true` once the iterator has stopped.
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// Sink-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkStats {
    /// Caller push operations accepted. Not a flush counter.
    pub pushes: u64,
    /// Items accepted across all pushes.
    pub items: u64,
    /// Flush calls dispatched, including failed ones.
    pub flushes: u64,
}

//! One-shot exhaustion signal.
//!
//! Resolved exactly once when a [`Chunker`](crate::chunker::Chunker) reaches a
//! terminal state (finished, errored, cancelled or dropped). Any number of
//! clones can await it; awaiting never drives the iterator.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{FutureExt, Shared};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::{ErrorInfo, ErrorKind};

/// Terminal outcome of an iterator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exhausted {
    /// `None` when the data ran out normally.
    pub error: Option<ErrorInfo>,
    /// Items delivered to the consumer before the iterator stopped.
    pub yields: u64,
}

impl Exhausted {
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }
}

/// Write side, owned by the iterator.
pub(crate) struct ExhaustedSender {
    tx: Option<oneshot::Sender<Exhausted>>,
}

impl ExhaustedSender {
    /// Returns `false` if the signal was already resolved.
    pub(crate) fn resolve(&mut self, outcome: Exhausted) -> bool {
        match self.tx.take() {
            Some(tx) => {
                // Nobody listening is fine.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.tx.is_none()
    }
}

/// Awaitable, cloneable read side.
#[derive(Clone)]
pub struct ExhaustedSignal {
    rx: Shared<oneshot::Receiver<Exhausted>>,
}

impl ExhaustedSignal {
    /// The outcome, if already resolved.
    pub fn peek(&self) -> Option<Exhausted> {
        self.rx.peek().map(|r| r.clone().unwrap_or_else(|_| abandoned()))
    }
}

impl Future for ExhaustedSignal {
    type Output = Exhausted;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.rx
            .poll_unpin(cx)
            .map(|r| r.unwrap_or_else(|_| abandoned()))
    }
}

impl std::fmt::Debug for ExhaustedSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExhaustedSignal")
            .field("outcome", &self.peek())
            .finish()
    }
}

pub(crate) fn channel() -> (ExhaustedSender, ExhaustedSignal) {
    let (tx, rx) = oneshot::channel();
    (
        ExhaustedSender { tx: Some(tx) },
        ExhaustedSignal { rx: rx.shared() },
    )
}

// The sender is always resolved before it is dropped; this only covers a panic
// unwinding through the iterator.
fn abandoned() -> Exhausted {
    Exhausted {
        error: Some(ErrorInfo {
            kind: ErrorKind::Cancelled,
            message: "chunker dropped without resolving".into(),
        }),
        yields: 0,
    }
}

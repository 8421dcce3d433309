use std::future::Future;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::error::Cause;

/// Time budget and cancellation signal of the operation a store call belongs to.
///
/// Every store call derives its own timeout from this value at the moment the
/// call is made: `min(per_call, remaining budget)`.
#[derive(Clone, Debug)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl CallContext {
    /// No deadline, never cancelled. Used during startup.
    pub fn background() -> Self {
        Self {
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_budget(budget: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + budget),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Same deadline, independent cancellation. Fan-out workers run on this so a
    /// caller going away does not tear down units already spawned.
    pub fn detached(&self) -> Self {
        Self {
            deadline: self.deadline,
            cancel: CancellationToken::new(),
        }
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn call_timeout(&self, per_call: Duration) -> Duration {
        match self.remaining() {
            Some(remaining) => remaining.min(per_call),
            None => per_call,
        }
    }

    /// Drive `fut` until it finishes, the call timeout elapses or the context is cancelled.
    ///
    /// A spent budget or a cancelled context fails without polling `fut` at all.
    pub(crate) async fn bound<F, T>(&self, per_call: Duration, fut: F) -> Result<T, Cause>
    where
        F: Future<Output = Result<T, Cause>>,
    {
        if self.cancel.is_cancelled() {
            return Err(Cause::Cancelled);
        }
        let limit = self.call_timeout(per_call);
        if limit.is_zero() {
            return Err(Cause::DeadlineExceeded(limit));
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Cause::Cancelled),
            res = tokio::time::timeout(limit, fut) => match res {
                Ok(res) => res,
                Err(_) => Err(Cause::DeadlineExceeded(limit)),
            },
        }
    }
}

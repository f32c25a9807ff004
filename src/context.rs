//! Run-wide deadline and cancellation.
//!
//! A [`RunContext`] is created once per run and handed by reference to every
//! operation that can block. Each suspension point races its own future
//! against [`RunContext::done`], so the run unwinds promptly once the deadline
//! passes or [`RunContext::cancel`] is called.

use crate::core::{Result, SaveError};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct RunContext {
    deadline: Instant,
    cancel: CancellationToken,
}

impl RunContext {
    /// Context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline,
            cancel: CancellationToken::new(),
        }
    }

    /// Context whose deadline is `timeout` from now, cancelled through `cancel`.
    pub fn with_token(timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            cancel,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Cancel the run. Every clone of this context observes it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Non-blocking check, `Err` once the run is over.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(SaveError::Cancelled);
        }
        if Instant::now() >= self.deadline {
            return Err(SaveError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolves with the terminal error once the run is cancelled or its
    /// deadline passes.
    pub async fn done(&self) -> SaveError {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => SaveError::Cancelled,
            () = sleep_until(self.deadline) => SaveError::DeadlineExceeded,
        }
    }

    /// Sleep for `duration` unless the run ends first.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.guard(async {
            sleep(duration).await;
            Ok(())
        })
        .await
    }

    /// Drive `fut` to completion unless the run ends first, in which case
    /// `fut` is dropped and the terminal error returned.
    pub async fn guard<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            out = fut => out,
        }
    }
}

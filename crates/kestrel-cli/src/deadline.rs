//! Run-wide deadline shared by every network call and polling loop.
//!
//! One [`Deadline`] is created from `--timeout` at the start of a run and
//! cloned into each stage. Clones share a cancellation token, so Ctrl-C or the
//! deadline elapsing stops the issuer readiness loop and the reachability
//! loop alike.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Longest deadline a run can have; larger timeouts are clamped to it.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Deadline for a single resolution run
#[derive(Clone, Debug)]
pub struct Deadline {
    expires_at: Instant,
    cancel: CancellationToken,
}

impl Deadline {
    /// Create a deadline `timeout` from now, clamped to [`MAX_TIMEOUT`].
    pub fn after(timeout: Duration) -> Self {
        Self {
            expires_at: Instant::now() + timeout.min(MAX_TIMEOUT),
            cancel: CancellationToken::new(),
        }
    }

    /// Time left before the deadline.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Cancel the run ahead of the deadline.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Completes when the deadline elapses or the run is cancelled.
    pub async fn done(&self) {
        tokio::select! {
            _ = tokio::time::sleep_until(self.expires_at) => {}
            _ = self.cancel.cancelled() => {}
        }
    }

    /// The error to surface for `step` once [`Deadline::done`] has fired.
    pub fn error(&self, step: &str) -> Error {
        if Instant::now() >= self.expires_at {
            Error::DeadlineExceeded {
                step: step.to_string(),
            }
        } else {
            Error::Cancelled {
                step: step.to_string(),
            }
        }
    }

    /// Run `fut`, failing with a deadline error if the run ends first.
    pub async fn bound<T, F>(&self, step: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            result = fut => result,
            _ = self.done() => Err(self.error(step)),
        }
    }
}

/// Format a duration rounded to whole seconds for progress logs.
pub fn round_secs(duration: Duration) -> String {
    format!("{}s", duration.as_secs_f64().round() as u64)
}

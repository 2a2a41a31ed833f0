use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// What to do once every attempt has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnExhaustion {
    /// Report `RetryOutcome::Exhausted` and let the caller carry on.
    Continue,
    /// Return the last error.
    Fail,
}

/// Bounded retry with a fixed delay between attempts. The delay never grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub on_exhaustion: OnExhaustion,
}

impl RetryPolicy {
    pub fn continue_after(max_attempts: u32, delay: Duration) -> Self {
        RetryPolicy { max_attempts, delay, on_exhaustion: OnExhaustion::Continue }
    }

    pub fn fail_after(max_attempts: u32, delay: Duration) -> Self {
        RetryPolicy { max_attempts, delay, on_exhaustion: OnExhaustion::Fail }
    }
}

#[derive(Debug)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { last_error: Error, attempts: u32 },
    Cancelled { attempts: u32 },
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. } | RetryOutcome::Exhausted { attempts, .. } | RetryOutcome::Cancelled { attempts } => *attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded { .. })
    }
}

/// Runs `operation` under `policy` until it succeeds, the attempts run out or
/// `cancel` fires. A policy with zero attempts still makes one attempt.
///
/// Cancellation interrupts both a running attempt and the delay between
/// attempts.
pub async fn retry_with_policy<T, F, Fut>(policy: &RetryPolicy, cancel: &CancellationToken, mut operation: F) -> Result<RetryOutcome<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Ok(RetryOutcome::Cancelled { attempts: attempt - 1 });
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => return Ok(RetryOutcome::Cancelled { attempts: attempt }),
            result = operation(attempt) => result,
        };

        match result {
            Ok(value) => return Ok(RetryOutcome::Succeeded { value, attempts: attempt }),
            Err(e) => {
                tracing::debug!(attempt, max_attempts, error = %e, "attempt failed");
                last_error = Some(e);
            }
        }

        if attempt < max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(RetryOutcome::Cancelled { attempts: attempt }),
                _ = sleep(policy.delay) => {}
            }
        }
    }

    // The loop runs at least once and only falls through after a failure.
    let last_error = last_error.unwrap_or_else(|| Error::ConfigError("retry loop made no attempts".to_string()));

    match policy.on_exhaustion {
        OnExhaustion::Continue => Ok(RetryOutcome::Exhausted { last_error, attempts: max_attempts }),
        OnExhaustion::Fail => Err(last_error),
    }
}

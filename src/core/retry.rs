// src/core/retry.rs

//! A uniform bounded/unbounded retry policy for external I/O,
//! cancellation-aware so it never outlives an orderly shutdown.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::core::cancellation::CancellationToken;

/// `max_retries: None` means unbounded (retry forever, subject to cancellation).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_retries: Option<u32>,
}

impl RetryPolicy {
    pub fn bounded(interval: Duration, max_retries: u32) -> Self {
        Self {
            interval,
            max_retries: Some(max_retries),
        }
    }

    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_retries: None,
        }
    }
}

/// Runs `op` under `policy` against `cancel`. `op` returns a value from which
/// success can be read via `success_of`. The harness never panics or
/// propagates an error from `op` itself: it always returns the last result,
/// successful or not, leaving interpretation to the caller.
pub async fn retry<T, F, Fut>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
    success_of: impl Fn(&T) -> bool,
) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
{
    let mut attempt: u32 = 0;
    loop {
        let result = op().await;
        if success_of(&result) {
            return result;
        }

        attempt += 1;
        if let Some(max) = policy.max_retries {
            if attempt >= max {
                return result;
            }
        }

        if cancel.is_cancelled() {
            return result;
        }

        tokio::select! {
            _ = sleep(policy.interval) => {}
            _ = cancel.cancelled() => return result,
        }
    }
}

//! Backoff policy for message delivery

use std::sync::Arc;
use std::time::Duration;

type DelayFn = dyn Fn(u32) -> Duration + Send + Sync;

/// Bounded retry schedule parameterized by a count and a delay function.
///
/// Attempt 0 is the first delivery; retry `n` (1-based) waits `delay(n)`.
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Arc<DelayFn>,
}

impl RetryPolicy {
    pub fn new<F>(max_retries: u32, delay: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self {
            max_retries,
            delay: Arc::new(delay),
        }
    }

    /// `base × retry number`: 1s, 2s, 3s for a one-second base
    pub fn linear(max_retries: u32, base: Duration) -> Self {
        Self::new(max_retries, move |retry| base.saturating_mul(retry))
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before the next retry, or `None` once `retries_done` hits the limit
    pub fn next_delay(&self, retries_done: u32) -> Option<Duration> {
        if retries_done >= self.max_retries {
            return None;
        }
        Some((self.delay)(retries_done + 1))
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

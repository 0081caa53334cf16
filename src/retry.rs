use std::time::Duration;

use rand::Rng;

use crate::{ApiError, Jitter};

const TOO_MANY_REQUESTS: u16 = 429;
const MAX_BACKOFF_EXPONENT: usize = 16;

/// Retry budget and backoff shape for one call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: Jitter,
    pub retry_rate_limited: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum RetryDecision {
    Stop,
    RetryAfter(Duration),
}

impl RetryPolicy {
    /// Decides what happens after attempt `attempt` (zero-based) failed
    /// with `err`.
    pub fn decide(&self, err: &ApiError, attempt: usize) -> RetryDecision {
        if !err.kind().is_transient() || attempt >= self.max_retries {
            return RetryDecision::Stop;
        }

        if self.retry_rate_limited && err.status() == Some(TOO_MANY_REQUESTS) {
            let delay = err
                .retry_after()
                .map(|hint| hint.min(self.max_delay()))
                .unwrap_or_else(|| self.backoff(attempt));
            return RetryDecision::RetryAfter(delay);
        }

        // 4xx responses fail identically on retry.
        if err.is_client_error() {
            return RetryDecision::Stop;
        }

        RetryDecision::RetryAfter(self.backoff(attempt))
    }

    /// `base * 2^attempt`, capped by `max_delay_ms`, then jittered.
    pub fn backoff(&self, attempt: usize) -> Duration {
        let exp = attempt.min(MAX_BACKOFF_EXPONENT) as u32;
        let multiplier = 1u64 << exp;
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(multiplier)
            .min(self.max_delay_ms);

        let delay_ms = match self.jitter {
            Jitter::None => delay_ms,
            Jitter::Full => rand::rng().random_range(0..=delay_ms),
        };
        Duration::from_millis(delay_ms)
    }

    fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Randomization applied to computed backoff delays.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Jitter {
    /// Exact `base * 2^attempt` delays.
    #[default]
    None,
    /// Uniform delay in `[0, base * 2^attempt]`.
    Full,
}

/// Client-wide defaults for timeout and retry behavior.
///
/// Every field can be overridden per call through [`crate::RequestConfig`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Base retry backoff in milliseconds (exponential strategy).
    pub retry_base_delay_ms: u64,
    /// Upper bound for a single backoff sleep, including `Retry-After` hints.
    /// Unbounded by default, so delays follow `base * 2^attempt` exactly.
    pub max_retry_delay_ms: u64,
    /// Jitter strategy for computed backoff delays.
    pub jitter: Jitter,
    /// Retry `429 Too Many Requests` instead of treating it like other 4xx
    /// responses. When enabled, a `Retry-After` header replaces the computed
    /// delay.
    pub retry_rate_limited: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 3,
            retry_base_delay_ms: 1_000,
            max_retry_delay_ms: u64::MAX,
            jitter: Jitter::None,
            retry_rate_limited: false,
        }
    }
}

use std::time::Duration;

use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{error::ErrorKind, retry::RetryPolicy, ApiError, ClientOptions};

/// Per-call overlay on top of the client's [`ClientOptions`].
///
/// Unset fields fall back to the client defaults. `()` converts into the
/// default overlay, so `client.get::<T>("/path", ())` uses the defaults.
#[derive(Clone, Debug, Default)]
pub struct RequestConfig {
    /// HTTP method; the verb helpers on [`crate::ApiClient`] overwrite it.
    pub method: Method,
    /// Headers merged over the client's default headers.
    pub headers: HeaderMap,
    /// Serialized JSON body, shared across retries without copying.
    pub body: Option<Bytes>,
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<usize>,
    pub retry_base_delay_ms: Option<u64>,
    /// Aborts the call, including a pending backoff sleep, when cancelled.
    pub cancel: Option<CancellationToken>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Adds a header, replacing any previous value for the same name.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Serializes `body` as the JSON request body.
    ///
    /// Fails with [`ErrorKind::Encode`]; such failures are never retried.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let bytes = serde_json::to_vec(body).map_err(|err| {
            ApiError::new(
                ErrorKind::Encode,
                format!("failed to serialize request body: {err}"),
            )
        })?;
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn retry_base_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_base_delay_ms = Some(delay_ms);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Applies the overlay to the client defaults.
    pub(crate) fn resolve(&self, defaults: &ClientOptions) -> Result<Effective, ApiError> {
        let timeout_ms = self.timeout_ms.unwrap_or(defaults.timeout_ms);
        if timeout_ms == 0 {
            return Err(ApiError::new(
                ErrorKind::Config,
                "timeout_ms must be greater than zero",
            ));
        }

        let base_delay_ms = self
            .retry_base_delay_ms
            .unwrap_or(defaults.retry_base_delay_ms);
        if base_delay_ms == 0 {
            return Err(ApiError::new(
                ErrorKind::Config,
                "retry_base_delay_ms must be greater than zero",
            ));
        }

        Ok(Effective {
            timeout: Duration::from_millis(timeout_ms),
            retry: RetryPolicy {
                max_retries: self.max_retries.unwrap_or(defaults.max_retries),
                base_delay_ms,
                max_delay_ms: defaults.max_retry_delay_ms,
                jitter: defaults.jitter,
                retry_rate_limited: defaults.retry_rate_limited,
            },
        })
    }
}

impl From<()> for RequestConfig {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

/// Settings in force for one call after overlaying [`RequestConfig`].
#[derive(Clone, Debug)]
pub(crate) struct Effective {
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

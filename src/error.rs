use std::time::Duration;

pub(crate) const TIMEOUT_MESSAGE: &str = "Request timeout";
pub(crate) const CANCELLED_MESSAGE: &str = "Request cancelled";

/// What kind of failure produced an [`ApiError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The attempt did not settle within the per-attempt timeout.
    Timeout,
    /// Connection, DNS or body-read failure; no response was obtained.
    Transport,
    /// The server answered with a non-success status.
    Http,
    /// The request body could not be serialized to JSON.
    Encode,
    /// A success response body could not be decoded.
    Decode,
    /// Invalid request configuration (zero timeout or delay, malformed URL).
    Config,
    /// The caller's cancellation token fired.
    Cancelled,
}

impl ErrorKind {
    /// Whether another attempt could change the outcome.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Timeout | Self::Transport | Self::Http)
    }
}

/// Coarse classification of an error for caller-side handling, derived from
/// the HTTP status.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCategory {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    ClientError,
    ServerError,
    ServiceUnavailable,
    Network,
    Other,
}

/// One failed attempt of a logical request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttemptFailure {
    /// Zero-based attempt index.
    pub attempt: usize,
    pub kind: ErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

/// The single error shape returned by [`crate::ApiClient`].
///
/// Transport errors, timeouts and non-success responses are all normalized
/// into this type before they reach the caller.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    details: Option<serde_json::Value>,
    retry_after: Option<Duration>,
    attempts: Vec<AttemptFailure>,
}

impl ApiError {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            details: None,
            retry_after: None,
            attempts: Vec::new(),
        }
    }

    pub(crate) fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Http, message).with_status(status)
    }

    pub(crate) fn timeout() -> Self {
        Self::new(ErrorKind::Timeout, TIMEOUT_MESSAGE)
    }

    pub(crate) fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, CANCELLED_MESSAGE)
    }

    pub(crate) fn transport(err: &reqwest::Error) -> Self {
        Self::new(ErrorKind::Transport, transport_message(err))
    }

    pub(crate) fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub(crate) fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub(crate) fn with_retry_after(mut self, delay: Option<Duration>) -> Self {
        self.retry_after = delay;
        self
    }

    pub(crate) fn with_attempts(mut self, attempts: Vec<AttemptFailure>) -> Self {
        self.attempts = attempts;
        self
    }

    pub(crate) fn to_attempt_failure(&self, attempt: usize) -> AttemptFailure {
        AttemptFailure {
            attempt,
            kind: self.kind,
            status: self.status,
            message: self.message.clone(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable message. Always present.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status code, absent for timeouts and transport failures.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// JSON body of the error response, when it parsed.
    pub fn details(&self) -> Option<&serde_json::Value> {
        self.details.as_ref()
    }

    /// Delay requested by the server through `Retry-After`.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Every failed attempt of the call, in order. Empty when the call
    /// failed before its first attempt.
    pub fn attempts(&self) -> &[AttemptFailure] {
        &self.attempts
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }

    /// Returns `true` for statuses in `[400, 500)`.
    pub fn is_client_error(&self) -> bool {
        self.status.is_some_and(|status| (400..500).contains(&status))
    }

    pub fn category(&self) -> ErrorCategory {
        match self.status {
            Some(400) => ErrorCategory::BadRequest,
            Some(401) => ErrorCategory::Unauthorized,
            Some(403) => ErrorCategory::Forbidden,
            Some(404) => ErrorCategory::NotFound,
            Some(429) => ErrorCategory::RateLimited,
            Some(502..=504) => ErrorCategory::ServiceUnavailable,
            Some(400..=499) => ErrorCategory::ClientError,
            Some(500..=599) => ErrorCategory::ServerError,
            Some(_) => ErrorCategory::Other,
            None if matches!(self.kind, ErrorKind::Timeout | ErrorKind::Transport) => {
                ErrorCategory::Network
            }
            None => ErrorCategory::Other,
        }
    }
}

fn transport_message(err: &reqwest::Error) -> String {
    if err.is_connect() {
        format!("connection failed: {err}")
    } else if err.is_body() || err.is_decode() {
        format!("failed to read response body: {err}")
    } else {
        format!("network error: {err}")
    }
}

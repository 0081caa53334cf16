use std::fmt::{self, Display};
use std::future;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Method, Url,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use crate::{
    decode::{decode_success, error_from_response, merge_headers},
    error::ErrorKind,
    retry::RetryDecision,
    ApiError, ClientOptions, Payload, RequestConfig, Result,
};

/// JSON API client with per-attempt timeouts and exponential backoff retry.
///
/// Cloning is cheap: clones share the underlying connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    default_headers: HeaderMap,
    options: ClientOptions,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Header values may carry credentials; only names are shown.
        let header_names: Vec<&str> = self
            .default_headers
            .keys()
            .map(|name| name.as_str())
            .collect();
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("default_headers", &header_names)
            .field("options", &self.options)
            .finish()
    }
}

impl ApiClient {
    /// Creates a client for `base_url` with default options.
    ///
    /// Endpoints are appended verbatim, so `ApiClient::new("https://host/api")`
    /// followed by `get("/users", ())` requests `https://host/api/users`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            default_headers,
            options: ClientOptions::default(),
        }
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `API_BASE_URL` — base URL prepended to every endpoint (required)
    /// - `API_TIMEOUT_MS` — per-attempt timeout
    /// - `API_MAX_RETRIES` — retries after the first attempt
    /// - `API_RETRY_BASE_DELAY_MS` — exponential backoff base
    ///
    /// Unset numeric variables keep their [`ClientOptions`] defaults.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use resilient_api_client::ApiClient;
    ///
    /// let api = ApiClient::from_env().expect("missing API_BASE_URL");
    /// ```
    pub fn from_env() -> std::result::Result<Self, String> {
        let base_url = std::env::var("API_BASE_URL")
            .map_err(|_| "missing API_BASE_URL environment variable".to_owned())?;
        if base_url.trim().is_empty() {
            return Err("API_BASE_URL is set but empty".to_owned());
        }

        let defaults = ClientOptions::default();
        let options = ClientOptions {
            timeout_ms: env_or("API_TIMEOUT_MS", defaults.timeout_ms)?,
            max_retries: env_or("API_MAX_RETRIES", defaults.max_retries)?,
            retry_base_delay_ms: env_or("API_RETRY_BASE_DELAY_MS", defaults.retry_base_delay_ms)?,
            ..defaults
        };
        Ok(Self::new(base_url).with_options(options))
    }

    /// Applies client-wide timeout and retry defaults.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Adds headers sent with every request. Values replace the built-in
    /// `Content-Type: application/json` and earlier defaults of the same name.
    pub fn with_default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = merge_headers(&self.default_headers, &headers);
        self
    }

    /// Uses a preconfigured `reqwest::Client` (proxies, TLS roots, pools).
    ///
    /// Timeouts configured on that client apply in addition to `timeout_ms`.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sends a `GET` request and decodes the response into `T`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        config: impl Into<RequestConfig>,
    ) -> Result<T> {
        self.request(endpoint, config.into().method(Method::GET)).await
    }

    /// Sends a `POST` request with `body` serialized as JSON.
    pub async fn post<T, B>(
        &self,
        endpoint: &str,
        body: &B,
        config: impl Into<RequestConfig>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::POST, endpoint, body, config.into()).await
    }

    /// Sends a `PUT` request with `body` serialized as JSON.
    pub async fn put<T, B>(
        &self,
        endpoint: &str,
        body: &B,
        config: impl Into<RequestConfig>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::PUT, endpoint, body, config.into()).await
    }

    /// Sends a `PATCH` request with `body` serialized as JSON.
    pub async fn patch<T, B>(
        &self,
        endpoint: &str,
        body: &B,
        config: impl Into<RequestConfig>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::PATCH, endpoint, body, config.into()).await
    }

    /// Sends a `DELETE` request and decodes the response into `T`.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        config: impl Into<RequestConfig>,
    ) -> Result<T> {
        self.request(endpoint, config.into().method(Method::DELETE)).await
    }

    /// Executes `config.method` against `endpoint` and decodes the response
    /// into `T`.
    ///
    /// A text response decodes into `String` or `serde_json::Value`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        config: RequestConfig,
    ) -> Result<T> {
        self.execute(endpoint, config, Payload::deserialize::<T>).await
    }

    /// Executes `config.method` against `endpoint` with timeout and retry,
    /// returning the undecoded [`Payload`].
    ///
    /// Attempt `n` (zero-based) that fails with a retryable error is followed
    /// by a `retry_base_delay_ms * 2^n` sleep. Responses in `[400, 500)` end
    /// the call at once.
    pub async fn request_payload(&self, endpoint: &str, config: RequestConfig) -> Result<Payload> {
        self.execute(endpoint, config, Ok).await
    }

    /// Attempt loop shared by [`ApiClient::request`] and
    /// [`ApiClient::request_payload`]. `decode` runs inside each attempt so
    /// its failures carry the response status and appear in the history.
    async fn execute<T, F>(&self, endpoint: &str, config: RequestConfig, decode: F) -> Result<T>
    where
        F: Fn(Payload) -> Result<T>,
    {
        let effective = config.resolve(&self.options)?;
        let url = self.endpoint_url(endpoint)?;
        let headers = merge_headers(&self.default_headers, &config.headers);
        let cancel = config.cancel.as_ref();

        let mut attempt = 0usize;
        let mut failures = Vec::new();
        loop {
            // A request is only counted once it has been handed to the transport.
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(ApiError::cancelled().with_attempts(failures));
            }

            let outcome = self
                .attempt(
                    &config.method,
                    &url,
                    &headers,
                    config.body.as_ref(),
                    effective.timeout,
                    cancel,
                    &decode,
                )
                .await;

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            failures.push(err.to_attempt_failure(attempt));

            match effective.retry.decide(&err, attempt) {
                RetryDecision::Stop => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        method = %config.method,
                        url = %url,
                        attempts = attempt + 1,
                        status = ?err.status(),
                        "request failed: {}",
                        err.message()
                    );
                    return Err(err.with_attempts(failures));
                }
                RetryDecision::RetryAfter(delay) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        method = %config.method,
                        url = %url,
                        attempt,
                        status = ?err.status(),
                        "retrying request after {} ms: {}",
                        delay.as_millis(),
                        err.message()
                    );
                    if let Err(interrupted) = wait_before_retry(delay, cancel).await {
                        return Err(interrupted.with_attempts(failures));
                    }
                    attempt += 1;
                }
            }
        }
    }

    async fn send_json<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
        config: RequestConfig,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let config = config.method(method).json(body)?;
        self.request(endpoint, config).await
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        let raw = format!("{}{}", self.base_url, endpoint);
        Url::parse(&raw).map_err(|err| {
            ApiError::new(
                ErrorKind::Config,
                format!("invalid request URL '{raw}': {err}"),
            )
        })
    }

    /// Runs one attempt raced against the timeout and the cancellation
    /// token. Losing futures are dropped, which aborts the in-flight call.
    #[allow(clippy::too_many_arguments)]
    async fn attempt<T, F>(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&Bytes>,
        limit: Duration,
        cancel: Option<&CancellationToken>,
        decode: &F,
    ) -> Result<T>
    where
        F: Fn(Payload) -> Result<T>,
    {
        let exchange = self.exchange(method, url, headers, body, decode);
        tokio::select! {
            biased;
            () = cancelled(cancel) => Err(ApiError::cancelled()),
            outcome = timeout(limit, exchange) => {
                outcome.unwrap_or_else(|_| Err(ApiError::timeout()))
            }
        }
    }

    async fn exchange<T, F>(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&Bytes>,
        decode: &F,
    ) -> Result<T>
    where
        F: Fn(Payload) -> Result<T>,
    {
        let mut builder = self
            .http
            .request(method.clone(), url.clone())
            .headers(headers.clone());
        if let Some(body) = body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|err| ApiError::transport(&err))?;
        let status = response.status();
        let response_headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|err| ApiError::transport(&err))?;

        if status.is_success() {
            let payload = decode_success(status, &response_headers, body)?;
            decode(payload).map_err(|err| err.with_status(status.as_u16()))
        } else {
            Err(error_from_response(status, &response_headers, &body))
        }
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => future::pending().await,
    }
}

/// Sleeps for the backoff delay unless the call is cancelled first.
async fn wait_before_retry(delay: Duration, cancel: Option<&CancellationToken>) -> Result<()> {
    tokio::select! {
        biased;
        () = cancelled(cancel) => Err(ApiError::cancelled()),
        () = sleep(delay) => Ok(()),
    }
}

fn env_or<T>(name: &str, default: T) -> std::result::Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|err| format!("invalid {name} environment variable: {err}")),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(format!("invalid {name} environment variable: {err}")),
    }
}

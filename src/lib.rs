//! `resilient-api-client` is an async JSON API client that survives flaky
//! backends.
//!
//! Every call goes through [`ApiClient::request`]:
//! - each attempt is bounded by a per-attempt timeout
//! - transport failures, timeouts and `5xx` responses are retried with
//!   exponential backoff (`retry_base_delay_ms * 2^attempt`)
//! - `4xx` responses end the call at once
//! - every failure reaches the caller as one [`ApiError`]
//!
//! ```no_run
//! use resilient_api_client::{ApiClient, RequestConfig};
//! use serde_json::Value;
//!
//! # async fn run() -> resilient_api_client::Result<()> {
//! let api = ApiClient::new("https://api.example.com");
//! let students: Value = api.get("/students", ()).await?;
//! let created: Value = api
//!     .post("/tasks", &serde_json::json!({"title": "Grade essays"}), RequestConfig::new().max_retries(0))
//!     .await?;
//! # let _ = (students, created);
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod decode;
mod error;
mod options;
mod retry;
mod types;

pub use client::ApiClient;
pub use config::RequestConfig;
pub use error::{ApiError, AttemptFailure, ErrorCategory, ErrorKind};
pub use options::{ClientOptions, Jitter};
pub use types::Payload;

pub use reqwest::{header, Method};
pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, ApiError>;

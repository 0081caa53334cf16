use std::time::{Duration, SystemTime};

use reqwest::{
    header::{self, HeaderMap},
    StatusCode,
};

use crate::{error::ErrorKind, ApiError, Payload};

pub(crate) fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("application/json"))
}

/// Decodes a success body: JSON when the response says so, raw text
/// otherwise. An empty JSON body decodes as `null`.
pub(crate) fn decode_success(
    status: StatusCode,
    headers: &HeaderMap,
    body: String,
) -> Result<Payload, ApiError> {
    if !is_json_content_type(headers) {
        return Ok(Payload::Text(body));
    }
    if body.trim().is_empty() {
        return Ok(Payload::Json(serde_json::Value::Null));
    }

    serde_json::from_str(&body).map(Payload::Json).map_err(|err| {
        ApiError::new(
            ErrorKind::Decode,
            format!("invalid JSON in response body: {err}"),
        )
        .with_status(status.as_u16())
    })
}

/// Normalizes a non-success response into an [`ApiError`].
///
/// A JSON body becomes `details`, and its string `message` field (if any)
/// becomes the message; otherwise the status reason phrase is used.
pub(crate) fn error_from_response(status: StatusCode, headers: &HeaderMap, body: &str) -> ApiError {
    let details = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = details
        .as_ref()
        .and_then(|value| value.get("message"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| status_text(status));

    let err = ApiError::http(status.as_u16(), message).with_retry_after(parse_retry_after(headers));
    match details {
        Some(details) => err.with_details(details),
        None => err,
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

/// Parses `Retry-After` as delta-seconds or an HTTP-date.
///
/// Dates in the past and negative values yield `None`.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(header::RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(seconds) = value.parse::<i64>() {
        return u64::try_from(seconds).ok().map(Duration::from_secs);
    }

    let at = httpdate::parse_http_date(value).ok()?;
    at.duration_since(SystemTime::now()).ok()
}

/// Merges per-call headers over defaults. Every value of a default header
/// whose name appears in `overrides` is replaced.
pub(crate) fn merge_headers(defaults: &HeaderMap, overrides: &HeaderMap) -> HeaderMap {
    let mut merged = defaults.clone();
    for name in overrides.keys() {
        merged.remove(name);
        for value in overrides.get_all(name) {
            merged.append(name.clone(), value.clone());
        }
    }
    merged
}

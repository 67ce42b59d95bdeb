//! HTTP retry helpers for transient errors.
//!
//! Every fetch path should use [`send_json`] or [`send_text`] instead of
//! calling `reqwest::RequestBuilder::send()` directly. This ensures each
//! HTTP request gets automatic retry with exponential backoff for transient
//! failures (timeouts, connection resets, server errors, rate limiting),
//! while permanent client errors fail immediately.
//!
//! # Usage
//!
//! ```ignore
//! use venue_map_source::retry;
//!
//! // Simple GET → JSON
//! let body = retry::send_json(|| client.get(&url)).await?;
//!
//! // GET with query params
//! let body = retry::send_json(|| client.get(&url).query(&params)).await?;
//!
//! // GET → text (HTML pages)
//! let html = retry::send_text(|| client.get(&url)).await?;
//! ```

use std::time::Duration;

use crate::SourceError;

/// Maximum number of retry attempts for transient HTTP errors
/// (connection failures, timeouts, 429, 5xx).
///
/// With exponential backoff (2s, 4s, 8s, 16s, 32s) the total wait before
/// giving up is 62 seconds.
const MAX_RETRIES: u32 = 5;

/// Maximum number of full re-fetch attempts when the response body cannot
/// be decoded (truncated JSON, garbled response).
///
/// Each body-decode retry goes through [`send_inner`] again, so
/// connection-level retries still apply.
const MAX_BODY_RETRIES: u32 = 2;

/// Maximum number of characters of the response body included in error
/// logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (since builders are consumed by
/// `.send()`). This allows retrying any request shape.
///
/// # Retry behaviour
///
/// Two layers of retry:
///
/// 1. **Connection-level** ([`send_inner`]): retries up to [`MAX_RETRIES`]
///    times with exponential backoff on connection errors, timeouts,
///    HTTP 429, and HTTP 5xx.
/// 2. **Body-decode**: if the response arrives but the body cannot be
///    parsed as JSON, the entire request is re-fetched up to
///    [`MAX_BODY_RETRIES`] times.
///
/// Does **not** retry HTTP 4xx (except 429).
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails after all retries, the
/// server returns a non-retryable status code, or the body never parses
/// as JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    for body_attempt in 0..=MAX_BODY_RETRIES {
        let response = send_inner(&build_request, MAX_RETRIES).await?;

        let url = response.url().to_string();
        let status = response.status();

        // Read the raw body as text first, then parse as JSON. This lets
        // us log the actual response content on failure.
        match response.text().await {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(value) => return Ok(value),
                Err(json_err) => {
                    let preview = if text.len() > BODY_PREVIEW_LEN {
                        let cut: String = text.chars().take(BODY_PREVIEW_LEN).collect();
                        format!("{cut}...")
                    } else {
                        text.clone()
                    };
                    if body_attempt < MAX_BODY_RETRIES {
                        let delay = Duration::from_secs(1u64 << (body_attempt + 1));
                        log::warn!(
                            "JSON parse failed (body retry {}/{MAX_BODY_RETRIES}), \
                             re-fetching in {delay:?}...\n  \
                             url: {url}\n  \
                             status: {status}\n  \
                             received: {} bytes\n  \
                             parse error: {json_err}\n  \
                             body preview: {preview}",
                            body_attempt + 1,
                            text.len(),
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    log::error!(
                        "JSON parse failed after {MAX_BODY_RETRIES} retries, giving up.\n  \
                         url: {url}\n  \
                         status: {status}\n  \
                         received: {} bytes\n  \
                         parse error: {json_err}\n  \
                         body preview: {preview}",
                        text.len(),
                    );
                    return Err(SourceError::Fetch {
                        message: format!(
                            "JSON parse failed: {json_err} (status={status}, received {} bytes)",
                            text.len()
                        ),
                    });
                }
            },
            Err(e) => {
                if body_attempt < MAX_BODY_RETRIES {
                    let delay = Duration::from_secs(1u64 << (body_attempt + 1));
                    log::warn!(
                        "Response body read failed (body retry {}/{MAX_BODY_RETRIES}), \
                         re-fetching in {delay:?}... url: {url} status: {status} error: {e}",
                        body_attempt + 1,
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                log::error!(
                    "Response body read failed after {MAX_BODY_RETRIES} retries, giving up. \
                     url: {url} status: {status} error: {e}"
                );
                return Err(SourceError::Http(e));
            }
        }
    }

    // Unreachable — the loop always returns via Ok or Err.
    unreachable!("send_json body-decode retry loop exited without returning")
}

/// Sends an HTTP request and returns the response body as a `String`.
///
/// Behaves identically to [`send_json`] but returns raw text instead of
/// parsed JSON. Used for HTML pages and CSV downloads.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails after all retries or the
/// body cannot be read as text.
#[allow(clippy::future_not_send)]
pub async fn send_text<F>(build_request: F) -> Result<String, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    for body_attempt in 0..=MAX_BODY_RETRIES {
        let response = send_inner(&build_request, MAX_RETRIES).await?;

        let url = response.url().to_string();
        let status = response.status();

        match response.text().await {
            Ok(text) => return Ok(text),
            Err(e) => {
                if body_attempt < MAX_BODY_RETRIES {
                    let delay = Duration::from_secs(1u64 << (body_attempt + 1));
                    log::warn!(
                        "Text body read failed (body retry {}/{MAX_BODY_RETRIES}), \
                         re-fetching in {delay:?}... url: {url} status: {status} error: {e}",
                        body_attempt + 1,
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                log::error!(
                    "Text body read failed after {MAX_BODY_RETRIES} retries, giving up. \
                     url: {url} status: {status} error: {e}"
                );
                return Err(SourceError::Http(e));
            }
        }
    }

    unreachable!("send_text body-decode retry loop exited without returning")
}

/// Core retry loop shared by [`send_json`] and [`send_text`].
///
/// Sends the request built by `build_request`, retrying on transient
/// errors up to `max_retries` times with exponential backoff. Returns
/// the successful [`reqwest::Response`] (status 2xx or 3xx).
#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    build_request: &F,
    max_retries: u32,
) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_error: Option<SourceError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << attempt); // 2s, 4s, 8s
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        let result = build_request().send().await;

        match result {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    last_error = Some(SourceError::Http(e));
                    continue;
                }
                return Err(SourceError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if is_retryable_status(status) {
                    if attempt < max_retries {
                        log::warn!("  HTTP {status}");
                        last_error = Some(SourceError::Fetch {
                            message: format!("HTTP {status}"),
                        });
                        continue;
                    }
                    return Err(SourceError::Fetch {
                        message: format!("HTTP {status} after {max_retries} retries"),
                    });
                }

                // 4xx Client Error (not 429) — permanent, don't retry.
                if status.is_client_error() {
                    return Err(SourceError::Fetch {
                        message: format!("HTTP {status}"),
                    });
                }

                return Ok(response);
            }
        }
    }

    // Should be unreachable, but in case the loop exits without returning:
    Err(last_error.unwrap_or_else(|| SourceError::Fetch {
        message: "request failed after all retries".to_string(),
    }))
}

/// Returns `true` for HTTP statuses worth retrying: 429 Too Many Requests
/// and all 5xx server errors.
#[must_use]
pub fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiting_and_server_errors_are_retryable() {
        assert!(is_retryable_status(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR
        ));
        assert!(is_retryable_status(reqwest::StatusCode::SERVICE_UNAVAILABLE));
    }

    #[test]
    fn client_errors_are_permanent() {
        assert!(!is_retryable_status(reqwest::StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(reqwest::StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(reqwest::StatusCode::FORBIDDEN));
    }

    #[test]
    fn success_is_not_retryable() {
        assert!(!is_retryable_status(reqwest::StatusCode::OK));
        assert!(!is_retryable_status(reqwest::StatusCode::FOUND));
    }
}

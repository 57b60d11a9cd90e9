//! Retry with exponential backoff for evidence downloads.
//!
//! Only transport errors (connection refused, reset, timeout) are retried.
//! A response with any status code is returned to the caller as-is; a 404
//! from object storage will not turn into a 200 by asking again.

use std::time::Duration;

/// Retry attempts after the initial request.
const MAX_RETRIES: u32 = 3;

/// Delay before the first retry; doubles each attempt (200ms, 400ms, 800ms).
const BASE_DELAY_MS: u64 = 200;

/// Call `f` until it yields a response or the retries run out.
pub(crate) async fn retry_send<F, Fut>(url: &str, f: F) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..MAX_RETRIES {
        match f().await {
            Ok(resp) => return Ok(resp),
            Err(e) => {
                let delay = Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt));
                tracing::debug!(
                    url,
                    attempt = attempt + 1,
                    max_retries = MAX_RETRIES,
                    "evidence request failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
    f().await
}

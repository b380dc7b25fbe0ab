//! Retry logic with exponential backoff for ledger gateway calls.
//!
//! Retries transport errors and gateway overload statuses (502, 503, 504).
//! Every other response, including other 5xx, is returned to the caller
//! after the first attempt.

use crate::config::RetryPolicy;

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    matches!(
        status,
        reqwest::StatusCode::BAD_GATEWAY
            | reqwest::StatusCode::SERVICE_UNAVAILABLE
            | reqwest::StatusCode::GATEWAY_TIMEOUT
    )
}

/// Send an HTTP request, retrying per `policy`.
///
/// The closure `f` is called up to `policy.max_retries + 1` times.
/// Delays double from `policy.base_delay`: 200ms then 400ms by default.
pub(crate) async fn retry_send<F, Fut>(
    policy: RetryPolicy,
    f: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..policy.max_retries {
        let delay = policy.base_delay * 2u32.pow(attempt);
        match f().await {
            Ok(resp) if is_retryable_status(resp.status()) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    status = resp.status().as_u16(),
                    "ledger gateway overloaded, retrying in {delay:?}"
                );
            }
            Ok(resp) => return Ok(resp),
            Err(e) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    "ledger gateway request failed, retrying in {delay:?}: {e}"
                );
            }
        }
        tokio::time::sleep(delay).await;
    }
    // Final attempt, result returned as-is.
    f().await
}

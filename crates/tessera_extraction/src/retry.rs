//! Retry logic with exponential backoff for HTTP API calls.
//!
//! Retries on transient errors (429 rate limit, 5xx server errors,
//! network timeouts). Does NOT retry on client errors (400, 401, 403).

use crate::error::ExtractError;
use reqwest::{Response, StatusCode};
use std::time::Duration;
use tessera_core::RetryConfig;

/// Determine if a status code is retryable.
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS         // 429
        || status == StatusCode::INTERNAL_SERVER_ERROR // 500
        || status == StatusCode::BAD_GATEWAY           // 502
        || status == StatusCode::SERVICE_UNAVAILABLE   // 503
        || status == StatusCode::GATEWAY_TIMEOUT       // 504
        || status == StatusCode::REQUEST_TIMEOUT // 408
}

/// Map a failed HTTP status to the extraction error taxonomy.
pub(crate) fn error_for_status(status: StatusCode, body: &str) -> ExtractError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ExtractError::Auth(format!("{}: {}", status, truncate(body, 200)))
        }
        StatusCode::TOO_MANY_REQUESTS => ExtractError::RateLimited,
        _ => ExtractError::Network(format!("{}: {}", status, truncate(body, 200))),
    }
}

/// Execute an async HTTP operation with bounded exponential backoff.
///
/// The `operation` closure is called repeatedly until it returns a
/// successful response, a non-retryable error, or `max_attempts` is
/// exhausted. Returns the successful `Response`, or the last error
/// mapped into the taxonomy.
pub async fn with_retry<F, Fut>(
    config: &RetryConfig,
    provider_name: &str,
    operation: F,
) -> Result<Response, ExtractError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
{
    let mut delay = Duration::from_millis(config.initial_delay_ms);
    let max_delay = Duration::from_millis(config.max_delay_ms);
    let mut last_error = ExtractError::Network("no attempts made".to_string());

    for attempt in 1..=config.max_attempts.max(1) {
        match operation().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    if attempt > 1 {
                        tracing::info!("{} succeeded on attempt {}", provider_name, attempt);
                    }
                    return Ok(response);
                }

                let body = response.text().await.unwrap_or_default();
                let err = error_for_status(status, &body);

                if !is_retryable_status(status) {
                    // 400, 401, 403, etc. fail immediately
                    return Err(err);
                }

                tracing::warn!(
                    "{} returned {} on attempt {}/{}: {}",
                    provider_name,
                    status,
                    attempt,
                    config.max_attempts,
                    truncate(&body, 200)
                );
                last_error = err;
            }
            Err(e) => {
                // Timeout, DNS failure, connection refused
                tracing::warn!(
                    "{} network error on attempt {}/{}: {}",
                    provider_name,
                    attempt,
                    config.max_attempts,
                    e
                );
                last_error = ExtractError::Network(e.to_string());
            }
        }

        if attempt < config.max_attempts {
            let sleep_time = delay + Duration::from_millis(rand_jitter());

            tracing::info!(
                "{} retrying in {:.1}s (attempt {}/{})",
                provider_name,
                sleep_time.as_secs_f64(),
                attempt + 1,
                config.max_attempts
            );

            tokio::time::sleep(sleep_time).await;

            delay = Duration::from_secs_f64(
                (delay.as_secs_f64() * config.backoff_factor).min(max_delay.as_secs_f64()),
            );
        }
    }

    Err(last_error)
}

/// Simple jitter: random 0-500ms using timestamp as poor-man's random.
fn rand_jitter() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 500) as u64
}

fn truncate(s: &str, max_len: usize) -> String {
    s.chars().take(max_len).collect()
}

//! Retry policy for transient request failures.

use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

/// Upper bound on any single wait between attempts.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Bounded retries with server-hinted or exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    #[must_use]
    pub const fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }

    /// Wait before the attempt that follows attempt number `attempt`.
    #[must_use]
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_delay(attempt, retry_after)
    }
}

/// Rate limiting and server-side failures worth another try.
#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

#[must_use]
pub fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

/// `Retry-After` in seconds. HTTP-date values are not honoured.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?;
    parse_retry_after_value(raw)
}

fn parse_retry_after_value(raw: &str) -> Option<Duration> {
    let seconds: f64 = raw.trim().parse().ok()?;
    if seconds.is_finite() && seconds >= 0.0 {
        Some(Duration::from_secs_f64(seconds.min(MAX_RETRY_DELAY.as_secs_f64())))
    } else {
        None
    }
}

/// The server hint when present, else `2^(attempt-1)` seconds. Capped.
#[must_use]
pub fn retry_delay(attempt: u32, retry_after: Option<Duration>) -> Duration {
    let delay = retry_after.unwrap_or_else(|| {
        let exponent = attempt.saturating_sub(1).min(16);
        Duration::from_secs(1_u64 << exponent)
    });
    delay.min(MAX_RETRY_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_retryable_statuses() {
        for status in [429, 500, 502, 503, 504] {
            assert!(is_retryable_status(status), "{status}");
        }
        for status in [400, 401, 403, 404, 501] {
            assert!(!is_retryable_status(status), "{status}");
        }
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        assert_eq!(retry_delay(1, None), Duration::from_secs(1));
        assert_eq!(retry_delay(2, None), Duration::from_secs(2));
        assert_eq!(retry_delay(3, None), Duration::from_secs(4));
        assert_eq!(retry_delay(12, None), MAX_RETRY_DELAY);
    }

    #[test]
    fn test_retry_after_wins_over_backoff() {
        assert_eq!(
            retry_delay(3, Some(Duration::from_secs(7))),
            Duration::from_secs(7)
        );
        assert_eq!(retry_delay(1, Some(Duration::from_secs(600))), MAX_RETRY_DELAY);
    }

    #[test]
    fn test_parse_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("5"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(5)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("1.5"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_millis(1500)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_policy_bounds_attempts() {
        let policy = RetryPolicy::new(3);
        assert!(policy.allows_retry_after(1));
        assert!(policy.allows_retry_after(3));
        assert!(!policy.allows_retry_after(4));
        assert!(!RetryPolicy::new(0).allows_retry_after(1));
    }
}

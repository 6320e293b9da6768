//! Retry policy.
//!
//! # Responsibilities
//! - Decide whether a finished attempt is retried
//! - Compute the wait before the next attempt, honouring `Retry-After`
//!
//! # Design Decisions
//! - Only rate limiting (429 with no transport error) is retried; the
//!   policy cannot see the HTTP verb, so it is uniform across methods
//! - Transport errors and every other status are terminal here

use std::time::Duration;

use reqwest::header::HeaderValue;
use reqwest::StatusCode;

use crate::config::RetryConfig;
use crate::resilience::backoff::{calculate_backoff, with_jitter};

/// Retry decision for one attempt.
pub trait RetryPolicy: Send + Sync {
    fn should_retry(&self, error: Option<&reqwest::Error>, status: Option<StatusCode>) -> bool;
}

/// Retries rate-limited responses only.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimitPolicy;

impl RetryPolicy for RateLimitPolicy {
    fn should_retry(&self, error: Option<&reqwest::Error>, status: Option<StatusCode>) -> bool {
        error.is_none() && status == Some(StatusCode::TOO_MANY_REQUESTS)
    }
}

/// Integer-seconds `Retry-After`. HTTP-date values are ignored.
pub fn parse_retry_after(value: &HeaderValue) -> Option<Duration> {
    value
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Wait before retry number `attempt` (0-based).
pub fn retry_delay(config: &RetryConfig, attempt: u32, retry_after: Option<Duration>) -> Duration {
    match retry_after {
        Some(requested) => requested.min(config.max_wait()),
        None => with_jitter(
            calculate_backoff(attempt, config.min_wait(), config.max_wait()),
            config.max_wait(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rate_limit_is_retried() {
        let policy = RateLimitPolicy;
        assert!(policy.should_retry(None, Some(StatusCode::TOO_MANY_REQUESTS)));

        for status in [
            StatusCode::OK,
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            assert!(!policy.should_retry(None, Some(status)), "retried {}", status);
        }
        assert!(!policy.should_retry(None, None));
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(
            parse_retry_after(&HeaderValue::from_static("7")),
            Some(Duration::from_secs(7))
        );
        assert_eq!(
            parse_retry_after(&HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT")),
            None
        );
    }

    #[test]
    fn test_retry_after_is_clamped() {
        let config = RetryConfig {
            max_retries: 3,
            min_wait_ms: 10,
            max_wait_ms: 2000,
        };
        assert_eq!(
            retry_delay(&config, 0, Some(Duration::from_secs(60))),
            Duration::from_millis(2000)
        );
        assert_eq!(
            retry_delay(&config, 0, Some(Duration::from_secs(1))),
            Duration::from_secs(1)
        );

        let d = retry_delay(&config, 2, None);
        assert!(d >= Duration::from_millis(40) && d <= Duration::from_millis(44));
    }
}

//! Exponential backoff.

use std::time::Duration;

use rand::Rng;

/// `min * 2^attempt`, clamped to `max`. Attempt 0 waits `min`.
pub fn calculate_backoff(attempt: u32, min: Duration, max: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt.min(31));
    min.saturating_mul(factor).min(max)
}

/// Add up to 10% jitter to `delay` without exceeding `max`.
pub fn with_jitter(delay: Duration, max: Duration) -> Duration {
    let jitter_range = (delay.as_millis() / 10) as u64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };
    (delay + Duration::from_millis(jitter)).min(max)
}

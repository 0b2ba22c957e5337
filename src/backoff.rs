// ABOUTME: Pure retry-delay computation for throttled requests
// ABOUTME: Exponential schedule with cap, jitter, and Retry-After parsing

use rand::Rng;
use std::time::Duration;

/// Retries after the first attempt before a request is given up on.
pub const MAX_RETRIES: u32 = 5;

const BASE_DELAY_MS: u64 = 500;
const MAX_DELAY_MS: u64 = 30_000;

/// Deterministic part of the schedule: `BASE * 2^attempt`, capped.
pub fn base_delay(attempt: u32) -> Duration {
    let exp = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
    let delay_ms = BASE_DELAY_MS.saturating_mul(exp).min(MAX_DELAY_MS);
    Duration::from_millis(delay_ms)
}

/// Delay to sleep before retry `attempt`, with uniform jitter in
/// `[0, delay/4]` so synchronized clients spread out.
pub fn retry_delay(attempt: u32) -> Duration {
    let base = base_delay(attempt);
    let jitter_cap = base.as_millis() as u64 / 4;
    let jitter = if jitter_cap > 0 {
        rand::thread_rng().gen_range(0..=jitter_cap)
    } else {
        0
    };
    base + Duration::from_millis(jitter)
}

/// Parse an integer-seconds `Retry-After` header value. The HTTP-date form
/// is not used by the Graph throttling responses this client talks to.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_delay_monotonic_and_capped() {
        let mut previous = Duration::ZERO;
        for attempt in 0..20 {
            let delay = base_delay(attempt);
            assert!(delay >= previous, "delay decreased at attempt {}", attempt);
            assert!(delay <= Duration::from_millis(MAX_DELAY_MS));
            previous = delay;
        }
    }

    #[test]
    fn test_base_delay_doubles_until_cap() {
        assert_eq!(base_delay(0), Duration::from_millis(500));
        assert_eq!(base_delay(1), Duration::from_millis(1000));
        assert_eq!(base_delay(2), Duration::from_millis(2000));
        assert_eq!(base_delay(10), Duration::from_millis(MAX_DELAY_MS));
    }

    #[test]
    fn test_base_delay_no_overflow_at_large_attempts() {
        assert_eq!(base_delay(200), Duration::from_millis(MAX_DELAY_MS));
    }

    #[test]
    fn test_retry_delay_jitter_bounded() {
        for attempt in 0..8 {
            let base = base_delay(attempt);
            for _ in 0..50 {
                let jittered = retry_delay(attempt);
                assert!(jittered >= base);
                assert!(jittered <= base + base / 4 + Duration::from_millis(1));
            }
        }
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after(" 0 "), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("not-a-number"), None);
        assert_eq!(parse_retry_after(""), None);
    }
}

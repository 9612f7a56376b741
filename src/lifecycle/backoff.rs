//! Retry delay policy for connection attempts
//!
//! `delay(n) = min(base × factor^(n-1), cap) + jitter`, with jitter drawn
//! uniformly from `[0, jitter)`. The base is derived from the attempt number
//! alone, so jitter never compounds across attempts.

use rand::Rng;
use std::time::Duration;

/// Smallest delay ever returned for an attempt
const MIN_DELAY: Duration = Duration::from_millis(1);

/// Exponential backoff with a cap and additive jitter
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the second attempt
    pub base: Duration,
    /// Multiplicative growth per attempt
    pub factor: f64,
    /// Upper bound on the un-jittered delay
    pub cap: Duration,
    /// Exclusive upper bound of the random jitter
    pub jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(2),
            factor: 1.5,
            cap: Duration::from_secs(30),
            jitter: Duration::from_secs(1),
        }
    }
}

impl BackoffPolicy {
    /// Delay without jitter for the given attempt (1-indexed; 0 is treated as 1)
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.max(1) - 1;
        let exp = exp.min(i32::MAX as u32) as i32;
        let secs = self.base.as_secs_f64() * self.factor.powi(exp);

        let delay = if !secs.is_finite() || secs > self.cap.as_secs_f64() {
            self.cap
        } else if secs < 0.0 {
            self.base
        } else {
            Duration::from_secs_f64(secs)
        };

        delay.max(MIN_DELAY)
    }

    /// Delay to wait after the given failed attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay(attempt) + self.sample_jitter()
    }

    fn sample_jitter(&self) -> Duration {
        let max_ms = self.jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> BackoffPolicy {
        BackoffPolicy {
            jitter: Duration::ZERO,
            ..BackoffPolicy::default()
        }
    }

    #[test]
    fn test_growth_without_jitter() {
        let policy = no_jitter();
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(3));
        assert_eq!(policy.delay(3), Duration::from_millis(4500));
    }

    #[test]
    fn test_attempt_zero_is_first_attempt() {
        let policy = no_jitter();
        assert_eq!(policy.delay(0), policy.delay(1));
    }

    #[test]
    fn test_capped() {
        let policy = no_jitter();
        assert_eq!(policy.base_delay(20), Duration::from_secs(30));
        assert_eq!(policy.base_delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_monotonic_up_to_cap() {
        let policy = BackoffPolicy::default();
        let mut previous = Duration::ZERO;
        for attempt in 1..=8 {
            let delay = policy.delay(attempt);
            assert!(delay > previous, "attempt {attempt}: {delay:?} <= {previous:?}");
            previous = delay;
        }
    }

    #[test]
    fn test_never_exceeds_cap_plus_jitter() {
        let policy = BackoffPolicy::default();
        for attempt in 1..=50 {
            assert!(policy.delay(attempt) < policy.cap + policy.jitter);
        }
    }

    #[test]
    fn test_jitter_stays_within_window() {
        let policy = BackoffPolicy::default();
        for attempt in [1, 4, 12] {
            let base = policy.base_delay(attempt);
            for _ in 0..100 {
                let delay = policy.delay(attempt);
                assert!(delay >= base);
                assert!(delay - base < policy.jitter);
            }
        }
    }

    #[test]
    fn test_never_zero() {
        let policy = BackoffPolicy {
            base: Duration::ZERO,
            factor: 2.0,
            cap: Duration::from_secs(1),
            jitter: Duration::ZERO,
        };
        assert!(policy.delay(1) > Duration::ZERO);
    }
}

use std::time::Duration;

/// Exponential backoff for retrying venue calls.
///
/// Formula: clamp(min_delay * factor^attempt, min_delay, max_delay)
///
/// There is no jitter, so the delay sequence is non-decreasing and
/// reproducible.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    min_delay: Duration,
    max_delay: Duration,
    factor: f64,
    attempt: u32,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(60), 1.2)
    }
}

impl ExponentialBackoff {
    /// Create a new ExponentialBackoff.
    ///
    /// # Arguments
    /// * `min_delay` - Delay before the first retry, and the floor for all others
    /// * `max_delay` - Delay cap. Raised to `min_delay` if smaller.
    /// * `factor` - Growth per attempt. Values below 1.0 (and NaN) are clamped to 1.0.
    pub fn new(min_delay: Duration, max_delay: Duration, factor: f64) -> Self {
        let factor = if factor.is_nan() { 1.0 } else { factor.max(1.0) };
        Self {
            min_delay,
            max_delay: max_delay.max(min_delay),
            factor,
            attempt: 0,
        }
    }

    /// Delay before retry number `attempt` (zero-based), without touching the counter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.min_delay.as_secs_f64() * self.factor.powi(exponent);

        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }

        Duration::from_secs_f64(secs).clamp(self.min_delay, self.max_delay)
    }

    /// Calculate the next delay and increment the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Reset the attempt counter.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Get current attempt number.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_backoff_increases_exponentially() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60), 2.0);

        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
        assert_eq!(backoff.next_delay(), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_caps_at_max() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(10), 2.0);

        for _ in 0..10 {
            backoff.next_delay();
        }

        assert_eq!(backoff.next_delay(), Duration::from_secs(10));
    }

    #[test]
    fn test_backoff_reset() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60), 2.0);

        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.attempt(), 2);

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_default_matches_critical_curve() {
        let backoff = ExponentialBackoff::default();
        assert_eq!(backoff.delay_for(0), Duration::from_secs(10));
        assert_eq!(backoff.delay_for(1), Duration::from_secs(12));
        // 10 * 1.2^10 is about 61.9s, past the cap
        assert_eq!(backoff.delay_for(10), Duration::from_secs(60));
    }

    #[test]
    fn test_factor_below_one_clamped() {
        let backoff = ExponentialBackoff::new(Duration::from_secs(5), Duration::from_secs(60), 0.5);
        assert_eq!(backoff.factor(), 1.0);
        assert_eq!(backoff.delay_for(7), Duration::from_secs(5));
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(300), 1.2);
        assert_eq!(backoff.delay_for(u32::MAX), Duration::from_secs(300));
    }

    #[test]
    fn test_max_below_min_raised() {
        let backoff = ExponentialBackoff::new(Duration::from_secs(10), Duration::from_secs(1), 2.0);
        assert_eq!(backoff.max_delay(), Duration::from_secs(10));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(10));
    }

    proptest! {
        #[test]
        fn prop_delay_non_decreasing_and_capped(
            min_ms in 1u64..20_000,
            extra_ms in 0u64..600_000,
            factor in 1.0f64..5.0,
            attempt in 0u32..200,
        ) {
            let min = Duration::from_millis(min_ms);
            let max = Duration::from_millis(min_ms + extra_ms);
            let backoff = ExponentialBackoff::new(min, max, factor);

            let current = backoff.delay_for(attempt);
            let next = backoff.delay_for(attempt + 1);

            prop_assert!(current <= next);
            prop_assert!(current >= min);
            prop_assert!(next <= max);
        }
    }
}

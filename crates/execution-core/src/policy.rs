//! Named retry policies.

use std::fmt;
use std::time::Duration;

use common::ExponentialBackoff;

/// Bounded or unbounded retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Give up after `max_attempts` retryable failures.
    Critical { max_attempts: u32 },
    /// Retry retryable failures until success.
    Forever,
}

/// How a venue call is retried.
///
/// `Critical` is for irreversible or time-sensitive calls (placement,
/// cancellation); `Forever` is for idempotent reads and polls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    kind: PolicyKind,
    backoff: ExponentialBackoff,
}

impl RetryPolicy {
    pub const CRITICAL_MAX_ATTEMPTS: u32 = 10;
    pub const BACKOFF_FACTOR: f64 = 1.2;
    pub const MIN_DELAY: Duration = Duration::from_secs(10);
    pub const CRITICAL_MAX_DELAY: Duration = Duration::from_secs(60);
    pub const FOREVER_MAX_DELAY: Duration = Duration::from_secs(300);

    pub fn new(kind: PolicyKind, min_delay: Duration, max_delay: Duration, factor: f64) -> Self {
        Self {
            kind,
            backoff: ExponentialBackoff::new(min_delay, max_delay, factor),
        }
    }

    /// 10 attempts, factor 1.2, 10s to 60s.
    pub fn critical() -> Self {
        Self::new(
            PolicyKind::Critical {
                max_attempts: Self::CRITICAL_MAX_ATTEMPTS,
            },
            Self::MIN_DELAY,
            Self::CRITICAL_MAX_DELAY,
            Self::BACKOFF_FACTOR,
        )
    }

    /// Unbounded, factor 1.2, 10s to 300s.
    pub fn forever() -> Self {
        Self::new(
            PolicyKind::Forever,
            Self::MIN_DELAY,
            Self::FOREVER_MAX_DELAY,
            Self::BACKOFF_FACTOR,
        )
    }

    /// Change the attempt bound. Has no effect on a `Forever` policy.
    /// Zero is raised to one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        if let PolicyKind::Critical { .. } = self.kind {
            self.kind = PolicyKind::Critical {
                max_attempts: max_attempts.max(1),
            };
        }
        self
    }

    pub fn with_backoff(mut self, min_delay: Duration, max_delay: Duration, factor: f64) -> Self {
        self.backoff = ExponentialBackoff::new(min_delay, max_delay, factor);
        self
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self.kind, PolicyKind::Critical { .. })
    }

    pub fn max_attempts(&self) -> Option<u32> {
        match self.kind {
            PolicyKind::Critical { max_attempts } => Some(max_attempts),
            PolicyKind::Forever => None,
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.backoff.min_delay()
    }

    pub fn max_delay(&self) -> Duration {
        self.backoff.max_delay()
    }

    pub fn factor(&self) -> f64 {
        self.backoff.factor()
    }

    /// Delay before retry `k`, where `k` is the number of failures so far
    /// minus one.
    pub fn delay_for(&self, k: u32) -> Duration {
        self.backoff.delay_for(k)
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PolicyKind::Critical { max_attempts } => write!(f, "critical({})", max_attempts),
            PolicyKind::Forever => write!(f, "forever"),
        }
    }
}

//! In-flight venue operations and cooperative cancellation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::policy::RetryPolicy;

/// Cooperative cancellation for a scheduled operation.
///
/// Cancellation is observed before the next attempt fires. An attempt that is
/// already executing runs to completion.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_canceled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver that wakes when the handle is canceled.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Bookkeeping for one venue call while it is being retried.
#[derive(Debug, Clone)]
pub struct PendingOperation {
    operation: String,
    policy: RetryPolicy,
    attempts: u32,
    accumulated_delay: Duration,
}

impl PendingOperation {
    pub fn new(operation: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            operation: operation.into(),
            policy,
            attempts: 0,
            accumulated_delay: Duration::ZERO,
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Total backoff scheduled so far.
    pub fn accumulated_delay(&self) -> Duration {
        self.accumulated_delay
    }

    /// Count one failed attempt.
    pub fn record_failure(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    /// Whether a bounded policy has used up its attempts.
    pub fn is_exhausted(&self) -> bool {
        self.policy
            .max_attempts()
            .is_some_and(|max| self.attempts >= max)
    }

    /// Delay before the next attempt, added to the running total.
    pub fn schedule_retry(&mut self) -> Duration {
        let delay = self.policy.delay_for(self.attempts.saturating_sub(1));
        self.accumulated_delay = self.accumulated_delay.saturating_add(delay);
        delay
    }
}

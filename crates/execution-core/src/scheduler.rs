//! Retry loop for venue calls.
//!
//! Each call runs as its own task: attempt, classify any failure, then either
//! surface it or suspend for the policy's backoff delay and try again. The
//! backoff wait is a `tokio` timer, so many polling loops can be pending at
//! once without holding threads.

use std::future::Future;

use metrics::SharedMetrics;
use tracing::{debug, error, info, warn};
use venue_core::{Classification, ErrorClassifier, VenueError};

use crate::error::RetryError;
use crate::pending::{CancelHandle, PendingOperation};
use crate::policy::RetryPolicy;

/// Runs venue operations under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RetryScheduler {
    classifier: ErrorClassifier,
    metrics: Option<SharedMetrics>,
}

impl RetryScheduler {
    pub fn new(classifier: ErrorClassifier) -> Self {
        Self {
            classifier,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Run `op` until it succeeds, fails fatally, runs out of attempts, or is
    /// canceled.
    ///
    /// A fatal failure is surfaced at once on any policy. A bounded policy
    /// with `max_attempts = n` calls `op` at most `n` times.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        policy: &RetryPolicy,
        cancel: &CancelHandle,
        mut op: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, VenueError>>,
    {
        let mut pending = PendingOperation::new(operation, policy.clone());
        let mut cancel_rx = cancel.subscribe();

        loop {
            if cancel.is_canceled() {
                if let Some(m) = &self.metrics {
                    m.inc_canceled_operations();
                }
                info!(
                    operation = %operation,
                    attempts = pending.attempts(),
                    "Operation canceled"
                );
                return Err(RetryError::Canceled {
                    operation: operation.to_string(),
                    attempts: pending.attempts(),
                });
            }

            let err = match op().await {
                Ok(value) => {
                    if pending.attempts() > 0 {
                        debug!(
                            operation = %operation,
                            attempts = pending.attempts() + 1,
                            waited_secs = pending.accumulated_delay().as_secs_f64(),
                            "Operation succeeded after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            pending.record_failure();

            if self.classifier.classify(&err) == Classification::Fatal {
                if let Some(m) = &self.metrics {
                    m.inc_fatal_errors();
                }
                error!(
                    operation = %operation,
                    attempts = pending.attempts(),
                    error = %err,
                    "Fatal venue error"
                );
                return Err(RetryError::Fatal(err));
            }

            if pending.is_exhausted() {
                if let Some(m) = &self.metrics {
                    m.inc_exhausted_operations();
                }
                error!(
                    operation = %operation,
                    attempts = pending.attempts(),
                    error = %err,
                    "Retries exhausted"
                );
                return Err(RetryError::Exhausted {
                    operation: operation.to_string(),
                    attempts: pending.attempts(),
                    last: err,
                });
            }

            let delay = pending.schedule_retry();
            if let Some(m) = &self.metrics {
                m.inc_retries();
            }

            if pending.attempts() == 1 {
                warn!(
                    operation = %operation,
                    policy = %policy,
                    error = %err,
                    delay_secs = delay.as_secs_f64(),
                    "Venue call failed, retrying"
                );
            } else {
                debug!(
                    operation = %operation,
                    attempt = pending.attempts(),
                    error = %err,
                    delay_secs = delay.as_secs_f64(),
                    "Retrying venue call"
                );
            }

            // Wait, waking early on cancel
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel_rx.changed() => {}
            }
        }
    }
}

//! Coordinator and runner configuration.

use std::time::Duration;

use execution_core::RetryPolicy;
use rust_decimal::Decimal;

use crate::error::CoordinatorError;

/// Configuration for the execution coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Wait between `checkOrder` polls of an unfilled order.
    pub order_check_interval: Duration,
    /// Polls before an unfilled order is canceled.
    pub max_order_checks: u32,
    /// Fraction of the available balance committed per order, in (0, 1].
    pub commit_fraction: Decimal,
    /// Policy for placement and cancellation.
    pub critical_policy: RetryPolicy,
    /// Policy for portfolio, ticker and order-status reads.
    pub forever_policy: RetryPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            order_check_interval: Duration::from_secs(10),
            max_order_checks: 6,
            commit_fraction: Decimal::ONE,
            critical_policy: RetryPolicy::critical(),
            forever_policy: RetryPolicy::forever(),
        }
    }
}

impl CoordinatorConfig {
    pub fn with_order_check_interval(mut self, interval: Duration) -> Self {
        self.order_check_interval = interval;
        self
    }

    pub fn with_max_order_checks(mut self, checks: u32) -> Self {
        self.max_order_checks = checks;
        self
    }

    pub fn with_commit_fraction(mut self, fraction: Decimal) -> Self {
        self.commit_fraction = fraction;
        self
    }

    pub fn with_critical_policy(mut self, policy: RetryPolicy) -> Self {
        self.critical_policy = policy;
        self
    }

    pub fn with_forever_policy(mut self, policy: RetryPolicy) -> Self {
        self.forever_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), CoordinatorError> {
        if self.max_order_checks == 0 {
            return Err(CoordinatorError::InvalidConfig(
                "max_order_checks must be at least 1".to_string(),
            ));
        }
        if self.commit_fraction <= Decimal::ZERO || self.commit_fraction > Decimal::ONE {
            return Err(CoordinatorError::InvalidConfig(format!(
                "commit_fraction must be in (0, 1], got {}",
                self.commit_fraction
            )));
        }
        Ok(())
    }
}

/// Configuration for the strategy runner.
#[derive(Debug, Clone)]
pub struct StrategyRunnerConfig {
    /// Capacity of the snapshot channel.
    pub snapshot_capacity: usize,
    /// Capacity of the advice broadcast channel.
    pub advice_capacity: usize,
    /// Settle each advice before reading the next snapshot.
    pub inline_execution: bool,
}

impl Default for StrategyRunnerConfig {
    fn default() -> Self {
        Self {
            snapshot_capacity: 1024,
            advice_capacity: 256,
            inline_execution: false,
        }
    }
}

impl StrategyRunnerConfig {
    pub fn with_inline_execution(mut self, inline: bool) -> Self {
        self.inline_execution = inline;
        self
    }
}

//! Strategy runner error types.

use execution_core::RetryError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from turning advice into venue orders.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinatorError {
    /// No venue is registered for the pair.
    #[error("no venue registered for {0}")]
    UnknownPair(String),

    /// Another order for the pair is still being placed or settled.
    #[error("order placement already in flight for {0}")]
    PlacementInFlight(String),

    /// The sized order is smaller than the market accepts.
    #[error("order of {amount} on {pair} below minimal order {minimum}")]
    BelowMinimalOrder {
        pair: String,
        amount: Decimal,
        minimum: Decimal,
    },

    /// The ticker has no usable price for the order side.
    #[error("no usable price for {0}")]
    InvalidTicker(String),

    /// The order size does not fit in a decimal.
    #[error("order size for {0} overflows")]
    SizingOverflow(String),

    /// Invalid coordinator configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A venue call failed fatally, ran out of retries, or was canceled.
    #[error(transparent)]
    Retry(#[from] RetryError),
}

/// Errors that can occur during strategy runner execution.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Strategy error.
    #[error("strategy error: {0}")]
    Strategy(#[from] strategy_core::StrategyError),

    /// A registered strategy has no venue to execute against.
    #[error("execution error: {0}")]
    Coordinator(#[from] CoordinatorError),

    /// A strategy is already registered for the pair.
    #[error("strategy already registered for {0}")]
    DuplicatePair(String),
}

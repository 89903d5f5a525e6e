//! Strategy error types.

use thiserror::Error;

/// Errors that can occur during strategy setup or execution.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal strategy error.
    #[error("internal error: {0}")]
    Internal(String),
}

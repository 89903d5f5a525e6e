//! Retry error types.

use thiserror::Error;
use venue_core::VenueError;

/// Why a scheduled venue operation gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError {
    /// The venue returned a non-retryable failure. No further attempts were
    /// made.
    #[error("fatal: {0}")]
    Fatal(VenueError),

    /// A bounded policy ran out of attempts on retryable failures.
    #[error("{operation} exhausted after {attempts} attempts: {last}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last: VenueError,
    },

    /// The caller canceled before the next attempt.
    #[error("{operation} canceled after {attempts} attempts")]
    Canceled { operation: String, attempts: u32 },
}

impl RetryError {
    /// The venue failure behind this error, if any.
    pub fn venue_error(&self) -> Option<&VenueError> {
        match self {
            RetryError::Fatal(e) => Some(e),
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Canceled { .. } => None,
        }
    }

    pub fn attempts(&self) -> Option<u32> {
        match self {
            RetryError::Fatal(_) => None,
            RetryError::Exhausted { attempts, .. } | RetryError::Canceled { attempts, .. } => {
                Some(*attempts)
            }
        }
    }
}

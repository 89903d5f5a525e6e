//! Venue error types.

use std::fmt;

use thiserror::Error;

/// Structured cause attached to a venue failure at the adapter boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VenueErrorKind {
    /// Socket timeout, connection reset/refused, host not found.
    NetworkTransient,
    /// The venue throttled the request.
    RateLimited,
    /// 5xx-class response.
    ServerError(u16),
    /// The response could not be parsed.
    MalformedResponse,
    /// The venue refused the request (bad parameters, funds, auth).
    Rejected,
    /// The adapter could not tell; classification falls back to the message.
    Unclassified,
}

impl VenueErrorKind {
    /// Whether a failure of this kind is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VenueErrorKind::NetworkTransient
                | VenueErrorKind::RateLimited
                | VenueErrorKind::ServerError(_)
                | VenueErrorKind::MalformedResponse
        )
    }
}

impl fmt::Display for VenueErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VenueErrorKind::NetworkTransient => write!(f, "network"),
            VenueErrorKind::RateLimited => write!(f, "rate limited"),
            VenueErrorKind::ServerError(status) => write!(f, "server error {}", status),
            VenueErrorKind::MalformedResponse => write!(f, "malformed response"),
            VenueErrorKind::Rejected => write!(f, "rejected"),
            VenueErrorKind::Unclassified => write!(f, "unclassified"),
        }
    }
}

/// A failed venue call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed ({kind}): {message}")]
pub struct VenueError {
    /// Adapter operation that failed, e.g. `getTicker`.
    pub operation: String,
    pub kind: VenueErrorKind,
    pub message: String,
}

impl VenueError {
    pub fn new(
        operation: impl Into<String>,
        kind: VenueErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            kind,
            message: message.into(),
        }
    }

    /// Failure with only a message; the classifier decides what it is.
    pub fn unclassified(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(operation, VenueErrorKind::Unclassified, message)
    }

    pub fn rejected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(operation, VenueErrorKind::Rejected, message)
    }

    pub fn network(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(operation, VenueErrorKind::NetworkTransient, message)
    }

    pub fn with_kind(mut self, kind: VenueErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(VenueErrorKind::NetworkTransient.is_retryable());
        assert!(VenueErrorKind::RateLimited.is_retryable());
        assert!(VenueErrorKind::ServerError(502).is_retryable());
        assert!(VenueErrorKind::MalformedResponse.is_retryable());
        assert!(!VenueErrorKind::Rejected.is_retryable());
        assert!(!VenueErrorKind::Unclassified.is_retryable());
    }

    #[test]
    fn test_display() {
        let err = VenueError::new("getTicker", VenueErrorKind::ServerError(503), "Response code 503");
        assert_eq!(
            err.to_string(),
            "getTicker failed (server error 503): Response code 503"
        );
    }
}

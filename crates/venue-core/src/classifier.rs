//! Retryable/fatal classification of venue failures.
//!
//! Adapters should attach a structured [`VenueErrorKind`] where they can.
//! Failures that arrive `Unclassified` are matched against a table of
//! message patterns; the default table is the transient-fault vocabulary
//! the exchange adapters have always reported.

use std::fmt;

use tracing::debug;

use crate::error::{VenueError, VenueErrorKind};

/// Outcome of classifying a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Retryable,
    Fatal,
}

impl Classification {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Classification::Retryable)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Retryable => write!(f, "retryable"),
            Classification::Fatal => write!(f, "fatal"),
        }
    }
}

/// One row of the message table: a case-sensitive substring and the kind it
/// implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRule {
    pub pattern: String,
    pub kind: VenueErrorKind,
}

impl ClassifierRule {
    pub fn new(pattern: impl Into<String>, kind: VenueErrorKind) -> Self {
        Self {
            pattern: pattern.into(),
            kind,
        }
    }

    fn matches(&self, message: &str) -> bool {
        !self.pattern.is_empty() && message.contains(self.pattern.as_str())
    }
}

/// Maps failures to [`Classification`] through a configurable rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassifier {
    rules: Vec<ClassifierRule>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(Self::default_rules())
    }
}

impl ErrorClassifier {
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        Self { rules }
    }

    /// Classifier with no message rules; only structured kinds count.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// The transient-fault vocabulary. Matching is case-sensitive.
    pub fn default_rules() -> Vec<ClassifierRule> {
        vec![
            ClassifierRule::new("SOCKETTIMEDOUT", VenueErrorKind::NetworkTransient),
            ClassifierRule::new("TIMEDOUT", VenueErrorKind::NetworkTransient),
            ClassifierRule::new("CONNRESET", VenueErrorKind::NetworkTransient),
            ClassifierRule::new("CONNREFUSED", VenueErrorKind::NetworkTransient),
            ClassifierRule::new("NOTFOUND", VenueErrorKind::NetworkTransient),
            ClassifierRule::new("Rate limit exceeded", VenueErrorKind::RateLimited),
            ClassifierRule::new("Response code 5", VenueErrorKind::ServerError(500)),
        ]
    }

    /// Append a rule; earlier rules win.
    pub fn with_rule(mut self, pattern: impl Into<String>, kind: VenueErrorKind) -> Self {
        self.rules.push(ClassifierRule::new(pattern, kind));
        self
    }

    pub fn rules(&self) -> &[ClassifierRule] {
        &self.rules
    }

    /// Kind implied by `message` alone, `Unclassified` if no rule matches.
    pub fn kind_for_message(&self, message: &str) -> VenueErrorKind {
        self.rules
            .iter()
            .find(|rule| rule.matches(message))
            .map(|rule| rule.kind)
            .unwrap_or(VenueErrorKind::Unclassified)
    }

    /// Effective kind: the structured kind when present, otherwise the table.
    pub fn resolve_kind(&self, error: &VenueError) -> VenueErrorKind {
        match error.kind {
            VenueErrorKind::Unclassified => self.kind_for_message(&error.message),
            kind => kind,
        }
    }

    /// Classify a failure. Total: anything not retryable is fatal.
    pub fn classify(&self, error: &VenueError) -> Classification {
        let kind = self.resolve_kind(error);
        let classification = if kind.is_retryable() {
            Classification::Retryable
        } else {
            Classification::Fatal
        };

        debug!(
            operation = %error.operation,
            kind = %kind,
            classification = %classification,
            "Classified venue error"
        );

        classification
    }

    pub fn classify_message(&self, message: &str) -> Classification {
        if self.kind_for_message(message).is_retryable() {
            Classification::Retryable
        } else {
            Classification::Fatal
        }
    }

    /// Replace an `Unclassified` kind with the one the table implies.
    pub fn annotate(&self, error: VenueError) -> VenueError {
        let kind = self.resolve_kind(&error);
        error.with_kind(kind)
    }

    /// Turn a response that did not raise into a failure when it should
    /// have.
    ///
    /// A non-empty `body_message` is a failure. So is any status outside
    /// `[200, 300)`.
    pub fn check_response(
        &self,
        operation: &str,
        status: u16,
        body_message: Option<&str>,
    ) -> Result<(), VenueError> {
        if let Some(message) = body_message.filter(|m| !m.is_empty()) {
            let kind = self.kind_for_message(message);
            let kind = if kind == VenueErrorKind::Unclassified {
                VenueErrorKind::Rejected
            } else {
                kind
            };
            return Err(VenueError::new(operation, kind, message));
        }

        if !(200..300).contains(&status) {
            let kind = match status {
                429 => VenueErrorKind::RateLimited,
                500..=599 => VenueErrorKind::ServerError(status),
                _ => VenueErrorKind::Rejected,
            };
            return Err(VenueError::new(
                operation,
                kind,
                format!("Response code {}", status),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_vocabulary() {
        let classifier = ErrorClassifier::default();

        let retryable = [
            "ESOCKETTIMEDOUT",
            "connect ETIMEDOUT 10.0.0.1:443",
            "read ECONNRESET",
            "connect ECONNREFUSED 127.0.0.1:443",
            "getaddrinfo ENOTFOUND www.cryptopia.co.nz",
            "Rate limit exceeded",
            "Response code 502 (Bad Gateway)",
        ];
        for message in retryable {
            assert_eq!(
                classifier.classify(&VenueError::unclassified("getTicker", message)),
                Classification::Retryable,
                "{}",
                message
            );
        }

        let fatal = [
            "Insufficient funds",
            "Invalid API key",
            "Response code 404",
            "rate limit exceeded",
            "",
        ];
        for message in fatal {
            assert_eq!(
                classifier.classify(&VenueError::unclassified("buy", message)),
                Classification::Fatal,
                "{}",
                message
            );
        }
    }

    #[test]
    fn test_structured_kind_wins() {
        let classifier = ErrorClassifier::default();

        // Message would match, but the adapter said rejected
        let err = VenueError::rejected("sell", "ETIMEDOUT while signing");
        assert_eq!(classifier.classify(&err), Classification::Fatal);

        let err = VenueError::new("getOrder", VenueErrorKind::MalformedResponse, "unexpected token");
        assert_eq!(classifier.classify(&err), Classification::Retryable);
    }

    #[test]
    fn test_custom_rules() {
        let classifier = ErrorClassifier::empty().with_rule("try again", VenueErrorKind::RateLimited);

        assert_eq!(classifier.classify_message("please try again"), Classification::Retryable);
        assert_eq!(classifier.classify_message("ECONNRESET"), Classification::Fatal);
    }

    #[test]
    fn test_empty_pattern_never_matches() {
        let classifier = ErrorClassifier::empty().with_rule("", VenueErrorKind::NetworkTransient);
        assert_eq!(classifier.classify_message("anything"), Classification::Fatal);
    }

    #[test]
    fn test_annotate() {
        let classifier = ErrorClassifier::default();

        let err = classifier.annotate(VenueError::unclassified("getPortfolio", "Rate limit exceeded"));
        assert_eq!(err.kind, VenueErrorKind::RateLimited);
        assert_eq!(err.operation, "getPortfolio");

        let err = classifier.annotate(VenueError::unclassified("getPortfolio", "nope"));
        assert_eq!(err.kind, VenueErrorKind::Unclassified);
    }

    #[test]
    fn test_check_response_body_message() {
        let classifier = ErrorClassifier::default();

        let err = classifier
            .check_response("buy", 200, Some("Insufficient Funds."))
            .unwrap_err();
        assert_eq!(err.operation, "buy");
        assert_eq!(err.kind, VenueErrorKind::Rejected);
        assert_eq!(err.message, "Insufficient Funds.");

        let err = classifier
            .check_response("getTicker", 200, Some("Rate limit exceeded"))
            .unwrap_err();
        assert_eq!(classifier.classify(&err), Classification::Retryable);

        assert!(classifier.check_response("getTicker", 200, Some("")).is_ok());
        assert!(classifier.check_response("getTicker", 200, None).is_ok());
    }

    #[test]
    fn test_check_response_status_boundaries() {
        let classifier = ErrorClassifier::default();

        assert!(classifier.check_response("getFee", 200, None).is_ok());
        assert!(classifier.check_response("getFee", 299, None).is_ok());

        let err = classifier.check_response("getFee", 199, None).unwrap_err();
        assert_eq!(err.kind, VenueErrorKind::Rejected);

        let err = classifier.check_response("getFee", 300, None).unwrap_err();
        assert_eq!(err.kind, VenueErrorKind::Rejected);
        assert_eq!(err.message, "Response code 300");

        let err = classifier.check_response("getFee", 429, None).unwrap_err();
        assert_eq!(err.kind, VenueErrorKind::RateLimited);

        let err = classifier.check_response("getFee", 503, None).unwrap_err();
        assert_eq!(err.kind, VenueErrorKind::ServerError(503));
        assert_eq!(classifier.classify(&err), Classification::Retryable);
    }

    proptest! {
        #[test]
        fn prop_classify_is_deterministic(message in ".{0,40}") {
            let classifier = ErrorClassifier::default();
            let err = VenueError::unclassified("op", message.clone());
            let first = classifier.classify(&err);
            prop_assert_eq!(first, classifier.classify(&err));
            prop_assert_eq!(first, classifier.classify_message(&message));
        }
    }
}

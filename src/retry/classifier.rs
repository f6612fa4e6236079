//! Error classification for retry decisions.
//!
//! Classification is an ordered list of rules; the first rule that matches a
//! failure decides its [`ErrorKind`]. Anything no rule claims is fatal.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message patterns that indicate provider-side throttling.
pub const DEFAULT_RATE_LIMIT_PATTERNS: &[&str] = &[
    r"\b429\b",
    r"too\s*many\s*requests",
    r"throttl",
    r"rate\s*limit",
];

/// Message patterns for other failures that usually clear up on their own.
pub const DEFAULT_TRANSIENT_PATTERNS: &[&str] = &[
    r"\b50[234]\b",
    r"service\s*unavailable",
    r"bad\s*gateway",
    r"gateway\s*time-?out",
    r"timed?\s*out",
    r"connection\s+(reset|refused|closed|aborted)",
    r"temporarily\s+unavailable",
    r"(name|dns)\s+resolution",
    r"error sending request",
];

const RATE_LIMIT_STATUSES: &[u16] = &[429];
const TRANSIENT_STATUSES: &[u16] = &[502, 503, 504];

/// How a failed attempt should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Provider throttling; backs off exponentially
    RateLimited,
    /// Temporary unavailability or network trouble; backs off linearly
    Transient,
    /// Anything else; never retried
    Fatal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::RateLimited => "rate-limited",
            ErrorKind::Transient => "transient",
            ErrorKind::Fatal => "fatal",
        };
        f.write_str(label)
    }
}

/// What a classifier gets to see about a failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureInfo {
    pub message: String,
    pub status: Option<u16>,
}

impl FailureInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn from_error<E: RetryableError + ?Sized>(error: &E) -> Self {
        Self {
            message: error.to_string(),
            status: error.status_code(),
        }
    }
}

/// Errors that can be fed through the retry executor.
///
/// The status code is optional metadata; classification falls back to the
/// message text when the transport did not provide one.
pub trait RetryableError: std::error::Error {
    fn status_code(&self) -> Option<u16> {
        None
    }
}

impl RetryableError for std::io::Error {}

impl RetryableError for reqwest::Error {
    fn status_code(&self) -> Option<u16> {
        self.status().map(|s| s.as_u16())
    }
}

/// Decides the [`ErrorKind`] of a failed attempt
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, failure: &FailureInfo) -> ErrorKind;
}

impl<F> ErrorClassifier for F
where
    F: Fn(&FailureInfo) -> ErrorKind + Send + Sync,
{
    fn classify(&self, failure: &FailureInfo) -> ErrorKind {
        self(failure)
    }
}

/// A single classification rule: a set of status codes and/or a message pattern.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    kind: ErrorKind,
    statuses: Vec<u16>,
    pattern: Option<Regex>,
}

impl ClassificationRule {
    /// Rule that matches on HTTP status code only
    pub fn status(kind: ErrorKind, statuses: &[u16]) -> Self {
        Self {
            kind,
            statuses: statuses.to_vec(),
            pattern: None,
        }
    }

    /// Rule that matches the failure message, case-insensitively
    pub fn pattern(kind: ErrorKind, pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("(?i){}", pattern))?;
        Ok(Self {
            kind,
            statuses: Vec::new(),
            pattern: Some(regex),
        })
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn matches(&self, failure: &FailureInfo) -> bool {
        if let Some(status) = failure.status
            && self.statuses.contains(&status)
        {
            return true;
        }
        self.pattern
            .as_ref()
            .is_some_and(|p| p.is_match(&failure.message))
    }
}

/// Ordered, extensible rule list. First match wins; no match means fatal.
#[derive(Debug, Clone, Default)]
pub struct PatternClassifier {
    rules: Vec<ClassificationRule>,
}

impl PatternClassifier {
    /// A classifier with no rules; everything is fatal until rules are added
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rules for Azure management APIs: throttling first, then other transients
    pub fn azure_defaults() -> Result<Self, regex::Error> {
        let mut classifier = Self::empty()
            .with_rule(ClassificationRule::status(
                ErrorKind::RateLimited,
                RATE_LIMIT_STATUSES,
            ))
            .with_rule(ClassificationRule::status(
                ErrorKind::Transient,
                TRANSIENT_STATUSES,
            ));

        for pattern in DEFAULT_RATE_LIMIT_PATTERNS {
            classifier.add_pattern(ErrorKind::RateLimited, pattern)?;
        }
        for pattern in DEFAULT_TRANSIENT_PATTERNS {
            classifier.add_pattern(ErrorKind::Transient, pattern)?;
        }
        Ok(classifier)
    }

    pub fn with_rule(mut self, rule: ClassificationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add a message pattern for `kind`.
    ///
    /// The rule is placed after the existing rules of the same kind so that
    /// throttling patterns keep priority over generic transient ones.
    pub fn add_pattern(&mut self, kind: ErrorKind, pattern: &str) -> Result<(), regex::Error> {
        let rule = ClassificationRule::pattern(kind, pattern)?;
        let position = self
            .rules
            .iter()
            .rposition(|r| r.kind == kind)
            .map(|i| i + 1)
            .unwrap_or(self.rules.len());
        self.rules.insert(position, rule);
        Ok(())
    }

    pub fn extend_patterns<S: AsRef<str>>(
        mut self,
        kind: ErrorKind,
        patterns: &[S],
    ) -> Result<Self, regex::Error> {
        for pattern in patterns {
            self.add_pattern(kind, pattern.as_ref())?;
        }
        Ok(self)
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }
}

impl ErrorClassifier for PatternClassifier {
    fn classify(&self, failure: &FailureInfo) -> ErrorKind {
        self.rules
            .iter()
            .find(|rule| rule.matches(failure))
            .map(|rule| rule.kind)
            .unwrap_or(ErrorKind::Fatal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(message: &str) -> ErrorKind {
        PatternClassifier::azure_defaults()
            .unwrap()
            .classify(&FailureInfo::new(message))
    }

    #[test]
    fn test_throttling_messages_are_rate_limited() {
        for message in [
            "Response status code does not indicate success: 429",
            "TooManyRequests: please retry later",
            "Request was throttled by the server",
            "Rate limit exceeded - please try again later",
        ] {
            assert_eq!(classify(message), ErrorKind::RateLimited, "{}", message);
        }
    }

    #[test]
    fn test_unavailable_and_network_messages_are_transient() {
        for message in [
            "Server error (503): ServiceUnavailable",
            "The operation timed out",
            "connection reset by peer",
            "error sending request for url (https://management.azure.com/)",
        ] {
            assert_eq!(classify(message), ErrorKind::Transient, "{}", message);
        }
    }

    #[test]
    fn test_unknown_messages_are_fatal() {
        assert_eq!(classify("AuthorizationFailed: no access"), ErrorKind::Fatal);
        assert_eq!(classify("Server error (500): InternalServerError"), ErrorKind::Fatal);
        assert_eq!(classify(""), ErrorKind::Fatal);
    }

    #[test]
    fn test_status_code_wins_over_message() {
        let classifier = PatternClassifier::azure_defaults().unwrap();
        let failure = FailureInfo::new("opaque failure").with_status(429);
        assert_eq!(classifier.classify(&failure), ErrorKind::RateLimited);

        let failure = FailureInfo::new("opaque failure").with_status(504);
        assert_eq!(classifier.classify(&failure), ErrorKind::Transient);
    }

    #[test]
    fn test_rate_limit_checked_before_transient() {
        // Message matches both families; throttling must win
        assert_eq!(classify("503 returned while throttled"), ErrorKind::RateLimited);
    }

    #[test]
    fn test_extension_patterns() {
        let classifier = PatternClassifier::azure_defaults()
            .unwrap()
            .extend_patterns(ErrorKind::Transient, &["ResourceGraphQueryBusy"])
            .unwrap()
            .extend_patterns(ErrorKind::RateLimited, &["SubscriptionRequestsThrottled"])
            .unwrap();

        assert_eq!(
            classifier.classify(&FailureInfo::new("resourcegraphquerybusy")),
            ErrorKind::Transient
        );

        // Added rate-limit rules stay ahead of every transient rule
        let first_transient = classifier
            .rules()
            .iter()
            .position(|r| r.kind() == ErrorKind::Transient)
            .unwrap();
        let last_rate_limited = classifier
            .rules()
            .iter()
            .rposition(|r| r.kind() == ErrorKind::RateLimited)
            .unwrap();
        assert!(last_rate_limited < first_transient);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let mut classifier = PatternClassifier::empty();
        assert!(classifier.add_pattern(ErrorKind::Transient, "(unclosed").is_err());
    }

    #[test]
    fn test_closure_classifier() {
        let classifier = |f: &FailureInfo| {
            if f.message.contains("busy") {
                ErrorKind::Transient
            } else {
                ErrorKind::Fatal
            }
        };
        assert_eq!(classifier.classify(&FailureInfo::new("busy")), ErrorKind::Transient);
        assert_eq!(classifier.classify(&FailureInfo::new("nope")), ErrorKind::Fatal);
    }
}

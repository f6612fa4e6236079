use super::classifier::{ErrorClassifier, ErrorKind, FailureInfo, PatternClassifier};
use crate::config::types::RetryConfig;
use crate::error::ConfigError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Immutable retry settings for one call site.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Option<Duration>,
    classifier: Arc<dyn ErrorClassifier>,
}

impl RetryPolicy {
    /// `max_attempts` below 1 is raised to 1 (a single attempt, no retry).
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        classifier: Arc<dyn ErrorClassifier>,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: None,
            classifier,
        }
    }

    /// Cap any single backoff delay
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Three attempts, two second base delay, Azure classification rules
    pub fn azure_defaults() -> Result<Self, regex::Error> {
        Ok(Self::new(
            DEFAULT_MAX_ATTEMPTS,
            DEFAULT_BASE_DELAY,
            Arc::new(PatternClassifier::azure_defaults()?),
        ))
    }

    pub fn from_config(config: &RetryConfig) -> Result<Self, ConfigError> {
        if config.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let invalid_pattern = |e: regex::Error| ConfigError::InvalidValue {
            field: "retry patterns".to_string(),
            reason: e.to_string(),
        };
        let classifier = PatternClassifier::azure_defaults()
            .and_then(|c| c.extend_patterns(ErrorKind::RateLimited, &config.rate_limit_patterns))
            .and_then(|c| c.extend_patterns(ErrorKind::Transient, &config.transient_patterns))
            .map_err(invalid_pattern)?;

        let mut policy = Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Arc::new(classifier),
        );
        if let Some(max_delay_ms) = config.max_delay_ms {
            policy = policy.with_max_delay(Duration::from_millis(max_delay_ms));
        }
        Ok(policy)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    pub fn classify(&self, failure: &FailureInfo) -> ErrorKind {
        self.classifier.classify(failure)
    }

    /// Delay to wait after failed attempt `attempt` (1-based) before trying again.
    ///
    /// Returns `None` for fatal failures, which are never retried.
    pub fn delay_for(&self, kind: ErrorKind, attempt: u32) -> Option<Duration> {
        let attempt = attempt.max(1);
        let raw = match kind {
            ErrorKind::RateLimited => {
                let factor = 2u32.saturating_pow(attempt - 1);
                self.base_delay.saturating_mul(factor)
            }
            ErrorKind::Transient => self.base_delay.saturating_mul(attempt),
            ErrorKind::Fatal => return None,
        };
        Some(match self.max_delay {
            Some(cap) => raw.min(cap),
            None => raw,
        })
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(base_ms: u64) -> RetryPolicy {
        RetryPolicy::new(
            5,
            Duration::from_millis(base_ms),
            Arc::new(PatternClassifier::empty()),
        )
    }

    #[test]
    fn test_rate_limited_delay_doubles() {
        let p = policy(100);
        let delays: Vec<_> = (1..=4)
            .map(|a| p.delay_for(ErrorKind::RateLimited, a).unwrap())
            .collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
            ]
        );
    }

    #[test]
    fn test_transient_delay_is_linear() {
        let p = policy(100);
        let delays: Vec<_> = (1..=4)
            .map(|a| p.delay_for(ErrorKind::Transient, a).unwrap())
            .collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(300),
                Duration::from_millis(400),
            ]
        );
    }

    #[test]
    fn test_fatal_has_no_delay() {
        assert_eq!(policy(100).delay_for(ErrorKind::Fatal, 1), None);
    }

    #[test]
    fn test_max_delay_caps_backoff() {
        let p = policy(1000).with_max_delay(Duration::from_millis(2500));
        assert_eq!(
            p.delay_for(ErrorKind::RateLimited, 3),
            Some(Duration::from_millis(2500))
        );
        assert_eq!(
            p.delay_for(ErrorKind::Transient, 2),
            Some(Duration::from_millis(2000))
        );
    }

    #[test]
    fn test_zero_attempts_becomes_one() {
        let p = RetryPolicy::new(0, Duration::ZERO, Arc::new(PatternClassifier::empty()));
        assert_eq!(p.max_attempts(), 1);
    }

    #[test]
    fn test_from_config() {
        let config = RetryConfig {
            max_attempts: 4,
            base_delay_ms: 250,
            max_delay_ms: Some(10_000),
            rate_limit_patterns: vec!["SubscriptionRequestsThrottled".to_string()],
            transient_patterns: vec!["GatewayBusy".to_string()],
        };
        let p = RetryPolicy::from_config(&config).unwrap();
        assert_eq!(p.max_attempts(), 4);
        assert_eq!(p.base_delay(), Duration::from_millis(250));
        assert_eq!(p.max_delay(), Some(Duration::from_secs(10)));
        assert_eq!(p.classify(&FailureInfo::new("GatewayBusy")), ErrorKind::Transient);
        assert_eq!(
            p.classify(&FailureInfo::new("SubscriptionRequestsThrottled")),
            ErrorKind::RateLimited
        );
    }

    #[test]
    fn test_from_config_rejects_zero_attempts_and_bad_patterns() {
        let zero = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        };
        assert!(matches!(
            RetryPolicy::from_config(&zero),
            Err(ConfigError::InvalidValue { .. })
        ));

        let bad = RetryConfig {
            transient_patterns: vec!["[unterminated".to_string()],
            ..RetryConfig::default()
        };
        assert!(RetryPolicy::from_config(&bad).is_err());
    }
}

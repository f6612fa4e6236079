//! Retirement status and severity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Days before the deadline that are still considered critical
pub const CRITICAL_WINDOW_DAYS: i64 = 30;
/// Days before the deadline that are considered high severity
pub const HIGH_WINDOW_DAYS: i64 = 90;
/// Days before the deadline that are considered medium severity
pub const MEDIUM_WINDOW_DAYS: i64 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EolStatus {
    Announced,
    Deprecated,
    Retired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EolSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EolStatus::Announced => "Announced",
            EolStatus::Deprecated => "Deprecated",
            EolStatus::Retired => "Retired",
        }
    }
}

impl EolSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            EolSeverity::Low => "LOW",
            EolSeverity::Medium => "MEDIUM",
            EolSeverity::High => "HIGH",
            EolSeverity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for EolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for EolSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status, severity and remaining days for one retirement deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub status: EolStatus,
    pub severity: EolSeverity,
    /// Whole days from `now` to the deadline, truncated toward zero; negative once passed
    pub days_until_deadline: i64,
}

impl Classification {
    /// Classify a deadline relative to `now`.
    ///
    /// A deadline strictly before `now` is Retired/Critical before any day
    /// threshold is looked at. A deadline equal to `now` is not retired: it has
    /// zero days left and falls into the critical Deprecated window.
    pub fn evaluate(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let days_until_deadline = (deadline - now).num_days();
        let (status, severity) = if deadline < now {
            (EolStatus::Retired, EolSeverity::Critical)
        } else {
            Self::for_days(days_until_deadline)
        };

        Self {
            status,
            severity,
            days_until_deadline,
        }
    }

    /// Table lookup on remaining days alone
    pub fn for_days(days: i64) -> (EolStatus, EolSeverity) {
        match days {
            d if d < 0 => (EolStatus::Retired, EolSeverity::Critical),
            d if d < CRITICAL_WINDOW_DAYS => (EolStatus::Deprecated, EolSeverity::Critical),
            d if d < HIGH_WINDOW_DAYS => (EolStatus::Deprecated, EolSeverity::High),
            d if d < MEDIUM_WINDOW_DAYS => (EolStatus::Announced, EolSeverity::Medium),
            _ => (EolStatus::Announced, EolSeverity::Low),
        }
    }
}

//! Scan results

use super::classify::{Classification, EolSeverity, EolStatus};
use super::definitions::{DefinitionTier, DeprecationDefinition};
use crate::azure::ResourceRecord;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

const GENERIC_ACTION: &str =
    "Review the retirement notice for this service and plan a migration before the deadline";

/// One retiring service with every resource in the scope that still uses it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EolFinding {
    pub service_id: u32,
    pub component: String,
    /// Type of the first affected resource
    pub resource_type: String,
    pub status: EolStatus,
    pub deadline: NaiveDate,
    pub days_until_deadline: i64,
    pub severity: EolSeverity,
    pub affected_resources: Vec<ResourceRecord>,
    pub action_required: String,
    pub migration_guide: String,
}

impl EolFinding {
    /// Returns `None` for an empty group or a definition without a date.
    pub fn new(
        definition: &DeprecationDefinition,
        classification: Classification,
        resources: Vec<ResourceRecord>,
    ) -> Option<Self> {
        let deadline = definition.retirement_date?;
        let resource_type = resources.first()?.resource_type.clone();

        let link = definition
            .reference_link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty());
        let (action_required, migration_guide) = match link {
            Some(link) => (
                format!("Review the retirement notice and migrate: {}", link),
                link.to_string(),
            ),
            None => (GENERIC_ACTION.to_string(), String::new()),
        };

        Some(Self {
            service_id: definition.service_id,
            component: definition.component(),
            resource_type,
            status: classification.status,
            deadline,
            days_until_deadline: classification.days_until_deadline,
            severity: classification.severity,
            affected_resources: resources,
            action_required,
            migration_guide,
        })
    }

    pub fn resource_count(&self) -> usize {
        self.affected_resources.len()
    }
}

/// Whether the scan had data to work with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Availability {
    Available { tier: DefinitionTier },
    Unavailable { reason: String },
}

/// Result of one scan: ordered findings plus enough context to tell
/// "nothing is retiring" apart from "nothing could be checked".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EolScanReport {
    pub generated_at: DateTime<Utc>,
    pub availability: Availability,
    pub subscriptions: Vec<String>,
    pub findings: Vec<EolFinding>,
    pub total_affected_resources: usize,
    pub critical_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
}

impl EolScanReport {
    pub fn available(
        generated_at: DateTime<Utc>,
        tier: DefinitionTier,
        subscriptions: Vec<String>,
        findings: Vec<EolFinding>,
    ) -> Self {
        let mut report = Self {
            generated_at,
            availability: Availability::Available { tier },
            subscriptions,
            findings,
            total_affected_resources: 0,
            critical_count: 0,
            high_count: 0,
            medium_count: 0,
            low_count: 0,
        };
        report.recount();
        report
    }

    pub fn unavailable(
        generated_at: DateTime<Utc>,
        subscriptions: Vec<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            generated_at,
            availability: Availability::Unavailable {
                reason: reason.into(),
            },
            subscriptions,
            findings: Vec::new(),
            total_affected_resources: 0,
            critical_count: 0,
            high_count: 0,
            medium_count: 0,
            low_count: 0,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.availability, Availability::Available { .. })
    }

    pub fn findings(&self) -> &[EolFinding] {
        &self.findings
    }

    /// Keep findings at or above `min`, recalculating the counters
    pub fn filter_min_severity(&mut self, min: EolSeverity) {
        self.findings.retain(|f| f.severity >= min);
        self.recount();
    }

    pub fn highest_severity(&self) -> Option<EolSeverity> {
        self.findings.iter().map(|f| f.severity).max()
    }

    fn recount(&mut self) {
        let count = |s: EolSeverity| self.findings.iter().filter(|f| f.severity == s).count();
        let (critical, high, medium, low) = (
            count(EolSeverity::Critical),
            count(EolSeverity::High),
            count(EolSeverity::Medium),
            count(EolSeverity::Low),
        );
        self.critical_count = critical;
        self.high_count = high;
        self.medium_count = medium;
        self.low_count = low;
        self.total_affected_resources = self.findings.iter().map(|f| f.resource_count()).sum();
    }
}

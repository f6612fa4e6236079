//! Service retirement definitions

use super::error::EolError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// One retirement notice, keyed by the service id the query assigns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeprecationDefinition {
    pub service_id: u32,
    pub service_name: String,
    pub retiring_feature: Option<String>,
    pub retirement_date: Option<NaiveDate>,
    pub reference_link: Option<String>,
}

impl DeprecationDefinition {
    /// `"<service>"` or `"<service> - <feature>"`
    pub fn component(&self) -> String {
        match self.retiring_feature.as_deref().map(str::trim) {
            Some(feature) if !feature.is_empty() => {
                format!("{} - {}", self.service_name, feature)
            }
            _ => self.service_name.clone(),
        }
    }

    /// Start of the retirement day in UTC
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.retirement_date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }
}

/// Dataset row as published: `{"<id>": {"ServiceName": ..., ...}}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawDefinition {
    #[serde(default)]
    service_name: Option<String>,
    #[serde(default)]
    retiring_feature: Option<String>,
    #[serde(default)]
    retirement_date: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and `YYYY-MM-DDTHH:MM:SS`
pub fn parse_retirement_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read-only set of definitions for the duration of a scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionSet {
    by_id: BTreeMap<u32, DeprecationDefinition>,
}

impl DefinitionSet {
    /// Parse the published dataset.
    ///
    /// Entries with a non-numeric id or no service name are skipped; a dataset
    /// that yields no definitions at all is rejected.
    pub fn from_json(text: &str) -> Result<Self, EolError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| EolError::InvalidDataset(format!("not valid JSON: {}", e)))?;
        let Value::Object(entries) = value else {
            return Err(EolError::InvalidDataset(
                "expected an object keyed by service id".to_string(),
            ));
        };

        let mut by_id = BTreeMap::new();
        for (key, entry) in entries {
            let Some(service_id) = key.trim().parse::<u32>().ok().filter(|id| *id > 0) else {
                debug!("Skipping dataset entry with invalid service id '{}'", key);
                continue;
            };
            let raw: RawDefinition = match serde_json::from_value(entry) {
                Ok(raw) => raw,
                Err(e) => {
                    debug!("Skipping unreadable dataset entry {}: {}", service_id, e);
                    continue;
                }
            };
            let Some(service_name) = non_empty(raw.service_name) else {
                debug!("Skipping dataset entry {} without a service name", service_id);
                continue;
            };

            let retirement_date = raw
                .retirement_date
                .as_deref()
                .and_then(parse_retirement_date);
            by_id.insert(
                service_id,
                DeprecationDefinition {
                    service_id,
                    service_name,
                    retiring_feature: non_empty(raw.retiring_feature),
                    retirement_date,
                    reference_link: non_empty(raw.link),
                },
            );
        }

        if by_id.is_empty() {
            return Err(EolError::InvalidDataset(
                "dataset contains no usable definitions".to_string(),
            ));
        }
        Ok(Self { by_id })
    }

    pub fn from_definitions<I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = DeprecationDefinition>,
    {
        Self {
            by_id: definitions
                .into_iter()
                .map(|d| (d.service_id, d))
                .collect(),
        }
    }

    pub fn get(&self, service_id: u32) -> Option<&DeprecationDefinition> {
        self.by_id.get(&service_id)
    }

    pub fn contains(&self, service_id: u32) -> bool {
        self.by_id.contains_key(&service_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeprecationDefinition> {
        self.by_id.values()
    }
}

/// Where a bundle of definitions came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionTier {
    Remote,
    Cache,
    Bundled,
}

impl fmt::Display for DefinitionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DefinitionTier::Remote => "remote",
            DefinitionTier::Cache => "cache",
            DefinitionTier::Bundled => "bundled",
        };
        f.write_str(label)
    }
}

/// Definitions plus the query that assigns service ids to resources
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionBundle {
    pub definitions: DefinitionSet,
    pub query_template: String,
    pub tier: DefinitionTier,
    /// When the data was downloaded; `None` for the bundled copy
    pub fetched_at: Option<DateTime<Utc>>,
}

impl DefinitionBundle {
    /// Parse a dataset and pair it with its query
    pub fn parse(
        definitions_json: &str,
        query_template: &str,
        tier: DefinitionTier,
        fetched_at: Option<DateTime<Utc>>,
    ) -> Result<Self, EolError> {
        let query_template = query_template.trim();
        if query_template.is_empty() {
            return Err(EolError::InvalidDataset("query text is empty".to_string()));
        }
        Ok(Self {
            definitions: DefinitionSet::from_json(definitions_json)?,
            query_template: query_template.to_string(),
            tier,
            fetched_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = r#"{
        "1": {
            "ServiceName": "Load Balancer",
            "RetiringFeature": "Basic SKU",
            "RetirementDate": "2025-09-30",
            "Link": "https://learn.microsoft.com/azure/load-balancer/upgrade-basic"
        },
        "2": {
            "ServiceName": "Cloud Services (classic)",
            "RetiringFeature": "",
            "RetirementDate": "2024-08-31T00:00:00Z"
        },
        "3": { "ServiceName": "Mystery", "RetirementDate": "sometime soon" },
        "abc": { "ServiceName": "Bad key" },
        "0": { "ServiceName": "Zero key" },
        "4": { "RetirementDate": "2026-01-01" }
    }"#;

    #[test]
    fn test_dataset_parsing() {
        let set = DefinitionSet::from_json(DATASET).unwrap();
        assert_eq!(set.len(), 3);

        let lb = set.get(1).unwrap();
        assert_eq!(lb.component(), "Load Balancer - Basic SKU");
        assert_eq!(lb.retirement_date, NaiveDate::from_ymd_opt(2025, 9, 30));
        assert!(lb.reference_link.is_some());

        let classic = set.get(2).unwrap();
        assert_eq!(classic.component(), "Cloud Services (classic)");
        assert_eq!(classic.retiring_feature, None);
        assert_eq!(classic.retirement_date, NaiveDate::from_ymd_opt(2024, 8, 31));
        assert_eq!(classic.reference_link, None);

        // Kept, but without a usable date
        assert_eq!(set.get(3).unwrap().retirement_date, None);
        assert!(!set.contains(0));
        assert!(!set.contains(4));
    }

    #[test]
    fn test_deadline_is_start_of_day_utc() {
        let set = DefinitionSet::from_json(DATASET).unwrap();
        let deadline = set.get(1).unwrap().deadline().unwrap();
        assert_eq!(deadline.to_rfc3339(), "2025-09-30T00:00:00+00:00");
        assert_eq!(set.get(3).unwrap().deadline(), None);
    }

    #[test]
    fn test_retirement_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 31);
        assert_eq!(parse_retirement_date("2026-03-31"), expected);
        assert_eq!(parse_retirement_date(" 2026-03-31 "), expected);
        assert_eq!(parse_retirement_date("2026-03-31T00:00:00Z"), expected);
        assert_eq!(parse_retirement_date("2026-03-31T08:30:00"), expected);
        assert_eq!(parse_retirement_date("31/03/2026"), None);
        assert_eq!(parse_retirement_date(""), None);
    }

    #[test]
    fn test_rejects_non_object_and_empty_datasets() {
        assert!(DefinitionSet::from_json("[]").is_err());
        assert!(DefinitionSet::from_json("{}").is_err());
        assert!(DefinitionSet::from_json("not json").is_err());
    }

    #[test]
    fn test_bundle_requires_query() {
        let result = DefinitionBundle::parse(DATASET, "   ", DefinitionTier::Bundled, None);
        assert!(matches!(result, Err(EolError::InvalidDataset(_))));
    }
}

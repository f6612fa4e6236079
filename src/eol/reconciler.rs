//! Joins resource query rows against retirement definitions

use super::classify::Classification;
use super::definitions::{DefinitionBundle, DefinitionSet};
use super::error::EolError;
use super::finding::{EolFinding, EolScanReport};
use super::query::{scope_subscriptions, scoped_query};
use super::sources::DefinitionChain;
use crate::azure::{ResourceQuery, ResourceRecord, SubscriptionSource};
use crate::common::{CancellationToken, Clock, SystemClock};
use crate::retry::RetryExecutor;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct EolReconciler {
    chain: DefinitionChain,
    resource_query: Arc<dyn ResourceQuery>,
    subscriptions: Option<Arc<dyn SubscriptionSource>>,
    executor: RetryExecutor,
    clock: Arc<dyn Clock>,
}

impl EolReconciler {
    pub fn new(
        chain: DefinitionChain,
        resource_query: Arc<dyn ResourceQuery>,
        executor: RetryExecutor,
    ) -> Self {
        Self {
            chain,
            resource_query,
            subscriptions: None,
            executor,
            clock: Arc::new(SystemClock),
        }
    }

    /// Used to enumerate subscriptions when a scan is given none
    pub fn with_subscription_source(mut self, source: Arc<dyn SubscriptionSource>) -> Self {
        self.subscriptions = Some(source);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Scan the given subscriptions.
    ///
    /// Never fails: if definitions, subscriptions or the query cannot be
    /// obtained the report is marked unavailable and carries the reason.
    pub fn scan<S: AsRef<str>>(
        &self,
        cancel: &CancellationToken,
        subscription_ids: &[S],
    ) -> EolScanReport {
        let now = self.clock.now();
        let requested = scope_subscriptions(subscription_ids);

        match self.try_scan(cancel, requested.clone(), now) {
            Ok(report) => report,
            Err(e) if e.is_cancelled() => {
                info!("EOL scan cancelled");
                EolScanReport::unavailable(now, requested, "scan cancelled")
            }
            Err(e) => {
                warn!("EOL data is unavailable for this scan: {}", e);
                EolScanReport::unavailable(now, requested, e.to_string())
            }
        }
    }

    /// Scan every enabled subscription the subscription source reports
    pub fn scan_all(&self, cancel: &CancellationToken) -> EolScanReport {
        self.scan::<String>(cancel, &[])
    }

    fn try_scan(
        &self,
        cancel: &CancellationToken,
        requested: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<EolScanReport, EolError> {
        let DefinitionBundle {
            definitions,
            query_template,
            tier,
            ..
        } = self.chain.load(cancel)?;

        let subscriptions = if requested.is_empty() {
            self.discover_subscriptions(cancel)?
        } else {
            requested
        };
        if subscriptions.is_empty() {
            return Err(EolError::NoSubscriptions);
        }

        let query = scoped_query(&query_template, &subscriptions);
        debug!(
            "Running EOL query against {} subscription(s)",
            subscriptions.len()
        );
        let rows = self
            .executor
            .execute(cancel, || self.resource_query.query(&subscriptions, &query))
            .map_err(|e| {
                if let Some(last) = e.last_error() {
                    debug!(
                        "EOL query failed after {} attempt(s), last error: {}",
                        e.attempts(),
                        last
                    );
                }
                EolError::Query(e)
            })?;
        info!("EOL query returned {} row(s)", rows.len());

        let findings = reconcile(&definitions, rows, now);
        Ok(EolScanReport::available(now, tier, subscriptions, findings))
    }

    fn discover_subscriptions(&self, cancel: &CancellationToken) -> Result<Vec<String>, EolError> {
        let Some(source) = &self.subscriptions else {
            return Ok(Vec::new());
        };
        let ids = self
            .executor
            .execute(cancel, || source.subscription_ids())
            .map_err(EolError::Subscriptions)?;
        Ok(scope_subscriptions(ids))
    }
}

/// Group rows by service id and turn each group into a finding.
///
/// Rows without a known service id and groups whose definition has no
/// retirement date are dropped. Output is ordered by days remaining, then
/// service id.
pub fn reconcile(
    definitions: &DefinitionSet,
    rows: Vec<ResourceRecord>,
    now: DateTime<Utc>,
) -> Vec<EolFinding> {
    let mut groups: BTreeMap<u32, Vec<ResourceRecord>> = BTreeMap::new();
    for row in rows {
        match row.service_id {
            Some(id) if definitions.contains(id) => groups.entry(id).or_default().push(row),
            Some(id) => debug!("Skipping {}: unknown service id {}", row.resource_id, id),
            None => debug!("Skipping {}: no service id", row.resource_id),
        }
    }

    let mut findings: Vec<EolFinding> = groups
        .into_iter()
        .filter_map(|(id, resources)| {
            let definition = definitions.get(id)?;
            let Some(deadline) = definition.deadline() else {
                debug!(
                    "Skipping service {} ({}): no usable retirement date",
                    id, definition.service_name
                );
                return None;
            };
            EolFinding::new(definition, Classification::evaluate(deadline, now), resources)
        })
        .collect();

    findings.sort_by(|a, b| {
        a.days_until_deadline
            .cmp(&b.days_until_deadline)
            .then(a.service_id.cmp(&b.service_id))
    });
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eol::{DeprecationDefinition, EolSeverity, EolStatus};
    use chrono::{Duration, NaiveDate, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn definition(id: u32, date: Option<NaiveDate>) -> DeprecationDefinition {
        DeprecationDefinition {
            service_id: id,
            service_name: format!("Service {}", id),
            retiring_feature: None,
            retirement_date: date,
            reference_link: None,
        }
    }

    fn row(name: &str, service_id: serde_json::Value) -> ResourceRecord {
        serde_json::from_value(json!({
            "id": format!("/subscriptions/s1/providers/x/{}", name),
            "name": name,
            "type": "microsoft.test/things",
            "ServiceID": service_id
        }))
        .unwrap()
    }

    fn in_days(days: i64) -> Option<NaiveDate> {
        Some((now() + Duration::days(days)).date_naive())
    }

    #[test]
    fn test_unknown_and_missing_ids_are_dropped() {
        let defs = DefinitionSet::from_definitions([definition(1, in_days(10))]);
        let rows = vec![
            row("a", json!(1)),
            row("b", json!("1")),
            row("c", json!(99)),
            row("d", json!(null)),
            row("e", json!("abc")),
        ];
        let findings = reconcile(&defs, rows, now());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].resource_count(), 2);
        assert_eq!(findings[0].affected_resources[0].name, "a");
    }

    #[test]
    fn test_missing_retirement_date_skips_group() {
        let defs = DefinitionSet::from_definitions([
            definition(1, None),
            definition(2, in_days(200)),
        ]);
        let findings = reconcile(&defs, vec![row("a", json!(1)), row("b", json!(2))], now());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].service_id, 2);
        assert_eq!(findings[0].severity, EolSeverity::Low);
    }

    #[test]
    fn test_ordering_by_days_then_id() {
        let defs = DefinitionSet::from_definitions([
            definition(3, in_days(100)),
            definition(2, in_days(-5)),
            definition(1, in_days(100)),
        ]);
        let rows = vec![row("a", json!(3)), row("b", json!(1)), row("c", json!(2))];
        let ids: Vec<u32> = reconcile(&defs, rows, now())
            .iter()
            .map(|f| f.service_id)
            .collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_past_deadline_is_retired() {
        let defs = DefinitionSet::from_definitions([definition(1, in_days(-1))]);
        let findings = reconcile(&defs, vec![row("a", json!(1))], now());
        assert_eq!(findings[0].status, EolStatus::Retired);
        assert_eq!(findings[0].severity, EolSeverity::Critical);
        assert!(findings[0].days_until_deadline < 0);
    }

    #[test]
    fn test_no_rows_means_no_findings() {
        let defs = DefinitionSet::from_definitions([definition(1, in_days(10))]);
        assert!(reconcile(&defs, vec![], now()).is_empty());
    }
}

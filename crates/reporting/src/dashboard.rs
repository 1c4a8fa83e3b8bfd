//! Funnel dashboard: ten-way upstream fan-out, reconciliation, diagnosis.

use crate::bottleneck::{diagnose, merge_upstream};
use crate::funnel::{build_edges, build_kpis, build_stages};
use crate::reconcile::reconcile;
use cfo_core::funnel::{DateRange, FunnelAnalysis, Period};
use cfo_upstream::{settle_all, AnalyticsSource, SnapshotSet, Source, SourceRequest};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::info;

pub struct FunnelDashboard {
    source: Arc<dyn AnalyticsSource>,
}

impl FunnelDashboard {
    pub fn new(source: Arc<dyn AnalyticsSource>) -> Self {
        Self { source }
    }

    /// The ten dashboard sources, in slot order.
    pub fn requests(period: Period, range: &DateRange) -> Vec<SourceRequest> {
        vec![
            SourceRequest::leads_in(range),
            SourceRequest::lead_stats(),
            SourceRequest::first_visits(range),
            SourceRequest::follow_ups(range),
            SourceRequest::no_show(),
            SourceRequest::quotes(),
            SourceRequest::conversion_report(range),
            SourceRequest::bi_stats(period),
            SourceRequest::recall(),
            SourceRequest::bottlenecks(),
        ]
    }

    pub async fn analyze(
        &self,
        clinic_id: i64,
        period: Period,
        auth_token: Option<&str>,
    ) -> FunnelAnalysis {
        self.analyze_on(clinic_id, period, auth_token, Utc::now().date_naive())
            .await
    }

    pub async fn analyze_on(
        &self,
        clinic_id: i64,
        period: Period,
        auth_token: Option<&str>,
        today: NaiveDate,
    ) -> FunnelAnalysis {
        let range = period.date_range(today);
        let requests = Self::requests(period, &range);
        let snapshots = settle_all(self.source.as_ref(), clinic_id, auth_token, &requests).await;

        let analysis = compose(period, range, &snapshots);
        metrics::counter!("funnel.analyses").increment(1);
        info!(
            clinic_id,
            period = period.as_query(),
            sources_available = snapshots.available(),
            findings = analysis.findings.len(),
            estimated = analysis.metrics.fallbacks.len(),
            "Funnel analysis complete"
        );
        analysis
    }
}

/// Pure assembly of the dashboard payload from settled snapshots.
pub fn compose(period: Period, range: DateRange, snapshots: &SnapshotSet) -> FunnelAnalysis {
    let metrics = reconcile(snapshots);
    let stages = build_stages(&metrics);
    let edges = build_edges(&stages);
    let mut diagnosis = diagnose(&stages, metrics.no_show_rate);
    merge_upstream(&mut diagnosis.findings, snapshots.get(Source::Bottlenecks));
    let kpis = build_kpis(&metrics);

    FunnelAnalysis {
        period,
        range,
        stages,
        edges,
        findings: diagnosis.findings,
        recommendations: diagnosis.recommendations,
        kpis,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cfo_core::funnel::Severity;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Records every (path, token) pair it is asked for.
    struct FakeAnalytics {
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl AnalyticsSource for FakeAnalytics {
        async fn fetch(&self, endpoint: &str, _clinic: i64, token: Option<&str>) -> Option<Value> {
            self.seen
                .lock()
                .unwrap()
                .push((endpoint.to_string(), token.map(str::to_string)));
            if endpoint.starts_with("/leads/stats/dashboard") {
                Some(json!({"success": true, "data": {"totale": 100}}))
            } else if endpoint.starts_with("/growth-mgmt/bottlenecks") {
                Some(json!({"success": true, "data": [
                    {"id": 1, "titolo": "Recall backlog", "severity": "medium"}
                ]}))
            } else {
                None
            }
        }
    }

    #[test]
    fn test_ten_requests_in_slot_order() {
        let range = Period::Month.date_range(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        let reqs = FunnelDashboard::requests(Period::Month, &range);
        let sources: Vec<Source> = reqs.iter().map(|r| r.source).collect();
        assert_eq!(
            sources,
            vec![
                Source::Leads,
                Source::LeadStats,
                Source::FirstVisits,
                Source::FollowUps,
                Source::NoShow,
                Source::Quotes,
                Source::ConversionReport,
                Source::BiStats,
                Source::Recall,
                Source::Bottlenecks,
            ]
        );
        assert_eq!(reqs[7].path, "/bi/stats?periodo=mese");
    }

    #[tokio::test]
    async fn test_analyze_with_only_lead_stats_available() {
        let fake = Arc::new(FakeAnalytics {
            seen: Mutex::new(Vec::new()),
        });
        let dashboard = FunnelDashboard::new(fake.clone());
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();

        let analysis = dashboard
            .analyze_on(4, Period::Month, Some("user-token"), today)
            .await;

        let seen = fake.seen.lock().unwrap();
        assert_eq!(seen.len(), 10);
        assert!(seen.iter().all(|(_, t)| t.as_deref() == Some("user-token")));
        drop(seen);

        assert_eq!(analysis.stages.len(), 7);
        assert_eq!(analysis.edges.len(), 6);
        assert_eq!(analysis.stages[0].count, 100);
        assert_eq!(analysis.stages[1].count, 68);
        assert_eq!(analysis.stages[2].count, 50);
        assert_eq!(analysis.kpis.total_leads, 100);
        assert_eq!(analysis.kpis.no_show_rate, 12.0);

        let contact = analysis.findings.iter().find(|f| f.id == "b-contact").unwrap();
        assert_eq!(contact.severity, Severity::Warning);
        let upstream = analysis.findings.last().unwrap();
        assert_eq!(upstream.id, "api-1");
        assert_eq!(upstream.severity, Severity::Warning);
    }

    #[test]
    fn test_compose_with_total_outage_is_fully_populated() {
        let range = Period::Year.date_range(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        let requests = FunnelDashboard::requests(Period::Year, &range);
        let sources: Vec<Source> = requests.iter().map(|r| r.source).collect();
        let analysis = compose(Period::Year, range, &SnapshotSet::empty(&sources));

        assert!(analysis.stages.iter().all(|s| s.count > 0));
        assert!(!analysis.findings.is_empty());
        assert_eq!(analysis.kpis.total_leads, 145);
        assert_eq!(analysis.kpis.global_conversion, 21.4);
    }
}

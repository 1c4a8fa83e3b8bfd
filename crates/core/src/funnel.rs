//! Patient-acquisition funnel types shared by the reporting engine and the API.
//!
//! Stages run lead → contact → first visit → follow-up → proposal →
//! acceptance → production. Order is fixed and carries meaning.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ─── Period ─────────────────────────────────────────────────────────────────

/// Reporting window for the funnel dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum Period {
    #[default]
    #[serde(rename = "mese")]
    Month,
    #[serde(rename = "trimestre")]
    Quarter,
    #[serde(rename = "anno")]
    Year,
}

impl Period {
    pub fn months_back(&self) -> u32 {
        match self {
            Period::Month => 1,
            Period::Quarter => 3,
            Period::Year => 12,
        }
    }

    /// Value of the upstream `periodo` query parameter.
    pub fn as_query(&self) -> &'static str {
        match self {
            Period::Month => "mese",
            Period::Quarter => "trimestre",
            Period::Year => "anno",
        }
    }

    pub fn from_query(value: &str) -> Option<Self> {
        match value.trim() {
            "mese" => Some(Period::Month),
            "trimestre" => Some(Period::Quarter),
            "anno" => Some(Period::Year),
            _ => None,
        }
    }

    /// Date range covered by the period: from the first day of the month
    /// `months_back` months ago through the last day of the current month.
    pub fn date_range(&self, today: NaiveDate) -> DateRange {
        let current = today.year() * 12 + today.month0() as i32;
        let start = current - self.months_back() as i32;
        let from = first_of_month(start);
        let to = first_of_month(current + 1)
            .pred_opt()
            .unwrap_or(today);
        DateRange { from, to }
    }
}

fn first_of_month(month_index: i32) -> NaiveDate {
    let year = month_index.div_euclid(12);
    let month = month_index.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// `data_dal=YYYY-MM-DD&data_al=YYYY-MM-DD`
    pub fn as_query(&self) -> String {
        format!(
            "data_dal={}&data_al={}",
            self.from.format("%Y-%m-%d"),
            self.to.format("%Y-%m-%d")
        )
    }
}

// ─── Reconciled metrics ─────────────────────────────────────────────────────

/// Canonical metric snapshot after fallback resolution. Every field is
/// populated even when every upstream source failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledMetrics {
    pub total_leads: u64,
    pub contacted_leads: u64,
    pub first_visits: u64,
    pub follow_ups: u64,
    pub quotes_issued: u64,
    pub quotes_accepted: u64,
    pub quotes_value_issued: f64,
    pub quotes_value_accepted: f64,
    pub in_production: u64,
    pub revenue: f64,
    pub no_show_rate: f64,
    pub recall_rate: f64,
    pub lead_trend: f64,
    pub first_visit_trend: f64,
    /// Metrics that resolved through a ratio estimate or a demo default
    /// instead of an upstream field.
    pub fallbacks: Vec<String>,
}

// ─── Funnel ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStage {
    pub id: String,
    pub label: String,
    pub icon: String,
    pub color: String,
    pub count: u64,
    pub value: f64,
    /// Percentage of the previous stage; `None` only for the first stage.
    pub conversion_rate: Option<f64>,
    pub trend: f64,
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunnelEdge {
    pub from: String,
    pub to: String,
    pub percentage: f64,
    pub label: String,
}

// ─── Findings & recommendations ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    /// Upstream findings use a high/medium/low vocabulary.
    pub fn from_upstream(level: Option<&str>) -> Self {
        match level {
            Some("high") => Severity::Critical,
            Some("medium") => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// A diagnosed weak point in the funnel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub metric: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_route: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub icon: String,
    pub expected_impact: String,
}

// ─── Dashboard payload ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunnelKpis {
    pub total_leads: u64,
    /// Lead → production, percent.
    pub global_conversion: f64,
    pub monthly_revenue: f64,
    pub no_show_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunnelAnalysis {
    pub period: Period,
    pub range: DateRange,
    pub stages: Vec<FunnelStage>,
    pub edges: Vec<FunnelEdge>,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<Recommendation>,
    pub kpis: FunnelKpis,
    pub metrics: ReconciledMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_range_spans_previous_month_start_to_current_month_end() {
        let range = Period::Month.date_range(date(2026, 10, 18));
        assert_eq!(range.from, date(2026, 9, 1));
        assert_eq!(range.to, date(2026, 10, 31));
        assert_eq!(range.as_query(), "data_dal=2026-09-01&data_al=2026-10-31");
    }

    #[test]
    fn test_year_range_crosses_year_boundary() {
        let range = Period::Year.date_range(date(2026, 2, 10));
        assert_eq!(range.from, date(2025, 2, 1));
        assert_eq!(range.to, date(2026, 2, 28));
    }

    #[test]
    fn test_quarter_range_in_january() {
        let range = Period::Quarter.date_range(date(2027, 1, 5));
        assert_eq!(range.from, date(2026, 10, 1));
        assert_eq!(range.to, date(2027, 1, 31));
    }

    #[test]
    fn test_period_wire_names() {
        assert_eq!(serde_json::to_string(&Period::Quarter).unwrap(), "\"trimestre\"");
        let p: Period = serde_json::from_str("\"anno\"").unwrap();
        assert_eq!(p, Period::Year);
        assert_eq!(Period::default().as_query(), "mese");
        assert_eq!(Period::from_query("trimestre"), Some(Period::Quarter));
        assert_eq!(Period::from_query("weekly"), None);
    }

    #[test]
    fn test_upstream_severity_mapping() {
        assert_eq!(Severity::from_upstream(Some("high")), Severity::Critical);
        assert_eq!(Severity::from_upstream(Some("medium")), Severity::Warning);
        assert_eq!(Severity::from_upstream(Some("low")), Severity::Info);
        assert_eq!(Severity::from_upstream(None), Severity::Info);
    }
}

//! Per-turn financial context for the assistant.
//!
//! Every chat turn re-reads eight analytics sources and renders them as a
//! plain-text report the model can quote from. Nothing here is cached.

use cfo_core::chat::ChatContext;
use cfo_core::funnel::Period;
use cfo_upstream::{settle_all, AnalyticsSource, SnapshotSet, Source, SourceRequest};
use chrono::{DateTime, Datelike, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Last line of a report that hit the size bound.
pub const TRUNCATION_MARKER: &str = "[report truncated]";

const LEAD_STATES: [&str; 4] = ["nuovo", "contattato", "convertito", "perso"];

pub struct ContextAssembler {
    source: Arc<dyn AnalyticsSource>,
    max_report_chars: usize,
}

impl ContextAssembler {
    pub fn new(source: Arc<dyn AnalyticsSource>, max_report_chars: usize) -> Self {
        Self {
            source,
            max_report_chars,
        }
    }

    /// The eight chat sources, in slot order.
    pub fn requests(now: DateTime<Utc>) -> Vec<SourceRequest> {
        vec![
            SourceRequest::bi_stats(Period::Month),
            SourceRequest::leads(),
            SourceRequest::quotes(),
            SourceRequest::no_show(),
            SourceRequest::recall(),
            SourceRequest::kpi_targets(now.year(), now.month()),
            SourceRequest::executive_dashboard(),
            SourceRequest::bottlenecks(),
        ]
    }

    pub async fn build(
        &self,
        clinic_id: i64,
        auth_token: Option<&str>,
        current_page: Option<&str>,
    ) -> ChatContext {
        self.build_at(clinic_id, auth_token, current_page, Utc::now())
            .await
    }

    pub async fn build_at(
        &self,
        clinic_id: i64,
        auth_token: Option<&str>,
        current_page: Option<&str>,
        now: DateTime<Utc>,
    ) -> ChatContext {
        let requests = Self::requests(now);
        let snapshots = settle_all(self.source.as_ref(), clinic_id, auth_token, &requests).await;

        let report = bound_report(render_report(&snapshots, now, current_page), self.max_report_chars);
        info!(
            clinic_id,
            sources_available = snapshots.available(),
            report_chars = report.chars().count(),
            "Chat context assembled"
        );

        ChatContext {
            report,
            raw_data: snapshots.to_raw_bag(),
        }
    }
}

/// Render the text report. Absent sources simply omit their section.
pub fn render_report(
    snapshots: &SnapshotSet,
    now: DateTime<Utc>,
    current_page: Option<&str>,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("📅 Report updated: {}", now.format("%A, %-d %B %Y")));
    if let Some(page) = current_page.filter(|p| !p.is_empty()) {
        lines.push(format!("📍 The user is looking at the page: {page}"));
    }

    if let Some(bi) = snapshots.get(Source::BiStats) {
        lines.push("\n## Current month financials".to_string());
        push_currency(&mut lines, "Revenue", bi.get("fatturato"));
        push_currency(&mut lines, "Production", bi.get("produzione"));
        push_currency(
            &mut lines,
            "Revenue (KPI)",
            bi.get("kpi").and_then(|k| k.get("fatturato")),
        );
        if let Some(top) = bi.get("top_prestazioni").filter(|v| !v.is_null()) {
            lines.push(format!("- Top treatments: {top}"));
        }
    }

    if let Some(dashboard) = snapshots.get(Source::ExecutiveDashboard) {
        lines.push("\n## Executive dashboard".to_string());
        lines.push(dashboard.to_string());
    }

    if let Some(leads) = snapshots.get(Source::Leads) {
        match leads.as_array() {
            Some(list) => {
                let by_state = |state: &str| {
                    list.iter()
                        .filter(|l| l.get("stato").and_then(Value::as_str) == Some(state))
                        .count()
                };
                let [new, contacted, converted, lost] = LEAD_STATES.map(by_state);
                lines.push("\n## Leads".to_string());
                lines.push(format!("- Total: {}", list.len()));
                lines.push(format!(
                    "- New: {new}, Contacted: {contacted}, Converted: {converted}, Lost: {lost}"
                ));
            }
            None => lines.push(format!("\n## Leads: {leads}")),
        }
    }

    if let Some(quotes) = snapshots.get(Source::Quotes) {
        lines.push("\n## Quotes".to_string());
        push_plain(&mut lines, "Issued", quotes.get("emessi"), "");
        push_plain(&mut lines, "Accepted", quotes.get("accettati"), "");
        push_currency(&mut lines, "Total value", quotes.get("valore_totale"));
        push_plain(&mut lines, "Conversion rate", quotes.get("conversion_rate"), "%");
    }

    if let Some(no_show) = snapshots.get(Source::NoShow) {
        lines.push("\n## No-show".to_string());
        push_plain(&mut lines, "No-show rate", no_show.get("tasso_noshow"), "%");
        push_plain(&mut lines, "Rate", no_show.get("rate"), "%");
        push_plain(&mut lines, "Total no-shows", no_show.get("totale_noshow"), "");
    }

    if let Some(recall) = snapshots.get(Source::Recall) {
        lines.push("\n## Recall".to_string());
        push_plain(&mut lines, "Response rate", recall.get("tasso_risposta"), "%");
        push_plain(&mut lines, "Eligible patients", recall.get("pazienti_eleggibili"), "");
    }

    if let Some(kpi) = snapshots.get(Source::KpiTargets) {
        lines.push("\n## Targets vs results".to_string());
        lines.push(kpi.to_string());
    }

    if let Some(list) = snapshots.get(Source::Bottlenecks).and_then(Value::as_array) {
        lines.push("\n## Bottlenecks identified".to_string());
        for item in list {
            let title = first_text(item, &["titolo", "title"]).unwrap_or_default();
            let description = first_text(item, &["descrizione", "description"]).unwrap_or_default();
            lines.push(format!("- {title}: {description}"));
        }
    }

    lines.join("\n")
}

/// Cut the report to `max_chars` characters, ending it with a marker line.
pub fn bound_report(report: String, max_chars: usize) -> String {
    if report.chars().count() <= max_chars {
        return report;
    }
    let mut cut: String = report.chars().take(max_chars).collect();
    debug!(max_chars, "Chat context report truncated");
    cut.push('\n');
    cut.push_str(TRUNCATION_MARKER);
    cut
}

/// Whole euros with `.` thousands separators, e.g. `12.345 €`.
pub fn format_currency(amount: f64) -> String {
    let rounded = amount.round();
    // `as u64` saturates: amounts past u64::MAX print as u64::MAX.
    let digits = format!("{}", rounded.abs() as u64);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}{grouped} €")
}

fn push_currency(lines: &mut Vec<String>, label: &str, value: Option<&Value>) {
    let amount = value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    });
    if let Some(amount) = amount.filter(|a| a.is_finite()) {
        lines.push(format!("- {label}: {}", format_currency(amount)));
    }
}

fn push_plain(lines: &mut Vec<String>, label: &str, value: Option<&Value>, suffix: &str) {
    match value {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) => lines.push(format!("- {label}: {s}{suffix}")),
        Some(v) => lines.push(format!("- {label}: {v}{suffix}")),
    }
}

fn first_text(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| item.get(*k))
        .find(|v| !v.is_null())
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap()
    }

    fn all_sources() -> Vec<Source> {
        ContextAssembler::requests(now())
            .iter()
            .map(|r| r.source)
            .collect()
    }

    struct FakeAnalytics;

    #[async_trait]
    impl AnalyticsSource for FakeAnalytics {
        async fn fetch(&self, endpoint: &str, _clinic: i64, _token: Option<&str>) -> Option<Value> {
            if endpoint.starts_with("/bi/stats") {
                Some(json!({"success": true, "data": {"fatturato": 48250.4, "produzione": 51000}}))
            } else if endpoint.starts_with("/revenue/preventivi/stats") {
                Some(json!({"success": true, "data": {"emessi": 40, "accettati": 26, "conversion_rate": 65}}))
            } else {
                None
            }
        }
    }

    // 1. Currency ----------------------------------------------------------

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(12345.0), "12.345 €");
        assert_eq!(format_currency(0.0), "0 €");
        assert_eq!(format_currency(999.6), "1.000 €");
        assert_eq!(format_currency(1_234_567.0), "1.234.567 €");
        assert_eq!(format_currency(-1500.0), "-1.500 €");
        assert_eq!(format_currency(1e30), "18.446.744.073.709.551.615 €");
    }

    // 2. Rendering ---------------------------------------------------------

    #[test]
    fn test_requests_cover_eight_sources_with_current_kpi_month() {
        let requests = ContextAssembler::requests(now());
        assert_eq!(requests.len(), 8);
        assert_eq!(requests[0].path, "/bi/stats?periodo=mese");
        assert_eq!(requests[5].path, "/growth-mgmt/kpi?anno=2026&mese=10");
        assert_eq!(requests[7].source, Source::Bottlenecks);
    }

    #[test]
    fn test_total_outage_renders_header_only() {
        let report = render_report(&SnapshotSet::empty(&all_sources()), now(), None);
        assert_eq!(report, "📅 Report updated: Sunday, 18 October 2026");
    }

    #[test]
    fn test_page_line_follows_header() {
        let report = render_report(&SnapshotSet::empty(&all_sources()), now(), Some("/funnel"));
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[1], "📍 The user is looking at the page: /funnel");
    }

    #[test]
    fn test_sections_in_fixed_order() {
        let snapshots = SnapshotSet::empty(&all_sources())
            .with(Source::Bottlenecks, json!([{"titolo": "Slow contact", "descrizione": "48h average"}]))
            .with(Source::Recall, json!({"tasso_risposta": 41, "pazienti_eleggibili": 320}))
            .with(Source::Leads, json!([
                {"stato": "nuovo"}, {"stato": "nuovo"}, {"stato": "contattato"}, {"stato": "perso"}
            ]))
            .with(Source::BiStats, json!({"fatturato": 48250, "kpi": {"fatturato": 60000}}));

        let report = render_report(&snapshots, now(), None);

        let bi = report.find("## Current month financials").unwrap();
        let leads = report.find("## Leads").unwrap();
        let recall = report.find("## Recall").unwrap();
        let bottlenecks = report.find("## Bottlenecks identified").unwrap();
        assert!(bi < leads && leads < recall && recall < bottlenecks);

        assert!(report.contains("- Revenue: 48.250 €"));
        assert!(report.contains("- Revenue (KPI): 60.000 €"));
        assert!(report.contains("- Total: 4"));
        assert!(report.contains("- New: 2, Contacted: 1, Converted: 0, Lost: 1"));
        assert!(report.contains("- Response rate: 41%"));
        assert!(report.contains("- Slow contact: 48h average"));
        assert!(!report.contains("## Quotes"));
    }

    #[test]
    fn test_non_list_leads_render_as_json() {
        let snapshots = SnapshotSet::empty(&all_sources()).with(Source::Leads, json!({"totale": 12}));
        let report = render_report(&snapshots, now(), None);
        assert!(report.contains("## Leads: {\"totale\":12}"));
    }

    #[test]
    fn test_non_list_bottlenecks_are_skipped() {
        let snapshots =
            SnapshotSet::empty(&all_sources()).with(Source::Bottlenecks, json!({"count": 3}));
        let report = render_report(&snapshots, now(), None);
        assert!(!report.contains("Bottlenecks"));
    }

    // 3. Bounding ----------------------------------------------------------

    #[test]
    fn test_bound_report_cuts_on_char_boundary() {
        let report = "€".repeat(20);
        let bounded = bound_report(report, 5);
        assert_eq!(bounded, format!("€€€€€\n{TRUNCATION_MARKER}"));
        assert_eq!(bound_report("short".to_string(), 5), "short");
    }

    // 4. Assembly ----------------------------------------------------------

    #[tokio::test]
    async fn test_build_produces_report_and_raw_bag() {
        let assembler = ContextAssembler::new(Arc::new(FakeAnalytics), 12_000);
        let ctx = assembler.build_at(4, None, None, now()).await;

        assert!(ctx.report.contains("- Revenue: 48.250 €"));
        assert!(ctx.report.contains("- Production: 51.000 €"));
        assert!(ctx.report.contains("- Conversion rate: 65%"));

        let bag = ctx.raw_data.as_object().unwrap();
        assert_eq!(bag.len(), 8);
        for key in ["biStats", "leads", "quotes", "noShow", "recall", "kpi", "dashboard", "bottlenecks"] {
            assert!(bag.contains_key(key), "missing {key}");
        }
        assert_eq!(bag["quotes"]["emessi"], 40);
        assert!(bag["leads"].is_null());
    }
}

//! Bottleneck diagnosis over a built funnel.
//!
//! Five rules, evaluated in order; every rule that matches fires.

use crate::funnel::{stage, STAGE_ACCEPTANCE, STAGE_CONTACT, STAGE_FIRST_VISIT, STAGE_PRODUCTION};
use cfo_core::funnel::{Finding, FunnelStage, Priority, Recommendation, Severity};
use serde_json::Value;
use tracing::debug;

pub const CONTACT_THRESHOLD: f64 = 70.0;
pub const CONTACT_CRITICAL: f64 = 50.0;
pub const NO_SHOW_THRESHOLD: f64 = 15.0;
pub const NO_SHOW_CRITICAL: f64 = 25.0;
pub const ACCEPTANCE_THRESHOLD: f64 = 60.0;
pub const ACCEPTANCE_CRITICAL: f64 = 40.0;
pub const FIRST_VISIT_TREND_THRESHOLD: f64 = -5.0;
pub const FIRST_VISIT_TREND_CRITICAL: f64 = -15.0;
pub const PRODUCTION_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnosis {
    pub findings: Vec<Finding>,
    pub recommendations: Vec<Recommendation>,
}

fn rate_of(stages: &[FunnelStage], id: &str) -> Option<f64> {
    stage(stages, id).and_then(|s| s.conversion_rate)
}

fn finding(
    id: &str,
    title: &str,
    description: String,
    severity: Severity,
    metric: String,
    action: &str,
) -> Finding {
    Finding {
        id: id.to_string(),
        title: title.to_string(),
        description,
        severity,
        metric,
        action: action.to_string(),
        action_route: None,
    }
}

fn recommendation(
    id: &str,
    title: &str,
    description: &str,
    priority: Priority,
    icon: &str,
    expected_impact: &str,
) -> Recommendation {
    Recommendation {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        priority,
        icon: icon.to_string(),
        expected_impact: expected_impact.to_string(),
    }
}

/// Evaluate the rule table against the funnel and the no-show rate.
/// The returned findings are never empty.
pub fn diagnose(stages: &[FunnelStage], no_show_rate: f64) -> Diagnosis {
    let mut findings = Vec::new();
    let mut recommendations = Vec::new();

    // Lead contact
    if let Some(rate) = rate_of(stages, STAGE_CONTACT).filter(|r| *r < CONTACT_THRESHOLD) {
        let mut f = finding(
            "b-contact",
            "Low lead contact rate",
            format!("Only {rate}% of leads are contacted. Target: >80%"),
            if rate < CONTACT_CRITICAL { Severity::Critical } else { Severity::Warning },
            format!("{rate}%"),
            "Contact new leads within 2h",
        );
        f.action_route = Some("/revenue/leads".to_string());
        findings.push(f);
        recommendations.push(recommendation(
            "r-contact",
            "Automate lead contact",
            "Send an automatic SMS and email reply within 2h of a new lead",
            Priority::High,
            "bolt",
            "+15% lead→contact conversion",
        ));
    }

    // No-show
    if no_show_rate > NO_SHOW_THRESHOLD {
        findings.push(finding(
            "b-noshow",
            "High no-show rate",
            format!("{no_show_rate}% of appointments are missed. Target: <10%"),
            if no_show_rate > NO_SHOW_CRITICAL { Severity::Critical } else { Severity::Warning },
            format!("{no_show_rate}%"),
            "Set up automatic reminders",
        ));
        recommendations.push(recommendation(
            "r-noshow",
            "Reduce no-shows with reminders",
            "Send WhatsApp/SMS reminders 24h before each appointment with one-click confirmation",
            Priority::High,
            "calendar-times",
            "-30% no-show",
        ));
    }

    // Quote acceptance
    if let Some(rate) = rate_of(stages, STAGE_ACCEPTANCE).filter(|r| *r < ACCEPTANCE_THRESHOLD) {
        findings.push(finding(
            "b-quotes",
            "Quote acceptance below threshold",
            format!("Only {rate}% of quotes are accepted. Possible pricing or presentation issue"),
            if rate < ACCEPTANCE_CRITICAL { Severity::Critical } else { Severity::Warning },
            format!("{rate}%"),
            "Review quote presentation",
        ));
        recommendations.push(recommendation(
            "r-quotes",
            "Improve quote presentation",
            "Use visual quotes with before/after photos and instalment payment options",
            Priority::High,
            "file-invoice-dollar",
            "+10% quote acceptance",
        ));
    }

    // First visits trend
    if let Some(trend) = stage(stages, STAGE_FIRST_VISIT)
        .map(|s| s.trend)
        .filter(|t| *t < FIRST_VISIT_TREND_THRESHOLD)
    {
        findings.push(finding(
            "b-visits",
            "First visits declining",
            format!("First visits fell {}% versus the previous period", trend.abs()),
            if trend < FIRST_VISIT_TREND_CRITICAL { Severity::Critical } else { Severity::Warning },
            format!("{trend}%"),
            "Step up marketing campaigns",
        ));
    }

    // Retention
    if rate_of(stages, STAGE_PRODUCTION).is_some_and(|r| r < PRODUCTION_THRESHOLD) {
        recommendations.push(recommendation(
            "r-recall",
            "Automatic recall campaign",
            "Enable automatic recall for patients who have not returned in 6+ months",
            Priority::Medium,
            "bell",
            "+20% retention",
        ));
    }

    if findings.is_empty() {
        findings.push(finding(
            "b-ok",
            "Patient flow within norms",
            "All indicators are above target thresholds. Keep monitoring.".to_string(),
            Severity::Info,
            "OK".to_string(),
            "Keep monitoring",
        ));
    }

    debug!(
        findings = findings.len(),
        recommendations = recommendations.len(),
        "Funnel diagnosed"
    );

    Diagnosis {
        findings,
        recommendations,
    }
}

fn text_field<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| item.get(*k).and_then(Value::as_str))
}

fn id_field(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Append upstream-supplied findings whose title is not already present.
/// Existing findings win on a title collision.
pub fn merge_upstream(findings: &mut Vec<Finding>, upstream: Option<&Value>) {
    let Some(items) = upstream.and_then(Value::as_array) else {
        return;
    };

    for item in items {
        let title = text_field(item, &["titolo", "title"]).unwrap_or("Bottleneck");
        if findings.iter().any(|f| f.title == title) {
            debug!(title, "Upstream finding dropped, title already present");
            continue;
        }
        let id = id_field(item).unwrap_or_else(|| findings.len().to_string());
        findings.push(Finding {
            id: format!("api-{id}"),
            title: title.to_string(),
            description: text_field(item, &["descrizione", "description"])
                .unwrap_or_default()
                .to_string(),
            severity: Severity::from_upstream(item.get("severity").and_then(Value::as_str)),
            metric: text_field(item, &["metrica", "metric"])
                .unwrap_or_default()
                .to_string(),
            action: text_field(item, &["azione", "action"])
                .unwrap_or_default()
                .to_string(),
            action_route: None,
        });
    }
}

//! Metric reconciliation over loosely shaped upstream snapshots.
//!
//! Each canonical metric has an ordered list of named extraction strategies.
//! The first strategy that yields a number wins; when none does, the metric
//! falls back to a demo default or to an estimate derived from the previous
//! funnel stage with a fixed empirical ratio. Estimates are shown as regular
//! figures; the names of estimated metrics are collected in
//! `ReconciledMetrics::fallbacks`.

use cfo_core::funnel::ReconciledMetrics;
use cfo_upstream::{SnapshotSet, Source};
use serde_json::Value;
use tracing::debug;

// ─── Fallback constants ─────────────────────────────────────────────────────

pub const DEMO_TOTAL_LEADS: f64 = 145.0;
pub const DEMO_NO_SHOW_RATE: f64 = 12.0;

pub const CONTACT_RATIO: f64 = 0.68;
pub const FIRST_VISIT_RATIO: f64 = 0.73;
pub const FOLLOW_UP_RATIO: f64 = 0.81;
pub const QUOTE_ISSUED_RATIO: f64 = 0.88;
pub const QUOTE_ACCEPTED_RATIO: f64 = 0.67;
pub const PRODUCTION_RATIO: f64 = 0.91;

// ─── Strategies ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Numeric value at a nested field path.
    Field(&'static [&'static str]),
    /// Length of the snapshot when it is a list.
    ListLen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub name: &'static str,
    pub source: Source,
    pub probe: Probe,
}

impl Strategy {
    pub const fn field(name: &'static str, source: Source, path: &'static [&'static str]) -> Self {
        Self {
            name,
            source,
            probe: Probe::Field(path),
        }
    }

    pub const fn list_len(name: &'static str, source: Source) -> Self {
        Self {
            name,
            source,
            probe: Probe::ListLen,
        }
    }

    pub fn extract(&self, snapshots: &SnapshotSet) -> Option<f64> {
        let data = snapshots.get(self.source)?;
        match self.probe {
            Probe::Field(path) => path
                .iter()
                .try_fold(data, |value, key| value.get(*key))
                .and_then(as_number),
            Probe::ListLen => data.as_array().map(|items| items.len() as f64),
        }
    }
}

/// Numbers and numeric strings count; anything else does not.
pub fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// First strategy that yields a value, with its name.
pub fn first_match(
    strategies: &[Strategy],
    snapshots: &SnapshotSet,
) -> Option<(&'static str, f64)> {
    strategies
        .iter()
        .find_map(|s| s.extract(snapshots).map(|v| (s.name, v)))
}

pub const TOTAL_LEADS: &[Strategy] = &[
    Strategy::field("lead_stats.totale", Source::LeadStats, &["totale"]),
    Strategy::list_len("leads.len", Source::Leads),
];

pub const CONTACTED_LEADS: &[Strategy] = &[Strategy::field(
    "lead_stats.contattati",
    Source::LeadStats,
    &["contattati"],
)];

pub const FIRST_VISITS: &[Strategy] = &[
    Strategy::list_len("first_visits.len", Source::FirstVisits),
    Strategy::field("first_visits.totale", Source::FirstVisits, &["totale"]),
];

pub const FOLLOW_UPS: &[Strategy] = &[
    Strategy::list_len("follow_ups.len", Source::FollowUps),
    Strategy::field("follow_ups.totale", Source::FollowUps, &["totale"]),
];

pub const QUOTES_ISSUED: &[Strategy] = &[
    Strategy::field("quotes.emessi", Source::Quotes, &["emessi"]),
    Strategy::field("quotes.totale", Source::Quotes, &["totale"]),
];

pub const QUOTES_ACCEPTED: &[Strategy] = &[
    Strategy::field("quotes.accettati", Source::Quotes, &["accettati"]),
    Strategy::field(
        "conversion_report.accettati",
        Source::ConversionReport,
        &["accettati"],
    ),
];

pub const QUOTES_VALUE_ISSUED: &[Strategy] = &[Strategy::field(
    "quotes.valore_totale",
    Source::Quotes,
    &["valore_totale"],
)];

pub const QUOTES_VALUE_ACCEPTED: &[Strategy] = &[
    Strategy::field("quotes.valore_accettati", Source::Quotes, &["valore_accettati"]),
    Strategy::field("conversion_report.valore", Source::ConversionReport, &["valore"]),
];

pub const IN_PRODUCTION: &[Strategy] = &[Strategy::field(
    "conversion_report.in_produzione",
    Source::ConversionReport,
    &["in_produzione"],
)];

pub const REVENUE: &[Strategy] = &[
    Strategy::field("bi_stats.fatturato", Source::BiStats, &["fatturato"]),
    Strategy::field("bi_stats.kpi.fatturato", Source::BiStats, &["kpi", "fatturato"]),
];

pub const NO_SHOW_RATE: &[Strategy] = &[
    Strategy::field("no_show.tasso_noshow", Source::NoShow, &["tasso_noshow"]),
    Strategy::field("no_show.rate", Source::NoShow, &["rate"]),
];

pub const RECALL_RATE: &[Strategy] = &[Strategy::field(
    "recall.tasso_risposta",
    Source::Recall,
    &["tasso_risposta"],
)];

pub const LEAD_TREND: &[Strategy] = &[Strategy::field("lead_stats.trend", Source::LeadStats, &["trend"])];

pub const FIRST_VISIT_TREND: &[Strategy] = &[Strategy::field(
    "first_visits.trend",
    Source::FirstVisits,
    &["trend"],
)];

// ─── Resolution ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Fallback {
    /// No data means zero; not recorded as a fallback.
    Zero,
    /// Fixed demo figure.
    Demo(f64),
    /// Fixed share of the previous stage's resolved count.
    Ratio { base: u64, ratio: f64 },
}

struct Resolver<'a> {
    snapshots: &'a SnapshotSet,
    fallbacks: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn resolve(&mut self, metric: &str, strategies: &[Strategy], fallback: Fallback) -> f64 {
        if let Some((strategy, value)) = first_match(strategies, self.snapshots) {
            debug!(metric, strategy, value, "Metric resolved from upstream");
            return value;
        }
        match fallback {
            Fallback::Zero => 0.0,
            Fallback::Demo(value) => {
                self.fallbacks.push(metric.to_string());
                value
            }
            Fallback::Ratio { base, ratio } => {
                self.fallbacks.push(metric.to_string());
                estimate(base, ratio) as f64
            }
        }
    }

    fn count(&mut self, metric: &str, strategies: &[Strategy], fallback: Fallback) -> u64 {
        self.resolve(metric, strategies, fallback).max(0.0).round() as u64
    }

    fn amount(&mut self, metric: &str, strategies: &[Strategy], fallback: Fallback) -> f64 {
        self.resolve(metric, strategies, fallback).max(0.0)
    }
}

/// Estimated count for a stage from the previous stage's count.
pub fn estimate(base: u64, ratio: f64) -> u64 {
    (base as f64 * ratio).round() as u64
}

/// Percentage rounded to one decimal, kept within [0, 100]; 0 when the
/// denominator is not positive.
pub fn percent(numerator: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 {
        return 0.0;
    }
    ((numerator / denominator * 1000.0).round() / 10.0).clamp(0.0, 100.0)
}

/// Resolve every canonical metric. Never fails; total absence yields the
/// demo defaults and the ratio-estimated stage counts.
pub fn reconcile(snapshots: &SnapshotSet) -> ReconciledMetrics {
    let mut r = Resolver {
        snapshots,
        fallbacks: Vec::new(),
    };

    let total_leads = r.count("totalLeads", TOTAL_LEADS, Fallback::Demo(DEMO_TOTAL_LEADS));
    let contacted_leads = r.count(
        "contactedLeads",
        CONTACTED_LEADS,
        Fallback::Ratio { base: total_leads, ratio: CONTACT_RATIO },
    );
    let first_visits = r.count(
        "firstVisits",
        FIRST_VISITS,
        Fallback::Ratio { base: contacted_leads, ratio: FIRST_VISIT_RATIO },
    );
    let follow_ups = r.count(
        "followUps",
        FOLLOW_UPS,
        Fallback::Ratio { base: first_visits, ratio: FOLLOW_UP_RATIO },
    );
    let quotes_issued = r.count(
        "quotesIssued",
        QUOTES_ISSUED,
        Fallback::Ratio { base: follow_ups, ratio: QUOTE_ISSUED_RATIO },
    );
    let quotes_accepted = r.count(
        "quotesAccepted",
        QUOTES_ACCEPTED,
        Fallback::Ratio { base: quotes_issued, ratio: QUOTE_ACCEPTED_RATIO },
    );
    let in_production = r.count(
        "inProduction",
        IN_PRODUCTION,
        Fallback::Ratio { base: quotes_accepted, ratio: PRODUCTION_RATIO },
    );

    let quotes_value_issued = r.amount("quotesValueIssued", QUOTES_VALUE_ISSUED, Fallback::Zero);
    let quotes_value_accepted =
        r.amount("quotesValueAccepted", QUOTES_VALUE_ACCEPTED, Fallback::Zero);
    let revenue = r.amount("revenue", REVENUE, Fallback::Zero);
    let no_show_rate = r.amount("noShowRate", NO_SHOW_RATE, Fallback::Demo(DEMO_NO_SHOW_RATE));
    let recall_rate = r.amount("recallRate", RECALL_RATE, Fallback::Zero);
    let lead_trend = r.resolve("leadTrend", LEAD_TREND, Fallback::Zero);
    let first_visit_trend = r.resolve("firstVisitTrend", FIRST_VISIT_TREND, Fallback::Zero);

    if !r.fallbacks.is_empty() {
        debug!(fallbacks = ?r.fallbacks, "Metrics resolved without upstream data");
    }

    ReconciledMetrics {
        total_leads,
        contacted_leads,
        first_visits,
        follow_ups,
        quotes_issued,
        quotes_accepted,
        quotes_value_issued,
        quotes_value_accepted,
        in_production,
        revenue,
        no_show_rate,
        recall_rate,
        lead_trend,
        first_visit_trend,
        fallbacks: r.fallbacks,
    }
}

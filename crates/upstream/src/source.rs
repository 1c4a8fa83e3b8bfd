//! Named upstream sources and the endpoints they are read from.

use cfo_core::funnel::{DateRange, Period};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Leads,
    LeadStats,
    FirstVisits,
    FollowUps,
    NoShow,
    Quotes,
    ConversionReport,
    BiStats,
    Recall,
    Bottlenecks,
    KpiTargets,
    ExecutiveDashboard,
}

impl Source {
    /// Key used in raw-data bags and log fields.
    pub fn key(&self) -> &'static str {
        match self {
            Source::Leads => "leads",
            Source::LeadStats => "leadStats",
            Source::FirstVisits => "firstVisits",
            Source::FollowUps => "followUps",
            Source::NoShow => "noShow",
            Source::Quotes => "quotes",
            Source::ConversionReport => "conversionReport",
            Source::BiStats => "biStats",
            Source::Recall => "recall",
            Source::Bottlenecks => "bottlenecks",
            Source::KpiTargets => "kpi",
            Source::ExecutiveDashboard => "dashboard",
        }
    }
}

/// One slot of a fan-out: which source, and the path it is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    pub source: Source,
    pub path: String,
}

impl SourceRequest {
    pub fn new(source: Source, path: impl Into<String>) -> Self {
        Self {
            source,
            path: path.into(),
        }
    }

    pub fn leads() -> Self {
        Self::new(Source::Leads, "/revenue/leads")
    }

    pub fn leads_in(range: &DateRange) -> Self {
        Self::new(Source::Leads, format!("/revenue/leads?{}", range.as_query()))
    }

    pub fn lead_stats() -> Self {
        Self::new(Source::LeadStats, "/leads/stats/dashboard")
    }

    pub fn first_visits(range: &DateRange) -> Self {
        Self::new(
            Source::FirstVisits,
            format!("/appuntamenti?tipo=primo_accesso&{}", range.as_query()),
        )
    }

    pub fn follow_ups(range: &DateRange) -> Self {
        Self::new(
            Source::FollowUps,
            format!("/appuntamenti?tipo=visita_follow_up&{}", range.as_query()),
        )
    }

    pub fn no_show() -> Self {
        Self::new(Source::NoShow, "/revenue/noshow/stats")
    }

    pub fn quotes() -> Self {
        Self::new(Source::Quotes, "/revenue/preventivi/stats")
    }

    pub fn conversion_report(range: &DateRange) -> Self {
        Self::new(
            Source::ConversionReport,
            format!("/report/conversione-preventivi?{}", range.as_query()),
        )
    }

    pub fn bi_stats(period: Period) -> Self {
        Self::new(
            Source::BiStats,
            format!("/bi/stats?periodo={}", period.as_query()),
        )
    }

    pub fn recall() -> Self {
        Self::new(Source::Recall, "/revenue/recall/stats")
    }

    pub fn bottlenecks() -> Self {
        Self::new(Source::Bottlenecks, "/growth-mgmt/bottlenecks")
    }

    pub fn kpi_targets(year: i32, month: u32) -> Self {
        Self::new(
            Source::KpiTargets,
            format!("/growth-mgmt/kpi?anno={year}&mese={month}"),
        )
    }

    pub fn executive_dashboard() -> Self {
        Self::new(Source::ExecutiveDashboard, "/revenue/dashboard")
    }
}

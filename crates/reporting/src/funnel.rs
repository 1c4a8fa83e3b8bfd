//! Funnel derivation: the fixed seven-stage patient pipeline and its
//! transition edges.

use crate::reconcile::percent;
use cfo_core::funnel::{FunnelEdge, FunnelKpis, FunnelStage, ReconciledMetrics};

pub const STAGE_LEAD: &str = "lead";
pub const STAGE_CONTACT: &str = "contact";
pub const STAGE_FIRST_VISIT: &str = "first-visit";
pub const STAGE_FOLLOW_UP: &str = "follow-up";
pub const STAGE_PROPOSAL: &str = "proposal";
pub const STAGE_ACCEPTANCE: &str = "acceptance";
pub const STAGE_PRODUCTION: &str = "production";

struct StageDef {
    id: &'static str,
    label: &'static str,
    icon: &'static str,
    color: &'static str,
    details: &'static str,
}

const STAGES: [StageDef; 7] = [
    StageDef {
        id: STAGE_LEAD,
        label: "Lead Generation",
        icon: "bullhorn",
        color: "purple",
        details: "Total leads generated in the period",
    },
    StageDef {
        id: STAGE_CONTACT,
        label: "Contact / Qualification",
        icon: "phone",
        color: "indigo",
        details: "Leads contacted and qualified",
    },
    StageDef {
        id: STAGE_FIRST_VISIT,
        label: "First Visit",
        icon: "calendar-check",
        color: "blue",
        details: "First-access appointments completed",
    },
    StageDef {
        id: STAGE_FOLLOW_UP,
        label: "Follow-up",
        icon: "redo",
        color: "cyan",
        details: "Patients returning for a follow-up",
    },
    StageDef {
        id: STAGE_PROPOSAL,
        label: "Treatment Proposal",
        icon: "file-medical",
        color: "teal",
        details: "Quotes issued to patients",
    },
    StageDef {
        id: STAGE_ACCEPTANCE,
        label: "Acceptance",
        icon: "check-circle",
        color: "emerald",
        details: "Quotes accepted by the patient",
    },
    StageDef {
        id: STAGE_PRODUCTION,
        label: "Production",
        icon: "tooth",
        color: "green",
        details: "Treatments in progress or completed",
    },
];

/// Build the seven stages in pipeline order. The first stage has no
/// conversion rate; every other stage converts from its predecessor.
pub fn build_stages(m: &ReconciledMetrics) -> Vec<FunnelStage> {
    let counts = [
        m.total_leads,
        m.contacted_leads,
        m.first_visits,
        m.follow_ups,
        m.quotes_issued,
        m.quotes_accepted,
        m.in_production,
    ];
    let values = [
        0.0,
        0.0,
        0.0,
        0.0,
        m.quotes_value_issued,
        m.quotes_value_accepted,
        m.revenue,
    ];
    let trends = [m.lead_trend, 0.0, m.first_visit_trend, 0.0, 0.0, 0.0, 0.0];

    let mut previous: Option<u64> = None;
    STAGES
        .iter()
        .enumerate()
        .map(|(i, def)| {
            let count = counts[i];
            let conversion_rate = previous.map(|prev| percent(count as f64, prev as f64));
            previous = Some(count);
            FunnelStage {
                id: def.id.to_string(),
                label: def.label.to_string(),
                icon: def.icon.to_string(),
                color: def.color.to_string(),
                count,
                value: values[i],
                conversion_rate,
                trend: trends[i],
                details: def.details.to_string(),
            }
        })
        .collect()
}

/// Edges between adjacent stages. The only place edges are produced.
pub fn build_edges(stages: &[FunnelStage]) -> Vec<FunnelEdge> {
    stages
        .windows(2)
        .map(|pair| FunnelEdge {
            from: pair[0].id.clone(),
            to: pair[1].id.clone(),
            percentage: pair[1].conversion_rate.unwrap_or(0.0),
            label: pair[1].label.clone(),
        })
        .collect()
}

pub fn build_kpis(m: &ReconciledMetrics) -> FunnelKpis {
    FunnelKpis {
        total_leads: m.total_leads,
        global_conversion: percent(m.in_production as f64, m.total_leads as f64),
        monthly_revenue: m.revenue,
        no_show_rate: m.no_show_rate,
    }
}

pub fn stage<'a>(stages: &'a [FunnelStage], id: &str) -> Option<&'a FunnelStage> {
    stages.iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> ReconciledMetrics {
        ReconciledMetrics {
            total_leads: 145,
            contacted_leads: 98,
            first_visits: 72,
            follow_ups: 58,
            quotes_issued: 51,
            quotes_accepted: 34,
            quotes_value_issued: 187_000.0,
            quotes_value_accepted: 128_000.0,
            in_production: 31,
            revenue: 118_000.0,
            no_show_rate: 12.0,
            recall_rate: 40.0,
            lead_trend: 12.0,
            first_visit_trend: -3.0,
            fallbacks: Vec::new(),
        }
    }

    #[test]
    fn test_seven_stages_in_fixed_order() {
        let stages = build_stages(&metrics());
        let ids: Vec<&str> = stages.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                STAGE_LEAD,
                STAGE_CONTACT,
                STAGE_FIRST_VISIT,
                STAGE_FOLLOW_UP,
                STAGE_PROPOSAL,
                STAGE_ACCEPTANCE,
                STAGE_PRODUCTION
            ]
        );
    }

    #[test]
    fn test_conversion_rates_follow_previous_stage() {
        let stages = build_stages(&metrics());
        assert_eq!(stages[0].conversion_rate, None);
        for i in 1..stages.len() {
            assert_eq!(
                stages[i].conversion_rate,
                Some(percent(stages[i].count as f64, stages[i - 1].count as f64))
            );
        }
        assert_eq!(stages[1].conversion_rate, Some(67.6));
        assert_eq!(stages[6].conversion_rate, Some(91.2));
    }

    #[test]
    fn test_values_and_trends_land_on_their_stages() {
        let stages = build_stages(&metrics());
        assert_eq!(stages[0].trend, 12.0);
        assert_eq!(stages[2].trend, -3.0);
        assert_eq!(stages[4].value, 187_000.0);
        assert_eq!(stages[5].value, 128_000.0);
        assert_eq!(stages[6].value, 118_000.0);
        assert_eq!(stages[1].value, 0.0);
    }

    #[test]
    fn test_edges_connect_adjacent_stages() {
        let stages = build_stages(&metrics());
        let edges = build_edges(&stages);
        assert_eq!(edges.len(), 6);
        for (i, edge) in edges.iter().enumerate() {
            assert_eq!(edge.from, stages[i].id);
            assert_eq!(edge.to, stages[i + 1].id);
            assert_eq!(Some(edge.percentage), stages[i + 1].conversion_rate);
            assert_eq!(edge.label, stages[i + 1].label);
        }
    }

    #[test]
    fn test_zero_counts_never_divide_by_zero() {
        let stages = build_stages(&ReconciledMetrics::default());
        assert!(stages[1..].iter().all(|s| s.conversion_rate == Some(0.0)));
        assert!(build_edges(&stages).iter().all(|e| e.percentage == 0.0));
    }

    #[test]
    fn test_kpis() {
        let kpis = build_kpis(&metrics());
        assert_eq!(kpis.total_leads, 145);
        assert_eq!(kpis.global_conversion, 21.4);
        assert_eq!(kpis.monthly_revenue, 118_000.0);
        assert_eq!(kpis.no_show_rate, 12.0);
    }
}

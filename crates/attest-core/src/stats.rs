//! Aggregate figures for the dashboard and the exports.
//!
//! Everything here is recomputed from the current rows on every call.

use crate::errors::Result;
use crate::model::{Control, ControlStatus, Risk};
use crate::risk::{RiskBanding, Severity};
use crate::storage::Store;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ComplianceStats {
    #[serde(rename = "total_controls")]
    pub total: u64,
    #[serde(rename = "compliant_controls")]
    pub compliant: u64,
    #[serde(rename = "non_compliant_controls")]
    pub non_compliant: u64,
    #[serde(rename = "not_applicable_controls")]
    pub not_applicable: u64,
    #[serde(rename = "not_assessed_controls")]
    pub not_assessed: u64,
    pub compliance_percentage: f64,
}

impl ComplianceStats {
    pub fn assessed(&self) -> u64 {
        self.total - self.not_assessed
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskStats {
    #[serde(rename = "total_risks")]
    pub total: u64,
    #[serde(rename = "high_risks")]
    pub high: u64,
    #[serde(rename = "medium_risks")]
    pub medium: u64,
    #[serde(rename = "low_risks")]
    pub low: u64,
}

/// Compliance percentage is compliant over assessed controls (Not Applicable
/// counts as assessed), rounded to one decimal, and 0 when nothing has been
/// assessed yet.
pub fn compliance_stats(controls: &[Control]) -> ComplianceStats {
    let mut s = ComplianceStats {
        total: controls.len() as u64,
        ..Default::default()
    };
    for c in controls {
        match c.status {
            ControlStatus::Compliant => s.compliant += 1,
            ControlStatus::NotCompliant => s.non_compliant += 1,
            ControlStatus::NotApplicable => s.not_applicable += 1,
            ControlStatus::NotAssessed => s.not_assessed += 1,
        }
    }
    s.compliance_percentage = percentage(s.compliant, s.assessed());
    s
}

pub fn risk_stats(risks: &[Risk], banding: &RiskBanding) -> RiskStats {
    let mut s = RiskStats {
        total: risks.len() as u64,
        ..Default::default()
    };
    for r in risks {
        match banding.severity_of(r) {
            Severity::High => s.high += 1,
            Severity::Medium => s.medium += 1,
            Severity::Low => s.low += 1,
        }
    }
    s
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round1(part as f64 / whole as f64 * 100.0)
}

/// One decimal, exact halves to even: 6.25 -> 6.2, 18.75 -> 18.8.
fn round1(v: f64) -> f64 {
    (v * 10.0).round_ties_even() / 10.0
}

/// Everything the overview screen shows, read in one go.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    #[serde(flatten)]
    pub compliance: ComplianceStats,
    #[serde(flatten)]
    pub risks: RiskStats,
    pub evidence_count: u64,
    pub recent_assessments: Vec<Control>,
}

pub fn dashboard(store: &Store, banding: &RiskBanding, recent: u32) -> Result<Dashboard> {
    let controls = store.list_controls(None)?;
    let risks = store.list_risks()?;
    Ok(Dashboard {
        compliance: compliance_stats(&controls),
        risks: risk_stats(&risks, banding),
        evidence_count: store.evidence_count()?,
        recent_assessments: store.recent_assessments(recent)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use chrono::Utc;

    fn control(n: usize, status: ControlStatus) -> Control {
        Control {
            control_id: format!("A.5.{}", n),
            title: String::new(),
            description: String::new(),
            category: Category::Organizational,
            status,
            notes: None,
            assessed_by: None,
            assessed_at: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn percentage_guard_on_empty_denominator() {
        assert_eq!(compliance_stats(&[]).compliance_percentage, 0.0);
        let all_unassessed: Vec<_> = (1..=5).map(|n| control(n, ControlStatus::NotAssessed)).collect();
        let s = compliance_stats(&all_unassessed);
        assert_eq!(s.assessed(), 0);
        assert_eq!(s.compliance_percentage, 0.0);
    }

    #[test]
    fn not_applicable_counts_as_assessed() {
        let controls = vec![
            control(1, ControlStatus::Compliant),
            control(2, ControlStatus::NotApplicable),
            control(3, ControlStatus::NotAssessed),
        ];
        let s = compliance_stats(&controls);
        assert_eq!(s.assessed(), 2);
        assert_eq!(s.compliance_percentage, 50.0);
    }

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(percentage(10, 15), 66.7);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(3, 3), 100.0);
    }

    #[test]
    fn halves_round_to_even() {
        assert_eq!(percentage(1, 16), 6.2);
        assert_eq!(percentage(3, 16), 18.8);
        assert_eq!(percentage(1, 8), 12.5);
    }
}

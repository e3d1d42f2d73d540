pub mod console;
pub mod csv;
pub mod json;

use crate::model::{Control, Identity, Risk};
use crate::risk::RiskBanding;
use crate::stats::{compliance_stats, risk_stats, ComplianceStats, RiskStats};
use crate::storage::Store;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot handed to the export writers.
///
/// Field names are a stable contract for JSON consumers.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
    pub controls: Vec<Control>,
    pub risks: Vec<Risk>,
    pub evidence_count: u64,
    #[serde(flatten)]
    pub compliance: ComplianceStats,
    #[serde(flatten)]
    pub risk_summary: RiskStats,
    #[serde(skip)]
    pub banding: RiskBanding,
}

impl AuditReport {
    pub fn build(
        store: &Store,
        banding: &RiskBanding,
        generated_by: &Identity,
    ) -> crate::errors::Result<Self> {
        let controls = store.list_controls(None)?;
        let risks = store.list_risks()?;
        let evidence_count = store.evidence_count()?;
        Ok(Self {
            generated_at: Utc::now(),
            generated_by: generated_by.to_string(),
            compliance: compliance_stats(&controls),
            risk_summary: risk_stats(&risks, banding),
            controls,
            risks,
            evidence_count,
            banding: *banding,
        })
    }
}

/// "1.5 KB"-style size, two decimals at most, 1024-based.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let mut s = format!("{:.2}", value);
    while s.ends_with('0') && !s.ends_with(".0") {
        s.pop();
    }
    format!("{} {}", s, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::human_size;

    #[test]
    fn human_sizes() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(512), "512.0 B");
        assert_eq!(human_size(1024), "1.0 KB");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(1_300_000), "1.24 MB");
        assert_eq!(human_size(16 * 1024 * 1024), "16.0 MB");
        assert_eq!(human_size(5 * 1024 * 1024 * 1024 * 1024), "5120.0 GB");
    }
}

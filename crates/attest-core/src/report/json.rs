use super::AuditReport;
use std::path::Path;

pub fn to_json_string(report: &AuditReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn write_json(report: &AuditReport, out: &Path) -> anyhow::Result<()> {
    std::fs::write(out, to_json_string(report)?)?;
    Ok(())
}

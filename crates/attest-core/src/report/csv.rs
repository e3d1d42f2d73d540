use super::AuditReport;
use anyhow::Context;
use std::path::Path;

const TITLE: &str = "ISO 27001:2022 Audit Report";

/// Sectioned CSV: a short header block, the control assessments, then the
/// risk register, separated by blank lines.
pub fn to_csv(report: &AuditReport) -> anyhow::Result<Vec<u8>> {
    let mut out = block(|w| {
        w.write_record([TITLE])?;
        let generated_at = report.generated_at.format("%Y-%m-%d %H:%M:%S").to_string();
        w.write_record(["Generated at:", generated_at.as_str()])?;
        w.write_record(["Generated by:", report.generated_by.as_str()])?;
        Ok(())
    })?;
    out.push(b'\n');

    out.extend(block(|w| {
        w.write_record(["Controls Assessment"])?;
        w.write_record([
            "Control ID",
            "Title",
            "Status",
            "Notes",
            "Assessed By",
            "Assessed At",
        ])?;
        for c in &report.controls {
            w.write_record([
                c.control_id.clone(),
                c.title.clone(),
                c.status.to_string(),
                c.notes.clone().unwrap_or_default(),
                c.assessed_by.clone().unwrap_or_default(),
                c.assessed_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default(),
            ])?;
        }
        Ok(())
    })?);
    out.push(b'\n');

    out.extend(block(|w| {
        w.write_record(["Risk Register"])?;
        w.write_record([
            "Title",
            "Description",
            "Likelihood",
            "Impact",
            "Risk Score",
            "Severity",
            "Status",
            "Owner",
        ])?;
        for r in &report.risks {
            w.write_record([
                r.title.clone(),
                r.description.clone(),
                r.likelihood.get().to_string(),
                r.impact.get().to_string(),
                r.score().to_string(),
                report.banding.severity_of(r).to_string(),
                r.status.to_string(),
                r.owner.clone(),
            ])?;
        }
        Ok(())
    })?);

    Ok(out)
}

pub fn write_csv(report: &AuditReport, out: &Path) -> anyhow::Result<()> {
    std::fs::write(out, to_csv(report)?)
        .with_context(|| format!("failed to write {}", out.display()))?;
    Ok(())
}

fn block<F>(f: F) -> anyhow::Result<Vec<u8>>
where
    F: FnOnce(&mut ::csv::Writer<Vec<u8>>) -> ::csv::Result<()>,
{
    let mut w = ::csv::WriterBuilder::new()
        .flexible(true)
        .terminator(::csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    f(&mut w)?;
    w.into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush csv: {}", e.error()))
}

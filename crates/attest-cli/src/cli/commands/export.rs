use super::{exit_codes, App};
use crate::cli::args::ExportArgs;
use attest_core::report::{csv, json, AuditReport};
use std::path::PathBuf;

pub async fn run(args: ExportArgs, app: &App) -> anyhow::Result<i32> {
    let who = app.require_identity()?;
    let report = AuditReport::build(&app.store, &app.cfg.risk_banding, &who)?;

    let out = args.out.unwrap_or_else(|| {
        PathBuf::from(format!(
            "iso27001_audit_report_{}.{}",
            report.generated_at.format("%Y%m%d_%H%M%S"),
            args.format
        ))
    });
    match args.format.as_str() {
        "csv" => csv::write_csv(&report, &out)?,
        _ => json::write_json(&report, &out)?,
    }

    tracing::info!(
        event = "attest.report.exported",
        format = %args.format,
        path = %out.display(),
        generated_by = %who,
    );
    eprintln!("wrote {}", out.display());
    Ok(exit_codes::OK)
}

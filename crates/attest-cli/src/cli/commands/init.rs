use super::{exit_codes, App};
use crate::cli::args::{GlobalArgs, InitArgs};
use attest_core::config::{write_sample_config, DEFAULT_CONFIG_FILE};
use std::path::Path;

pub fn write_config(args: &InitArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let path = global
        .config
        .as_deref()
        .unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    if path.exists() && !args.force {
        eprintln!("config exists, keeping {}", path.display());
        return Ok(());
    }
    write_sample_config(path)?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

pub async fn run(app: &App) -> anyhow::Result<i32> {
    // Opening the app already created the schema and seeded the catalog.
    tokio::fs::create_dir_all(&app.cfg.evidence_dir).await?;
    let stats = app.store.stats_best_effort()?;
    let n = |v: Option<u64>| v.map_or_else(|| "?".to_string(), |v| v.to_string());
    println!(
        "initialized {} (schema v{}): {} controls, {} assessed, {} evidence files, {} risks, {} users",
        app.cfg.database.display(),
        stats.version.as_deref().unwrap_or("?"),
        n(stats.controls),
        n(stats.assessed),
        n(stats.evidence),
        n(stats.risks),
        n(stats.users)
    );
    println!("evidence directory: {}", app.cfg.evidence_dir.display());
    Ok(exit_codes::OK)
}

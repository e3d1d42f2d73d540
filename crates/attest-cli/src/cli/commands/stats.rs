use super::{exit_codes, App};
use crate::cli::args::StatsArgs;
use attest_core::report::console;
use attest_core::stats::dashboard;

pub async fn run(args: StatsArgs, app: &App) -> anyhow::Result<i32> {
    let d = dashboard(&app.store, &app.cfg.risk_banding, args.recent)?;
    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&d)?);
    } else {
        console::print_dashboard(&d);
    }
    Ok(exit_codes::OK)
}

use super::{exit_codes, App};
use crate::cli::args::{ControlsArgs, ControlsSub};
use attest_core::model::{Category, ControlStatus};
use attest_core::report::console;

pub async fn run(args: ControlsArgs, app: &App) -> anyhow::Result<i32> {
    match args.cmd {
        ControlsSub::List { category, format } => {
            let category = category
                .as_deref()
                .map(str::parse::<Category>)
                .transpose()?;
            let controls = app.store.list_controls(category)?;
            if format.is_json() {
                println!("{}", serde_json::to_string_pretty(&controls)?);
            } else {
                print!("{}", console::render_controls(&controls));
            }
            Ok(exit_codes::OK)
        }
        ControlsSub::Show { control_id, format } => {
            let control = app.store.get_control(&control_id)?;
            if format.is_json() {
                println!("{}", serde_json::to_string_pretty(&control)?);
            } else {
                print!("{}", console::render_control(&control));
            }
            Ok(exit_codes::OK)
        }
        ControlsSub::Update {
            control_id,
            status,
            notes,
        } => {
            let status: ControlStatus = status.parse()?;
            let assessor = app.require_identity()?;
            let control =
                app.store
                    .update_control_assessment(&control_id, status, &notes, &assessor)?;
            eprintln!(
                "✅ {} is now {} (assessed by {})",
                control.control_id, control.status, assessor
            );
            Ok(exit_codes::OK)
        }
        ControlsSub::Categories => {
            for cat in app.store.list_categories()? {
                println!("{}", cat);
            }
            Ok(exit_codes::OK)
        }
    }
}

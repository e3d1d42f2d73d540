use super::{exit_codes, App};
use crate::cli::args::FormatArgs;
use attest_core::report::console;

pub async fn run(args: FormatArgs, app: &App) -> anyhow::Result<i32> {
    let users = app.store.list_users()?;
    if args.is_json() {
        println!("{}", serde_json::to_string_pretty(&users)?);
    } else {
        print!("{}", console::render_users(&users));
    }
    Ok(exit_codes::OK)
}

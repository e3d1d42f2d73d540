use super::{exit_codes, App};
use crate::cli::args::{RiskArgs, RiskSub};
use attest_core::model::{NewRisk, RiskStatus, RiskUpdate};
use attest_core::report::console;

pub async fn run(args: RiskArgs, app: &App) -> anyhow::Result<i32> {
    let banding = &app.cfg.risk_banding;
    match args.cmd {
        RiskSub::Add {
            title,
            description,
            likelihood,
            impact,
            mitigation,
            owner,
        } => {
            let creator = app.require_identity()?;
            let risk = app.store.add_risk(
                &NewRisk {
                    title,
                    description,
                    likelihood,
                    impact,
                    mitigation,
                    owner,
                },
                &creator,
            )?;
            eprintln!(
                "✅ risk #{} added: score {} ({})",
                risk.id,
                risk.score(),
                banding.severity_of(&risk)
            );
            println!("{}", risk.id);
            Ok(exit_codes::OK)
        }
        RiskSub::Update {
            id,
            title,
            description,
            likelihood,
            impact,
            mitigation,
            owner,
            status,
        } => {
            let actor = app.require_identity()?;
            let current = app.store.get_risk(id)?;
            let status = match status {
                Some(s) => s.parse::<RiskStatus>()?,
                None => current.status,
            };
            let update = RiskUpdate {
                title: title.unwrap_or(current.title),
                description: description.unwrap_or(current.description),
                likelihood: likelihood.unwrap_or(i64::from(current.likelihood.get())),
                impact: impact.unwrap_or(i64::from(current.impact.get())),
                mitigation: mitigation.unwrap_or(current.mitigation),
                owner: owner.unwrap_or(current.owner),
                status,
            };
            let risk = app.store.update_risk(id, &update, &actor)?;
            eprintln!(
                "✅ risk #{} updated: score {} ({}), {}",
                risk.id,
                risk.score(),
                banding.severity_of(&risk),
                risk.status
            );
            Ok(exit_codes::OK)
        }
        RiskSub::List { format } => {
            let risks = app.store.list_risks()?;
            if format.is_json() {
                println!("{}", serde_json::to_string_pretty(&risks)?);
            } else {
                print!("{}", console::render_risks(&risks, banding));
            }
            Ok(exit_codes::OK)
        }
        RiskSub::Show { id, format } => {
            let risk = app.store.get_risk(id)?;
            if format.is_json() {
                let mut v = serde_json::to_value(&risk)?;
                v["severity"] = serde_json::json!(banding.severity_of(&risk).as_str());
                println!("{}", serde_json::to_string_pretty(&v)?);
            } else {
                print!("{}", console::render_risk(&risk, banding));
            }
            Ok(exit_codes::OK)
        }
        RiskSub::Rm { id } => {
            app.require_identity()?;
            app.store.delete_risk(id)?;
            eprintln!("🗑️  risk #{} removed", id);
            Ok(exit_codes::OK)
        }
    }
}

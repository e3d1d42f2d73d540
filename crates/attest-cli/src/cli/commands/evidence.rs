use super::{exit_codes, App};
use crate::cli::args::{EvidenceArgs, EvidenceSub};
use anyhow::Context;
use attest_core::errors::AttestError;
use attest_core::report::{console, human_size};
use std::io::Write;

pub async fn run(args: EvidenceArgs, app: &App) -> anyhow::Result<i32> {
    let index = app.evidence()?;
    match args.cmd {
        EvidenceSub::Attach {
            control_id,
            file,
            name,
        } => {
            let uploader = app.require_identity()?;
            let original = match name {
                Some(n) => n,
                None => file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| AttestError::invalid("no file selected"))?,
            };
            let meta = tokio::fs::metadata(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            if meta.len() > app.cfg.max_upload_bytes {
                return Err(AttestError::invalid(format!(
                    "{} is {}, limit is {}",
                    file.display(),
                    human_size(meta.len()),
                    human_size(app.cfg.max_upload_bytes)
                ))
                .into());
            }
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;

            let ev = index.attach(&control_id, &original, &bytes, &uploader)?;
            eprintln!(
                "✅ evidence #{} attached to {} ({}, sha256 {})",
                ev.id,
                ev.control_id,
                human_size(ev.file_size),
                &ev.sha256[..12]
            );
            println!("{}", ev.id);
            Ok(exit_codes::OK)
        }
        EvidenceSub::List { format } => {
            let items = index.list()?;
            if format.is_json() {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                print!("{}", console::render_evidence(&items));
            }
            Ok(exit_codes::OK)
        }
        EvidenceSub::Get { id, out } => {
            let mut content = index.fetch_content(id)?;
            match out {
                Some(path) => {
                    let mut f = std::fs::File::create(&path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                    std::io::copy(&mut content.reader, &mut f)?;
                    eprintln!("wrote {} to {}", content.original_filename(), path.display());
                }
                None => {
                    let stdout = std::io::stdout();
                    let mut lock = stdout.lock();
                    std::io::copy(&mut content.reader, &mut lock)?;
                    lock.flush()?;
                }
            }
            Ok(exit_codes::OK)
        }
        EvidenceSub::Rm { id } => {
            let actor = app.require_identity()?;
            index.remove(id, &actor)?;
            eprintln!("🗑️  evidence #{} removed", id);
            Ok(exit_codes::OK)
        }
        EvidenceSub::Sweep { format } => {
            let report = index.sweep_orphans()?;
            if format.is_json() {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for key in &report.removed_blobs {
                    println!("removed unreferenced file {}", key);
                }
                for name in &report.removed_uploads {
                    println!("removed interrupted upload {}", name);
                }
                for id in &report.missing_content {
                    println!("⚠️  evidence #{} has no stored file", id);
                }
                eprintln!(
                    "Summary: {} files removed, {} uploads removed, {} records missing content",
                    report.removed_blobs.len(),
                    report.removed_uploads.len(),
                    report.missing_content.len()
                );
            }
            Ok(exit_codes::OK)
        }
    }
}

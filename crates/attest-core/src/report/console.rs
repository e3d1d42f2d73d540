use super::human_size;
use crate::model::{Control, ControlStatus, EvidenceListing, Risk, User};
use crate::risk::{RiskBanding, Severity};
use crate::stats::Dashboard;
use std::fmt::Write;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

fn status_icon(status: ControlStatus) -> &'static str {
    match status {
        ControlStatus::Compliant => "✅",
        ControlStatus::NotCompliant => "❌",
        ControlStatus::NotApplicable => "➖",
        ControlStatus::NotAssessed => "⏳",
    }
}

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "🔴",
        Severity::Medium => "🟠",
        Severity::Low => "🟢",
    }
}

pub fn render_dashboard(d: &Dashboard) -> String {
    let c = &d.compliance;
    let r = &d.risks;
    let mut out = String::new();

    let _ = writeln!(out, "ISO 27001:2022 compliance overview");
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(
        out,
        "Compliance: {:.1}% ({} of {} assessed controls compliant)",
        c.compliance_percentage,
        c.compliant,
        c.assessed()
    );
    let _ = writeln!(
        out,
        "Controls:   {} total, {} compliant, {} not compliant, {} not applicable, {} not assessed",
        c.total, c.compliant, c.non_compliant, c.not_applicable, c.not_assessed
    );
    let _ = writeln!(
        out,
        "Risks:      {} total, {} high, {} medium, {} low",
        r.total, r.high, r.medium, r.low
    );
    let _ = writeln!(out, "Evidence:   {} files", d.evidence_count);

    if !d.recent_assessments.is_empty() {
        let _ = writeln!(out, "\nRecent assessments:");
        for ctl in &d.recent_assessments {
            let when = ctl
                .assessed_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "{} {:<8} {:<16} {} {}",
                status_icon(ctl.status),
                ctl.control_id,
                ctl.status,
                when,
                ctl.assessed_by.as_deref().unwrap_or("")
            );
        }
    }
    out
}

pub fn print_dashboard(d: &Dashboard) {
    print!("{}", render_dashboard(d));
}

pub fn render_controls(controls: &[Control]) -> String {
    let mut out = String::new();
    let mut section = "";
    for ctl in controls {
        if ctl.category.as_str() != section {
            section = ctl.category.as_str();
            let _ = writeln!(out, "\n{}", section);
        }
        let _ = writeln!(
            out,
            "{} {:<8} {:<16} {}",
            status_icon(ctl.status),
            ctl.control_id,
            ctl.status,
            ctl.title
        );
    }
    out
}

pub fn render_control(ctl: &Control) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", ctl.control_id, ctl.title);
    let _ = writeln!(out, "Category:    {}", ctl.category);
    let _ = writeln!(out, "Status:      {} {}", status_icon(ctl.status), ctl.status);
    let _ = writeln!(out, "Description: {}", ctl.description);
    if let Some(notes) = ctl.notes.as_deref().filter(|n| !n.is_empty()) {
        let _ = writeln!(out, "Notes:       {}", notes);
    }
    if let (Some(by), Some(at)) = (&ctl.assessed_by, ctl.assessed_at) {
        let _ = writeln!(
            out,
            "Assessed:    {} by {}",
            at.format("%Y-%m-%d %H:%M:%S"),
            by
        );
    }
    out
}

pub fn render_risks(risks: &[Risk], banding: &RiskBanding) -> String {
    let mut out = String::new();
    if risks.is_empty() {
        let _ = writeln!(out, "No risks registered.");
        return out;
    }
    for r in risks {
        let severity = banding.severity_of(r);
        let _ = writeln!(
            out,
            "{} #{:<4} {:>2} {:<6} {:<10} {}",
            severity_icon(severity),
            r.id,
            r.score(),
            severity,
            r.status,
            r.title
        );
        if !r.owner.is_empty() {
            let _ = writeln!(out, "      Owner: {}", r.owner);
        }
    }
    out
}

pub fn render_risk(r: &Risk, banding: &RiskBanding) -> String {
    let mut out = String::new();
    let severity = banding.severity_of(r);
    let _ = writeln!(out, "#{} {}", r.id, r.title);
    let _ = writeln!(
        out,
        "Score:       {} {} (likelihood {} x impact {})",
        severity_icon(severity),
        r.score(),
        r.likelihood.get(),
        r.impact.get()
    );
    let _ = writeln!(out, "Severity:    {}", severity);
    let _ = writeln!(out, "Status:      {}", r.status);
    let _ = writeln!(out, "Owner:       {}", r.owner);
    let _ = writeln!(out, "Description: {}", r.description);
    let _ = writeln!(out, "Mitigation:  {}", r.mitigation);
    let _ = writeln!(
        out,
        "Created:     {} by {}",
        r.created_at.format("%Y-%m-%d %H:%M:%S"),
        r.created_by
    );
    out
}

pub fn render_evidence(items: &[EvidenceListing]) -> String {
    let mut out = String::new();
    if items.is_empty() {
        let _ = writeln!(out, "No evidence uploaded.");
        return out;
    }
    for item in items {
        let e = &item.evidence;
        let _ = writeln!(
            out,
            "#{:<4} {:<8} {:<32} {:>10}  {} {}",
            e.id,
            e.control_id,
            e.original_filename,
            human_size(e.file_size),
            e.uploaded_at.format("%Y-%m-%d %H:%M"),
            e.uploaded_by
        );
    }
    out
}

pub fn render_users(users: &[User]) -> String {
    let mut out = String::new();
    for u in users {
        let _ = writeln!(
            out,
            "{:<20} {:<32} {}",
            u.username,
            u.email.as_deref().unwrap_or("-"),
            u.created_at.format("%Y-%m-%d")
        );
    }
    out
}

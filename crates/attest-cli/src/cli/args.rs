use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "attest",
    version,
    about = "ISO 27001:2022 Annex A compliance tracker: control assessments, evidence and risks"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Args, Clone, Debug)]
pub struct GlobalArgs {
    /// Config file (defaults to ./attest.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database path, overrides config and ATTEST_DB
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Evidence directory, overrides config and ATTEST_EVIDENCE_DIR
    #[arg(long, global = true)]
    pub evidence_dir: Option<PathBuf>,

    /// Acting user recorded on assessments, uploads, risks and exports
    #[arg(long, global = true, env = "ATTEST_USER")]
    pub user: Option<String>,

    /// Fail on unknown config keys instead of warning
    #[arg(long, global = true)]
    pub strict: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a sample config, create the database and seed the control catalog
    Init(InitArgs),
    Controls(ControlsArgs),
    Evidence(EvidenceArgs),
    Risk(RiskArgs),
    /// Compliance and risk overview
    Stats(StatsArgs),
    /// Audit report as JSON or CSV
    Export(ExportArgs),
    /// Users that have acted on this database
    Users(FormatArgs),
    Version,
}

#[derive(Args, Clone, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Clone, Debug)]
pub struct FormatArgs {
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

impl FormatArgs {
    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}

#[derive(Args, Clone)]
pub struct ControlsArgs {
    #[command(subcommand)]
    pub cmd: ControlsSub,
}

#[derive(Subcommand, Clone)]
pub enum ControlsSub {
    /// List controls, optionally limited to one category
    List {
        /// organizational | people | physical | technological, or a section like A.5
        #[arg(long)]
        category: Option<String>,
        #[command(flatten)]
        format: FormatArgs,
    },
    Show {
        control_id: String,
        #[command(flatten)]
        format: FormatArgs,
    },
    /// Record an assessment, replacing the previous one
    Update {
        control_id: String,
        /// compliant | not-compliant | not-applicable | not-assessed
        #[arg(long)]
        status: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    Categories,
}

#[derive(Args, Clone)]
pub struct EvidenceArgs {
    #[command(subcommand)]
    pub cmd: EvidenceSub,
}

#[derive(Subcommand, Clone)]
pub enum EvidenceSub {
    /// Upload a file as evidence for a control
    Attach {
        control_id: String,
        file: PathBuf,
        /// Name to record instead of the file's own name
        #[arg(long)]
        name: Option<String>,
    },
    List {
        #[command(flatten)]
        format: FormatArgs,
    },
    /// Write stored content to a file, or stdout without --out
    Get {
        id: i64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Rm {
        id: i64,
    },
    /// Delete unreferenced files and report records whose file is missing
    Sweep {
        #[command(flatten)]
        format: FormatArgs,
    },
}

#[derive(Args, Clone)]
pub struct RiskArgs {
    #[command(subcommand)]
    pub cmd: RiskSub,
}

#[derive(Subcommand, Clone)]
pub enum RiskSub {
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// 1 (rare) to 5 (almost certain)
        #[arg(long, allow_negative_numbers = true)]
        likelihood: i64,
        /// 1 (negligible) to 5 (severe)
        #[arg(long, allow_negative_numbers = true)]
        impact: i64,
        #[arg(long, default_value = "")]
        mitigation: String,
        #[arg(long, default_value = "")]
        owner: String,
    },
    /// Change some fields of a risk; the rest keep their current values
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        likelihood: Option<i64>,
        #[arg(long, allow_negative_numbers = true)]
        impact: Option<i64>,
        #[arg(long)]
        mitigation: Option<String>,
        #[arg(long)]
        owner: Option<String>,
        /// open | mitigated | accepted | closed
        #[arg(long)]
        status: Option<String>,
    },
    List {
        #[command(flatten)]
        format: FormatArgs,
    },
    Show {
        id: i64,
        #[command(flatten)]
        format: FormatArgs,
    },
    Rm {
        id: i64,
    },
}

#[derive(Args, Clone, Debug)]
pub struct StatsArgs {
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Number of recent assessments to include
    #[arg(long, default_value_t = 5)]
    pub recent: u32,
}

#[derive(Args, Clone, Debug)]
pub struct ExportArgs {
    #[arg(long, default_value = "json", value_parser = ["json", "csv"])]
    pub format: String,

    /// Output path (defaults to iso27001_audit_report_<timestamp>.<format>)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

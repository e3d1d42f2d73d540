use super::args::{Cli, Command, GlobalArgs};
use attest_core::blob::FsBlobStore;
use attest_core::config::{load_config, load_or_default, AttestConfig, DEFAULT_CONFIG_FILE};
use attest_core::evidence::EvidenceIndex;
use attest_core::model::Identity;
use attest_core::storage::Store;
use attest_core::{AttestError, ConfigError};
use std::path::Path;
use std::sync::Arc;

pub mod controls;
pub mod evidence;
pub mod export;
pub mod init;
pub mod risk;
pub mod stats;
pub mod users;

pub mod exit_codes {
    pub const OK: i32 = 0;
    /// Unknown record or rejected input.
    pub const FAILED: i32 = 1;
    /// Bad config, unusable storage, anything unexpected.
    pub const CONFIG_ERROR: i32 = 2;
}

/// Opened database plus the settings every command needs.
pub struct App {
    pub cfg: AttestConfig,
    pub store: Store,
    user: Option<String>,
}

impl App {
    pub fn open(cfg: AttestConfig, global: &GlobalArgs) -> anyhow::Result<Self> {
        let store = Store::open(&cfg.database)?;
        store.init_schema()?;
        store.seed_controls()?;
        Ok(Self {
            cfg,
            store,
            user: global.user.clone(),
        })
    }

    pub fn evidence(&self) -> anyhow::Result<EvidenceIndex> {
        let blobs = FsBlobStore::new(&self.cfg.evidence_dir)?;
        Ok(EvidenceIndex::new(self.store.clone(), Arc::new(blobs))
            .with_max_upload_bytes(self.cfg.max_upload_bytes))
    }

    /// Acting user for commands that record who did something. Also makes
    /// sure the user is listed.
    pub fn require_identity(&self) -> anyhow::Result<Identity> {
        let raw = self.user.as_deref().unwrap_or_default();
        let identity = Identity::new(raw).map_err(|_| {
            AttestError::invalid("no acting user: pass --user or set ATTEST_USER")
        })?;
        self.store.register_user(&identity, None)?;
        Ok(identity)
    }
}

pub fn resolve_config(global: &GlobalArgs) -> Result<AttestConfig, ConfigError> {
    let mut cfg = match &global.config {
        Some(path) => {
            let mut cfg = load_config(path, global.strict)?;
            cfg.apply_env();
            cfg
        }
        None => load_or_default(Path::new(DEFAULT_CONFIG_FILE), global.strict)?,
    };
    if let Some(db) = &global.db {
        cfg.database = db.clone();
    }
    if let Some(dir) = &global.evidence_dir {
        cfg.evidence_dir = dir.clone();
    }
    Ok(cfg)
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    if let Command::Version = cli.cmd {
        println!("attest {}", env!("CARGO_PKG_VERSION"));
        return Ok(exit_codes::OK);
    }

    if let Command::Init(args) = &cli.cmd {
        if let Err(e) = init::write_config(args, &cli.global) {
            eprintln!("config error: {:#}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    }

    let cfg = match resolve_config(&cli.global) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("config error: {}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    crate::init_logging(&cfg.log_level, cli.global.log_json);

    let result = match App::open(cfg, &cli.global) {
        Ok(app) => run_command(cli.cmd, &app).await,
        Err(e) => Err(e),
    };

    Ok(match result {
        Ok(code) => code,
        Err(e) => report_error(&e),
    })
}

async fn run_command(cmd: Command, app: &App) -> anyhow::Result<i32> {
    match cmd {
        Command::Controls(args) => controls::run(args, app).await,
        Command::Evidence(args) => evidence::run(args, app).await,
        Command::Risk(args) => risk::run(args, app).await,
        Command::Stats(args) => stats::run(args, app).await,
        Command::Export(args) => export::run(args, app).await,
        Command::Users(args) => users::run(args, app).await,
        Command::Init(_) => init::run(app).await,
        Command::Version => Ok(exit_codes::OK),
    }
}

/// Prints the error and picks the exit code for it.
fn report_error(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<AttestError>() {
        Some(err) if err.is_not_found() || err.is_invalid_input() => {
            eprintln!("error: {}", err);
            exit_codes::FAILED
        }
        Some(err) => {
            tracing::error!(event = "attest.cli.storage_failure", error = %err);
            eprintln!("error: {}", err);
            exit_codes::CONFIG_ERROR
        }
        None if e.downcast_ref::<ConfigError>().is_some() => {
            eprintln!("config error: {}", e);
            exit_codes::CONFIG_ERROR
        }
        None => {
            eprintln!("fatal: {:#}", e);
            exit_codes::CONFIG_ERROR
        }
    }
}

use crate::errors::ConfigError;
use crate::evidence::DEFAULT_MAX_UPLOAD_BYTES;
use crate::risk::RiskBanding;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;
pub const DEFAULT_CONFIG_FILE: &str = "attest.yaml";

pub const ENV_DB: &str = "ATTEST_DB";
pub const ENV_EVIDENCE_DIR: &str = "ATTEST_EVIDENCE_DIR";
pub const ENV_LOG: &str = "ATTEST_LOG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttestConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default = "default_evidence_dir")]
    pub evidence_dir: PathBuf,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    #[serde(default)]
    pub risk_banding: RiskBanding,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_version() -> u32 {
    SUPPORTED_CONFIG_VERSION
}
fn default_database() -> PathBuf {
    PathBuf::from(".attest/attest.db")
}
fn default_evidence_dir() -> PathBuf {
    PathBuf::from(".attest/evidence")
}
fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for AttestConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            database: default_database(),
            evidence_dir: default_evidence_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            risk_banding: RiskBanding::DEFAULT,
            log_level: default_log_level(),
        }
    }
}

impl AttestConfig {
    /// Applies `ATTEST_DB`, `ATTEST_EVIDENCE_DIR` and `ATTEST_LOG` on top of
    /// whatever the file said.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = set(ENV_DB) {
            self.database = PathBuf::from(v);
        }
        if let Some(v) = set(ENV_EVIDENCE_DIR) {
            self.evidence_dir = PathBuf::from(v);
        }
        if let Some(v) = set(ENV_LOG) {
            self.log_level = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != SUPPORTED_CONFIG_VERSION {
            return Err(ConfigError(format!(
                "unsupported config version {} (supported: {})",
                self.version, SUPPORTED_CONFIG_VERSION
            )));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError("max_upload_bytes must be greater than 0".into()));
        }
        self.risk_banding.validate()
    }
}

/// Reads a YAML config. Unknown keys fail in strict mode and are logged
/// otherwise. Relative paths are resolved against the config file's directory.
pub fn load_config(path: &Path, strict: bool) -> Result<AttestConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;

    let mut ignored_keys = BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(&raw);
    let mut cfg: AttestConfig = serde_ignored::deserialize(deserializer, |p| {
        ignored_keys.insert(p.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    let unknown: Vec<_> = ignored_keys
        .iter()
        .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "Unknown fields detected in strict mode: {:?} (file: {})",
                unknown,
                path.display()
            )));
        }
        tracing::warn!(
            event = "attest.config.unknown_fields",
            fields = ?unknown,
            file = %path.display(),
            "ignoring unknown config fields"
        );
    }

    cfg.validate()?;

    let base = path.parent().unwrap_or(Path::new("."));
    cfg.database = resolve_relative(base, &cfg.database);
    cfg.evidence_dir = resolve_relative(base, &cfg.evidence_dir);
    Ok(cfg)
}

/// Loads `path` if it exists, defaults otherwise; env overrides on top.
pub fn load_or_default(path: &Path, strict: bool) -> Result<AttestConfig, ConfigError> {
    let mut cfg = if path.exists() {
        load_config(path, strict)?
    } else {
        AttestConfig::default()
    };
    cfg.apply_env();
    Ok(cfg)
}

fn resolve_relative(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() || base.as_os_str().is_empty() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

pub const SAMPLE_CONFIG: &str = r#"version: 1
# SQLite database holding controls, evidence index, risks and users.
database: .attest/attest.db
# Directory evidence files are stored in.
evidence_dir: .attest/evidence
max_upload_bytes: 16777216
# score >= high_min is High, score >= medium_min is Medium, otherwise Low.
risk_banding:
  high_min: 15
  medium_min: 8
log_level: info
"#;

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError(format!("failed to create {}: {}", parent.display(), e)))?;
    }
    std::fs::write(path, SAMPLE_CONFIG)
        .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_parses_to_defaults() {
        let cfg: AttestConfig = serde_yaml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(cfg, AttestConfig::default());
    }

    #[test]
    fn overrides_ignore_blank_values() {
        let mut cfg = AttestConfig::default();
        cfg.apply_overrides(|k| match k {
            ENV_DB => Some("/tmp/x.db".into()),
            ENV_LOG => Some("  ".into()),
            _ => None,
        });
        assert_eq!(cfg.database, PathBuf::from("/tmp/x.db"));
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.evidence_dir, default_evidence_dir());
    }
}

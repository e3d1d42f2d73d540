use crate::errors::ConfigError;
use crate::model::{Rating, Risk};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score thresholds separating the severity bands.
///
/// `score >= high_min` is High, `medium_min <= score < high_min` is Medium,
/// anything lower is Low. Severity is derived on demand, never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskBanding {
    pub high_min: u8,
    pub medium_min: u8,
}

impl RiskBanding {
    pub const DEFAULT: RiskBanding = RiskBanding {
        high_min: 15,
        medium_min: 8,
    };

    pub const MAX_SCORE: u8 = Rating::MAX * Rating::MAX;

    pub fn classify(&self, score: u8) -> Severity {
        if score >= self.high_min {
            Severity::High
        } else if score >= self.medium_min {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn severity_of(&self, risk: &Risk) -> Severity {
        self.classify(risk.score())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.medium_min < 1 || self.medium_min >= self.high_min || self.high_min > Self::MAX_SCORE {
            return Err(ConfigError(format!(
                "risk_banding must satisfy 1 <= medium_min < high_min <= {} (got medium_min={}, high_min={})",
                Self::MAX_SCORE,
                self.medium_min,
                self.high_min
            )));
        }
        Ok(())
    }
}

impl Default for RiskBanding {
    fn default() -> Self {
        Self::DEFAULT
    }
}

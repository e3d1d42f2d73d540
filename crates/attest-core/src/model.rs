use crate::errors::{AttestError, Result};
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Assessment outcome recorded against a control.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ControlStatus {
    #[default]
    #[serde(rename = "Not Assessed")]
    NotAssessed,
    #[serde(rename = "Compliant")]
    Compliant,
    #[serde(rename = "Not Compliant")]
    NotCompliant,
    #[serde(rename = "Not Applicable")]
    NotApplicable,
}

impl ControlStatus {
    pub const ALL: [ControlStatus; 4] = [
        ControlStatus::NotAssessed,
        ControlStatus::Compliant,
        ControlStatus::NotCompliant,
        ControlStatus::NotApplicable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlStatus::NotAssessed => "Not Assessed",
            ControlStatus::Compliant => "Compliant",
            ControlStatus::NotCompliant => "Not Compliant",
            ControlStatus::NotApplicable => "Not Applicable",
        }
    }

    /// Parses the stored column value.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

impl fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlStatus {
    type Err = AttestError;

    /// Lenient form used for user input: "not-compliant", "Not Compliant" and
    /// "not_compliant" are the same status.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = fold(s);
        Self::ALL
            .into_iter()
            .find(|v| fold(v.as_str()) == wanted)
            .ok_or_else(|| {
                AttestError::invalid(format!(
                    "unknown control status '{}' (expected one of: not-assessed, compliant, not-compliant, not-applicable)",
                    s
                ))
            })
    }
}

/// Annex A theme a control belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    #[serde(rename = "A.5 Organizational")]
    Organizational,
    #[serde(rename = "A.6 People")]
    People,
    #[serde(rename = "A.7 Physical")]
    Physical,
    #[serde(rename = "A.8 Technological")]
    Technological,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Organizational,
        Category::People,
        Category::Physical,
        Category::Technological,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Organizational => "A.5 Organizational",
            Category::People => "A.6 People",
            Category::Physical => "A.7 Physical",
            Category::Technological => "A.8 Technological",
        }
    }

    pub fn section(&self) -> &'static str {
        match self {
            Category::Organizational => "A.5",
            Category::People => "A.6",
            Category::Physical => "A.7",
            Category::Technological => "A.8",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Category::Organizational => "Organizational",
            Category::People => "People",
            Category::Physical => "Physical",
            Category::Technological => "Technological",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AttestError;

    /// Accepts the full label ("A.6 People"), the section ("A.6") or the
    /// bare name ("people").
    fn from_str(s: &str) -> Result<Self> {
        let wanted = fold(s);
        Self::ALL
            .into_iter()
            .find(|c| {
                fold(c.as_str()) == wanted || fold(c.section()) == wanted || fold(c.name()) == wanted
            })
            .ok_or_else(|| AttestError::invalid(format!("unknown control category '{}'", s)))
    }
}

fn fold(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Control {
    pub control_id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: ControlStatus,
    pub notes: Option<String>,
    pub assessed_by: Option<String>,
    pub assessed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Acting user, as handed over by whatever sits in front of the core.
///
/// The core never authenticates; it only refuses to record a blank identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(AttestError::invalid("identity must not be empty"));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Evidence {
    pub id: i64,
    pub control_id: String,
    /// Blob key the content is stored under.
    pub filename: String,
    pub original_filename: String,
    pub file_path: String,
    pub file_size: u64,
    pub sha256: String,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvidenceListing {
    #[serde(flatten)]
    pub evidence: Evidence,
    pub control_title: Option<String>,
}

/// Likelihood or impact rating on the 1..=5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64, field: &str) -> Result<Self> {
        if value < Self::MIN as i64 || value > Self::MAX as i64 {
            return Err(AttestError::invalid(format!(
                "{} must be between {} and {} (got {})",
                field,
                Self::MIN,
                Self::MAX,
                value
            )));
        }
        Ok(Self(value as u8))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum RiskStatus {
    #[default]
    Open,
    Mitigated,
    Accepted,
    Closed,
}

impl RiskStatus {
    pub const ALL: [RiskStatus; 4] = [
        RiskStatus::Open,
        RiskStatus::Mitigated,
        RiskStatus::Accepted,
        RiskStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskStatus::Open => "Open",
            RiskStatus::Mitigated => "Mitigated",
            RiskStatus::Accepted => "Accepted",
            RiskStatus::Closed => "Closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskStatus {
    type Err = AttestError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = fold(s);
        Self::ALL
            .into_iter()
            .find(|v| fold(v.as_str()) == wanted)
            .ok_or_else(|| {
                AttestError::invalid(format!(
                    "unknown risk status '{}' (expected one of: open, mitigated, accepted, closed)",
                    s
                ))
            })
    }
}

/// A risk register entry.
///
/// There is no score field: the score is always `likelihood * impact`.
#[derive(Debug, Clone, PartialEq)]
pub struct Risk {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub likelihood: Rating,
    pub impact: Rating,
    pub mitigation: String,
    pub owner: String,
    pub status: RiskStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Risk {
    pub fn score(&self) -> u8 {
        self.likelihood.get() * self.impact.get()
    }
}

impl Serialize for Risk {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("Risk", 12)?;
        st.serialize_field("id", &self.id)?;
        st.serialize_field("title", &self.title)?;
        st.serialize_field("description", &self.description)?;
        st.serialize_field("likelihood", &self.likelihood)?;
        st.serialize_field("impact", &self.impact)?;
        st.serialize_field("risk_score", &self.score())?;
        st.serialize_field("mitigation", &self.mitigation)?;
        st.serialize_field("owner", &self.owner)?;
        st.serialize_field("status", &self.status)?;
        st.serialize_field("created_by", &self.created_by)?;
        st.serialize_field("created_at", &self.created_at)?;
        st.serialize_field("updated_at", &self.updated_at)?;
        st.end()
    }
}

/// Raw input for a new risk; ratings are validated when it is stored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRisk {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub likelihood: i64,
    pub impact: i64,
    #[serde(default)]
    pub mitigation: String,
    #[serde(default)]
    pub owner: String,
}

/// Full replacement of a risk's editable fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskUpdate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub likelihood: i64,
    pub impact: i64,
    #[serde(default)]
    pub mitigation: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub status: RiskStatus,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_is_lenient_for_input_but_exact_for_storage() {
        assert_eq!(
            "not-compliant".parse::<ControlStatus>().unwrap(),
            ControlStatus::NotCompliant
        );
        assert_eq!(
            "Not Applicable".parse::<ControlStatus>().unwrap(),
            ControlStatus::NotApplicable
        );
        assert_eq!(ControlStatus::parse("Not Compliant"), Some(ControlStatus::NotCompliant));
        assert_eq!(ControlStatus::parse("not-compliant"), None);
        assert!("partially".parse::<ControlStatus>().is_err());
    }

    #[test]
    fn category_accepts_label_section_and_name() {
        assert_eq!("A.6 People".parse::<Category>().unwrap(), Category::People);
        assert_eq!("A.7".parse::<Category>().unwrap(), Category::Physical);
        assert_eq!(
            "technological".parse::<Category>().unwrap(),
            Category::Technological
        );
        assert!("A.9".parse::<Category>().is_err());
    }

    #[test]
    fn rating_bounds() {
        assert!(Rating::new(0, "likelihood").unwrap_err().is_invalid_input());
        assert!(Rating::new(6, "impact").is_err());
        assert_eq!(Rating::new(5, "impact").unwrap().get(), 5);
    }

    #[test]
    fn identity_rejects_blank() {
        assert!(Identity::new("   ").is_err());
        assert_eq!(Identity::new(" auditor ").unwrap().as_str(), "auditor");
    }

    #[test]
    fn risk_serializes_derived_score() {
        let now = Utc::now();
        let risk = Risk {
            id: 1,
            title: "Ransomware".into(),
            description: String::new(),
            likelihood: Rating::new(4, "likelihood").unwrap(),
            impact: Rating::new(5, "impact").unwrap(),
            mitigation: String::new(),
            owner: String::new(),
            status: RiskStatus::Open,
            created_by: "auditor".into(),
            created_at: now,
            updated_at: now,
        };
        let v = serde_json::to_value(&risk).unwrap();
        assert_eq!(v["risk_score"], 20);
        assert_eq!(v["status"], "Open");
    }
}

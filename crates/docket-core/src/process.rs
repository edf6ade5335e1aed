//! Targets (legal outcomes) and the jurisdiction-specific processes that
//! realize them.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ConfigError;
use crate::document::Document;

/// An abstract legal outcome, independent of jurisdiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    BirthRecord,
    GenderMarker,
    NameChange,
    Passport,
    PrimaryIdentification,
    SocialSecurity,
}

impl Target {
    pub const ALL: [Target; 6] = [
        Target::BirthRecord,
        Target::GenderMarker,
        Target::NameChange,
        Target::Passport,
        Target::PrimaryIdentification,
        Target::SocialSecurity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::BirthRecord => "birth-record",
            Target::GenderMarker => "gender-marker",
            Target::NameChange => "name-change",
            Target::Passport => "passport",
            Target::PrimaryIdentification => "primary-identification",
            Target::SocialSecurity => "social-security",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase().replace('_', "-");
        Target::ALL
            .into_iter()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| ConfigError::UnknownTarget(s.to_string()))
    }
}

/// The realization of a [`Target`] in one jurisdiction.
///
/// `depends` names targets that must be resolved together with this one.
/// A dependency cycle means "file simultaneously", not an ordering error.
/// A process without a jurisdiction is federal and applies everywhere.
#[derive(Debug, Clone)]
pub struct Process {
    pub jurisdiction: Option<String>,
    pub target: Target,
    pub depends: Vec<Target>,
    pub documents: Vec<Arc<Document>>,
}

impl Process {
    pub fn new(jurisdiction: Option<&str>, target: Target) -> Self {
        Self {
            jurisdiction: jurisdiction.map(str::to_string),
            target,
            depends: Vec::new(),
            documents: Vec::new(),
        }
    }

    pub fn depends_on(mut self, targets: impl IntoIterator<Item = Target>) -> Self {
        self.depends.extend(targets);
        self
    }

    pub fn with_documents(mut self, documents: impl IntoIterator<Item = Arc<Document>>) -> Self {
        self.documents.extend(documents);
        self
    }

    /// Jurisdiction code, or `"federal"`.
    pub fn scope(&self) -> &str {
        self.jurisdiction.as_deref().unwrap_or("federal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_round_trips_through_strings() {
        for target in Target::ALL {
            assert_eq!(target.to_string().parse::<Target>().unwrap(), target);
        }
        assert_eq!("Name_Change".parse::<Target>().unwrap(), Target::NameChange);
        assert!("visa".parse::<Target>().is_err());
    }

    #[test]
    fn target_serde_matches_display() {
        let json = serde_json::to_string(&Target::PrimaryIdentification).unwrap();
        assert_eq!(json, "\"primary-identification\"");
    }

    #[test]
    fn federal_scope() {
        assert_eq!(Process::new(None, Target::Passport).scope(), "federal");
        assert_eq!(Process::new(Some("IL"), Target::NameChange).scope(), "IL");
    }
}

//! Static jurisdiction reference data merged into the guide.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ConfigError;

/// Court and filing details for one county (or a jurisdiction default).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourtInfo {
    pub court: String,
    pub address: String,
    pub phone: Option<String>,
    pub filing_fee: Option<String>,
    pub hours: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JurisdictionInfo {
    pub name: String,
    /// Used for counties without their own entry.
    pub default: Option<CourtInfo>,
    pub counties: BTreeMap<String, CourtInfo>,
}

/// Reference tables keyed by jurisdiction code, then county.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceData {
    jurisdictions: BTreeMap<String, JurisdictionInfo>,
}

impl ReferenceData {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let data: ReferenceData = serde_json::from_str(json)?;
        info!(jurisdictions = data.jurisdictions.len(), "loaded reference data");
        Ok(data)
    }

    pub fn jurisdiction(&self, code: &str) -> Option<&JurisdictionInfo> {
        self.jurisdictions.get(code)
    }

    /// Court details for `county`, falling back to the jurisdiction default.
    /// County names match case-insensitively.
    pub fn court(&self, jurisdiction: &str, county: Option<&str>) -> Option<&CourtInfo> {
        let info = self.jurisdictions.get(jurisdiction)?;
        county
            .and_then(|c| {
                info.counties
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(c.trim()))
                    .map(|(_, court)| court)
            })
            .or(info.default.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = r#"{
        "IL": {
            "name": "Illinois",
            "default": { "court": "Circuit Court", "address": "See county clerk" },
            "counties": {
                "Sangamon": {
                    "court": "Seventh Judicial Circuit",
                    "address": "200 S 9th St, Springfield",
                    "filingFee": "$324"
                }
            }
        }
    }"#;

    #[test]
    fn county_lookup_with_default() {
        let data = ReferenceData::from_json(DATA).unwrap();
        let court = data.court("IL", Some("sangamon")).unwrap();
        assert_eq!(court.court, "Seventh Judicial Circuit");
        assert_eq!(court.filing_fee.as_deref(), Some("$324"));

        assert_eq!(data.court("IL", Some("Cook")).unwrap().court, "Circuit Court");
        assert_eq!(data.court("IL", None).unwrap().court, "Circuit Court");
        assert!(data.court("WI", Some("Dane")).is_none());
        assert_eq!(data.jurisdiction("IL").unwrap().name, "Illinois");
    }
}

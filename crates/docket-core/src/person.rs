//! The applicant record.
//!
//! Every field is optional: different processes need different subsets, and
//! no single journey populates all of them. The core never mutates a
//! [`Person`]; projection works from [`Person::finalized`], a derived copy.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A structured personal name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Name {
    pub first: String,
    pub middle: String,
    pub last: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

impl Name {
    pub fn new(first: &str, middle: &str, last: &str) -> Self {
        Self {
            first: first.to_string(),
            middle: middle.to_string(),
            last: last.to_string(),
            suffix: None,
        }
    }

    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix = Some(suffix.to_string());
        self
    }

    /// A name is empty iff every part is blank.
    pub fn is_empty(&self) -> bool {
        self.parts().next().is_none()
    }

    /// Non-blank parts joined by single spaces, suffix last.
    pub fn full(&self) -> String {
        self.parts().collect::<Vec<_>>().join(" ")
    }

    fn parts(&self) -> impl Iterator<Item = &str> {
        [
            self.first.as_str(),
            self.middle.as_str(),
            self.last.as_str(),
            self.suffix.as_deref().unwrap_or(""),
        ]
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    }
}

/// Sex/gender marker as printed on identity documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Marker {
    F,
    M,
    X,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Place {
    pub city: String,
    pub state: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub street: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// Applicant record collected by the UI.
///
/// Serialized camelCase; rule paths address fields by their serialized
/// names (`legalName.first`, `residence.zip`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Person {
    pub legal_name: Option<Name>,
    pub chosen_name: Option<Name>,
    pub birth_name: Option<Name>,
    pub birthdate: Option<NaiveDate>,
    pub age: Option<u32>,
    pub gender_marker: Option<Marker>,
    pub assigned_sex: Option<Marker>,
    pub birth_place: Option<Place>,
    pub residence: Option<Address>,
    pub mailing: Option<Address>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub jurisdiction: Option<String>,
    pub county: Option<String>,
    pub parents_consent: Option<bool>,
    pub representative_name: Option<Name>,
    pub reason: Option<String>,
    pub has_criminal_record: Option<bool>,
    pub previous_name_change: Option<bool>,
    pub ssn: Option<String>,
    pub passport_number: Option<String>,
}

impl Person {
    /// Derived copy ready for projection: `age` is computed from
    /// `birthdate` as of `today` when absent.
    pub fn finalized(&self, today: NaiveDate) -> Person {
        let mut person = self.clone();
        if person.age.is_none() {
            person.age = person.birthdate.and_then(|b| today.years_since(b));
        }
        person
    }

    /// Whether the applicant is under 18. Unknown age is treated as adult.
    pub fn is_minor(&self) -> bool {
        self.age.is_some_and(|age| age < 18)
    }

    /// JSON view addressed by rule paths. Absent fields serialize as `null`.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// A record with every field populated and every flag set.
    ///
    /// Used as the stand-in value when tracing which fields rules read.
    pub fn sample() -> Person {
        let residence = Address {
            street: "100 Main St".into(),
            unit: Some("2B".into()),
            city: "Springfield".into(),
            state: "IL".into(),
            zip: "62701".into(),
        };
        Person {
            legal_name: Some(Name::new("Alex", "Jordan", "Rivera").with_suffix("Jr")),
            chosen_name: Some(Name::new("Sam", "Jordan", "Rivera")),
            birth_name: Some(Name::new("Alex", "Jordan", "Rivera")),
            birthdate: NaiveDate::from_ymd_opt(1990, 4, 12),
            age: Some(30),
            gender_marker: Some(Marker::X),
            assigned_sex: Some(Marker::M),
            birth_place: Some(Place {
                city: "Chicago".into(),
                state: "IL".into(),
                country: "USA".into(),
            }),
            mailing: Some(residence.clone()),
            residence: Some(residence),
            phone: Some("555-0100".into()),
            email: Some("applicant@example.org".into()),
            jurisdiction: Some("IL".into()),
            county: Some("Sangamon".into()),
            parents_consent: Some(true),
            representative_name: Some(Name::new("Pat", "", "Rivera")),
            reason: Some("To conform with gender identity".into()),
            has_criminal_record: Some(true),
            previous_name_change: Some(true),
            ssn: Some("000-00-0000".into()),
            passport_number: Some("000000000".into()),
        }
    }
}

//! Document templates and their field bindings.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::ConfigError;
use crate::record::Record;
use crate::rule::{Opaque, Rule, Text};

fn default_font_size() -> f32 {
    12.0
}

/// A fixed position on a template page.
///
/// Authored at 100 px/inch against an 8.5×11-inch page, top-left origin,
/// pages indexed from 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
}

impl Location {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            page: 0,
            font_size: default_font_size(),
        }
    }

    pub fn on_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }
}

/// One binding from applicant data to one place in a document.
///
/// What to write (text or check) and where to write it (named field or
/// fixed location) are independent; each constructor fixes exactly one of
/// each. A radio `select` only exists on `CheckField`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawFormfill", into = "RawFormfill")]
pub enum Formfill {
    TextField {
        text: Text,
        field: String,
    },
    TextAt {
        text: Text,
        loc: Location,
    },
    CheckField {
        check: Rule,
        field: String,
        select: Option<String>,
    },
    CheckAt {
        check: Rule,
        loc: Location,
    },
}

impl Formfill {
    pub fn text_field(text: Text, field: &str) -> Self {
        Formfill::TextField {
            text,
            field: field.into(),
        }
    }

    pub fn text_at(text: Text, loc: Location) -> Self {
        Formfill::TextAt { text, loc }
    }

    pub fn check_field(check: Rule, field: &str) -> Self {
        Formfill::CheckField {
            check,
            field: field.into(),
            select: None,
        }
    }

    /// Select `choice` in radio group `field` when `check` holds.
    pub fn select_field(check: Rule, field: &str, choice: &str) -> Self {
        Formfill::CheckField {
            check,
            field: field.into(),
            select: Some(choice.into()),
        }
    }

    pub fn check_at(check: Rule, loc: Location) -> Self {
        Formfill::CheckAt { check, loc }
    }

    /// Declared paths and closures of the value side.
    pub fn collect<'r>(&'r self, paths: &mut IndexSet<String>, opaque: &mut Vec<Opaque<'r>>) {
        match self {
            Formfill::TextField { text, .. } | Formfill::TextAt { text, .. } => {
                text.collect(paths, opaque)
            }
            Formfill::CheckField { check, .. } | Formfill::CheckAt { check, .. } => {
                check.collect(paths, opaque)
            }
        }
    }

    /// Short description of where this fill writes, for diagnostics.
    pub fn target(&self) -> String {
        match self {
            Formfill::TextField { field, .. } | Formfill::CheckField { field, .. } => field.clone(),
            Formfill::TextAt { loc, .. } | Formfill::CheckAt { loc, .. } => {
                format!("page {} @ ({}, {})", loc.page, loc.x, loc.y)
            }
        }
    }
}

/// Wire form of [`Formfill`]: optional fields on both axes, checked on the
/// way in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawFormfill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<Text>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    check: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    loc: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    select: Option<String>,
}

impl TryFrom<RawFormfill> for Formfill {
    type Error = ConfigError;

    fn try_from(raw: RawFormfill) -> Result<Self, Self::Error> {
        let malformed = |msg: &str| ConfigError::MalformedFormfill(msg.to_string());
        match (raw.text, raw.check, raw.field, raw.loc, raw.select) {
            (Some(_), Some(_), ..) => Err(malformed("both `text` and `check` are set")),
            (None, None, ..) => Err(malformed("one of `text` or `check` is required")),
            (_, _, Some(_), Some(_), _) => Err(malformed("both `field` and `loc` are set")),
            (_, _, None, None, _) => Err(malformed("one of `field` or `loc` is required")),
            (_, _, None, Some(_), Some(_)) => Err(malformed("`select` cannot be used with `loc`")),
            (Some(_), None, _, _, Some(_)) => Err(malformed("`select` requires `check`")),
            (Some(text), None, Some(field), None, None) => Ok(Formfill::TextField { text, field }),
            (Some(text), None, None, Some(loc), None) => Ok(Formfill::TextAt { text, loc }),
            (None, Some(check), Some(field), None, select) => Ok(Formfill::CheckField {
                check,
                field,
                select,
            }),
            (None, Some(check), None, Some(loc), None) => Ok(Formfill::CheckAt { check, loc }),
        }
    }
}

impl From<Formfill> for RawFormfill {
    fn from(fill: Formfill) -> Self {
        match fill {
            Formfill::TextField { text, field } => RawFormfill {
                text: Some(text),
                field: Some(field),
                ..Default::default()
            },
            Formfill::TextAt { text, loc } => RawFormfill {
                text: Some(text),
                loc: Some(loc),
                ..Default::default()
            },
            Formfill::CheckField {
                check,
                field,
                select,
            } => RawFormfill {
                check: Some(check),
                field: Some(field),
                select,
                ..Default::default()
            },
            Formfill::CheckAt { check, loc } => RawFormfill {
                check: Some(check),
                loc: Some(loc),
                ..Default::default()
            },
        }
    }
}

/// One physical form or template.
///
/// Identity is the allocation holding it (`Arc<Document>`), never its name:
/// two documents with the same name are distinct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<Vec<Formfill>>,
    /// Narrative guide text shown alongside (or instead of) the form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide: Option<String>,
}

impl Document {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_filename(mut self, filename: &str) -> Self {
        self.filename = Some(filename.to_string());
        self
    }

    pub fn with_include(mut self, include: Rule) -> Self {
        self.include = Some(include);
        self
    }

    pub fn with_map(mut self, map: Vec<Formfill>) -> Self {
        self.map = Some(map);
        self
    }

    pub fn with_guide(mut self, guide: &str) -> Self {
        self.guide = Some(guide.to_string());
        self
    }

    /// `id` when set, otherwise `name`.
    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }

    pub fn fills(&self) -> &[Formfill] {
        self.map.as_deref().unwrap_or_default()
    }

    /// Declared paths and closures of the include rule, then of each fill
    /// in map order.
    pub fn collect<'r>(&'r self, paths: &mut IndexSet<String>, opaque: &mut Vec<Opaque<'r>>) {
        if let Some(include) = &self.include {
            include.collect(paths, opaque);
        }
        for fill in self.fills() {
            fill.collect(paths, opaque);
        }
    }

    /// Whether this document belongs in the packet for `record`.
    ///
    /// Without an `include` rule, a document is included iff it has a map.
    pub fn is_included(&self, record: &Record<'_>) -> bool {
        match &self.include {
            Some(rule) => rule.eval(record),
            None => self.map.is_some(),
        }
    }
}

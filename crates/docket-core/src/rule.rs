//! Rule expressions for inclusion and field-filling.
//!
//! [`Rule`] (boolean) and [`Text`] (string-valued) are small tagged
//! expressions over declared field paths, so the fields they read can be
//! enumerated without running them. `Custom` variants hold arbitrary
//! closures for logic the expression language cannot state; their reads are
//! discovered by tracing instead.

use std::fmt::{self, Write as _};
use std::ops::Not;
use std::sync::Arc;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::Record;

/// An opaque closure over a [`Record`].
pub struct Predicate<T>(Arc<dyn Fn(&Record<'_>) -> T + Send + Sync>);

impl<T> Predicate<T> {
    pub fn new(f: impl Fn(&Record<'_>) -> T + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, record: &Record<'_>) -> T {
        (self.0)(record)
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// A closure whose reads can only be found by running it.
#[derive(Debug, Clone, Copy)]
pub enum Opaque<'r> {
    Check(&'r Predicate<bool>),
    Text(&'r Predicate<Option<String>>),
}

impl Opaque<'_> {
    /// Run the closure for its reads; the result is discarded.
    pub fn run(&self, record: &Record<'_>) {
        match self {
            Opaque::Check(p) => {
                p.call(record);
            }
            Opaque::Text(p) => {
                p.call(record);
            }
        }
    }
}

/// Boolean expression over an applicant record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Rule {
    Always,
    Never,
    /// Truthiness of a field.
    Flag { path: String },
    /// Non-blank value at a field.
    Present { path: String },
    Equals { path: String, value: Value },
    /// Numeric field strictly below `value`. Missing reads as false.
    Below { path: String, value: f64 },
    /// Numeric field at or above `value`. Missing reads as false.
    AtLeast { path: String, value: f64 },
    Not { rule: Box<Rule> },
    All { rules: Vec<Rule> },
    Any { rules: Vec<Rule> },
    #[serde(skip)]
    Custom(Predicate<bool>),
}

impl Rule {
    pub fn flag(path: &str) -> Self {
        Rule::Flag { path: path.into() }
    }

    pub fn present(path: &str) -> Self {
        Rule::Present { path: path.into() }
    }

    pub fn equals(path: &str, value: impl Into<Value>) -> Self {
        Rule::Equals {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn below(path: &str, value: f64) -> Self {
        Rule::Below {
            path: path.into(),
            value,
        }
    }

    pub fn at_least(path: &str, value: f64) -> Self {
        Rule::AtLeast {
            path: path.into(),
            value,
        }
    }

    pub fn all(rules: impl IntoIterator<Item = Rule>) -> Self {
        Rule::All {
            rules: rules.into_iter().collect(),
        }
    }

    pub fn any(rules: impl IntoIterator<Item = Rule>) -> Self {
        Rule::Any {
            rules: rules.into_iter().collect(),
        }
    }

    pub fn custom(f: impl Fn(&Record<'_>) -> bool + Send + Sync + 'static) -> Self {
        Rule::Custom(Predicate::new(f))
    }

    pub fn eval(&self, record: &Record<'_>) -> bool {
        match self {
            Rule::Always => true,
            Rule::Never => false,
            Rule::Flag { path } => record.flag(path),
            Rule::Present { path } => record.is_present(path),
            Rule::Equals { path, value } => record
                .value(path)
                .is_some_and(|found| values_equal(found, value)),
            Rule::Below { path, value } => record.number(path).is_some_and(|n| n < *value),
            Rule::AtLeast { path, value } => record.number(path).is_some_and(|n| n >= *value),
            Rule::Not { rule } => !rule.eval(record),
            Rule::All { rules } => rules.iter().all(|r| r.eval(record)),
            Rule::Any { rules } => rules.iter().any(|r| r.eval(record)),
            Rule::Custom(p) => p.call(record),
        }
    }

    /// Add declared paths to `paths` in reading order and push every
    /// closure onto `opaque`.
    pub fn collect<'r>(&'r self, paths: &mut IndexSet<String>, opaque: &mut Vec<Opaque<'r>>) {
        match self {
            Rule::Always | Rule::Never => {}
            Rule::Flag { path }
            | Rule::Present { path }
            | Rule::Equals { path, .. }
            | Rule::Below { path, .. }
            | Rule::AtLeast { path, .. } => {
                paths.insert(path.clone());
            }
            Rule::Not { rule } => rule.collect(paths, opaque),
            Rule::All { rules } | Rule::Any { rules } => {
                for rule in rules {
                    rule.collect(paths, opaque);
                }
            }
            Rule::Custom(p) => opaque.push(Opaque::Check(p)),
        }
    }
}

impl Not for Rule {
    type Output = Rule;

    fn not(self) -> Rule {
        Rule::Not {
            rule: Box::new(self),
        }
    }
}

fn values_equal(found: &Value, expected: &Value) -> bool {
    match (found.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => found == expected,
    }
}

fn default_date_format() -> String {
    "%m/%d/%Y".to_string()
}

fn default_separator() -> String {
    " ".to_string()
}

/// String-valued expression over an applicant record. `None` means
/// "nothing to write".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Text {
    Field {
        path: String,
    },
    /// Full form of a structured name.
    Name {
        path: String,
    },
    Literal {
        value: String,
    },
    /// Date field rendered with a chrono format string.
    Date {
        path: String,
        #[serde(default = "default_date_format")]
        format: String,
    },
    /// Non-empty parts joined by `separator`.
    Join {
        parts: Vec<Text>,
        #[serde(default = "default_separator")]
        separator: String,
    },
    When {
        rule: Rule,
        then: Box<Text>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        otherwise: Option<Box<Text>>,
    },
    #[serde(skip)]
    Custom(Predicate<Option<String>>),
}

impl Text {
    pub fn field(path: &str) -> Self {
        Text::Field { path: path.into() }
    }

    pub fn name(path: &str) -> Self {
        Text::Name { path: path.into() }
    }

    pub fn literal(value: &str) -> Self {
        Text::Literal {
            value: value.into(),
        }
    }

    pub fn date(path: &str, format: &str) -> Self {
        Text::Date {
            path: path.into(),
            format: format.into(),
        }
    }

    pub fn join(parts: impl IntoIterator<Item = Text>, separator: &str) -> Self {
        Text::Join {
            parts: parts.into_iter().collect(),
            separator: separator.into(),
        }
    }

    pub fn when(rule: Rule, then: Text, otherwise: Option<Text>) -> Self {
        Text::When {
            rule,
            then: Box::new(then),
            otherwise: otherwise.map(Box::new),
        }
    }

    pub fn custom(f: impl Fn(&Record<'_>) -> Option<String> + Send + Sync + 'static) -> Self {
        Text::Custom(Predicate::new(f))
    }

    pub fn eval(&self, record: &Record<'_>) -> Option<String> {
        let out = match self {
            Text::Field { path } => record.text(path),
            Text::Name { path } => record.name(path).map(|n| n.full()),
            Text::Literal { value } => Some(value.clone()),
            Text::Date { path, format } => {
                let date = record.date(path)?;
                let mut out = String::new();
                // An invalid format string surfaces as a fmt error, not a panic.
                write!(out, "{}", date.format(format)).ok()?;
                Some(out)
            }
            Text::Join { parts, separator } => {
                let parts: Vec<String> = parts.iter().filter_map(|p| p.eval(record)).collect();
                (!parts.is_empty()).then(|| parts.join(separator))
            }
            Text::When {
                rule,
                then,
                otherwise,
            } => {
                if rule.eval(record) {
                    then.eval(record)
                } else {
                    otherwise.as_ref().and_then(|t| t.eval(record))
                }
            }
            Text::Custom(p) => p.call(record),
        };
        out.filter(|s| !s.is_empty())
    }

    /// Like [`Rule::collect`]. Both arms of `When` contribute.
    pub fn collect<'r>(&'r self, paths: &mut IndexSet<String>, opaque: &mut Vec<Opaque<'r>>) {
        match self {
            Text::Field { path } | Text::Name { path } | Text::Date { path, .. } => {
                paths.insert(path.clone());
            }
            Text::Literal { .. } => {}
            Text::Join { parts, .. } => {
                for part in parts {
                    part.collect(paths, opaque);
                }
            }
            Text::When {
                rule,
                then,
                otherwise,
            } => {
                rule.collect(paths, opaque);
                then.collect(paths, opaque);
                if let Some(otherwise) = otherwise {
                    otherwise.collect(paths, opaque);
                }
            }
            Text::Custom(p) => opaque.push(Opaque::Text(p)),
        }
    }
}

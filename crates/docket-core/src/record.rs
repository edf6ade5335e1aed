//! Read-only, optionally traced view over an applicant record.
//!
//! Rules never touch [`Person`](crate::Person) directly; they read through a
//! [`Record`]. When a record carries an [`AccessLog`], every lookup appends
//! its dotted path to the log, which is how requirement resolution discovers
//! what opaque predicates read. Each trace gets its own log.

use std::cell::RefCell;

use chrono::NaiveDate;
use indexmap::IndexSet;
use serde_json::Value;

use crate::person::Name;

static NULL: Value = Value::Null;

/// Insertion-ordered set of dotted paths read through a traced [`Record`].
#[derive(Debug, Default)]
pub struct AccessLog {
    paths: RefCell<IndexSet<String>>,
}

impl AccessLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, path: &str) {
        let mut paths = self.paths.borrow_mut();
        if !paths.contains(path) {
            paths.insert(path.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.paths.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.borrow().is_empty()
    }

    pub fn into_paths(self) -> IndexSet<String> {
        self.paths.into_inner()
    }
}

/// A view of a JSON applicant record, rooted at `prefix`.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    value: &'a Value,
    prefix: String,
    log: Option<&'a AccessLog>,
}

impl<'a> Record<'a> {
    /// Untraced view, used during projection.
    pub fn new(value: &'a Value) -> Self {
        Self {
            value,
            prefix: String::new(),
            log: None,
        }
    }

    /// View that records every path read into `log`.
    pub fn traced(value: &'a Value, log: &'a AccessLog) -> Self {
        Self {
            value,
            prefix: String::new(),
            log: Some(log),
        }
    }

    fn absolute(&self, path: &str) -> String {
        if self.prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}.{}", self.prefix, path)
        }
    }

    /// Raw value at `path`. `null` reads as absent.
    pub fn value(&self, path: &str) -> Option<&'a Value> {
        if let Some(log) = self.log {
            log.record(&self.absolute(path));
        }
        let found = path
            .split('.')
            .try_fold(self.value, |node, key| node.as_object()?.get(key))?;
        (!found.is_null()).then_some(found)
    }

    /// Sub-record at `path`; reads through it are logged with the full path.
    /// Creating the child reads nothing by itself.
    pub fn child(&self, path: &str) -> Record<'a> {
        let value = path
            .split('.')
            .try_fold(self.value, |node, key| node.as_object()?.get(key))
            .unwrap_or(&NULL);
        Record {
            value,
            prefix: self.absolute(path),
            log: self.log,
        }
    }

    /// Whether a non-null, non-blank value exists at `path`.
    pub fn is_present(&self, path: &str) -> bool {
        match self.value(path) {
            None => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(v @ Value::Object(map)) if is_name_shaped(map) => name_from(Some(v)).is_some(),
            Some(_) => true,
        }
    }

    /// Scalar at `path` rendered as text. Blank strings read as absent.
    pub fn text(&self, path: &str) -> Option<String> {
        match self.value(path)? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Truthiness of the value at `path`.
    pub fn flag(&self, path: &str) -> bool {
        match self.value(path) {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    pub fn number(&self, path: &str) -> Option<f64> {
        match self.value(path)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// ISO-8601 (`YYYY-MM-DD`) date at `path`.
    pub fn date(&self, path: &str) -> Option<NaiveDate> {
        let text = self.value(path)?.as_str()?;
        NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
    }

    /// Structured name at `path`; empty names read as absent.
    pub fn name(&self, path: &str) -> Option<Name> {
        name_from(self.value(path))
    }
}

fn is_name_shaped(map: &serde_json::Map<String, Value>) -> bool {
    map.contains_key("first") && map.contains_key("last")
}

fn name_from(value: Option<&Value>) -> Option<Name> {
    let name: Name = serde_json::from_value(value?.clone()).ok()?;
    (!name.is_empty()).then_some(name)
}

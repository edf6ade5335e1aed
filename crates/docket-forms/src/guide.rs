//! Narrative filing guides rendered ahead of the forms.
//!
//! A [`TemplateGuide`] fills `{{dotted.path}}` placeholders from a
//! [`GuideContext`] and hands the resulting HTML to an [`HtmlToPdf`]
//! converter. The context exposes the applicant's fields at the top level,
//! the county court under `court`, and the packet contents under
//! `documents` and `guides`.

use std::process::Stdio;

use async_trait::async_trait;
use docket_core::{CourtInfo, Name, Person};
use serde_json::{Map, Value, json};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::GuideError;
use crate::projector::InfoGuide;

/// Data a guide template can reference.
#[derive(Debug, Clone)]
pub struct GuideContext {
    value: Value,
}

impl GuideContext {
    pub fn new(
        person: &Person,
        court: Option<&CourtInfo>,
        documents: &[String],
        guides: &[InfoGuide],
    ) -> Self {
        let mut map = match person.to_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        map.insert(
            "court".into(),
            court
                .and_then(|c| serde_json::to_value(c).ok())
                .unwrap_or(Value::Null),
        );
        map.insert("documents".into(), json!(documents));
        map.insert(
            "guides".into(),
            Value::Array(
                guides
                    .iter()
                    .map(|g| json!({ "name": g.document, "guide": g.guide }))
                    .collect(),
            ),
        );
        Self {
            value: Value::Object(map),
        }
    }

    /// Value at a dotted path; `None` when absent or null.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.value, |v, key| v.get(key))
            .filter(|v| !v.is_null())
    }
}

/// Produces the bytes of a guide document in the packet's format.
#[async_trait]
pub trait GuideRenderer: Send + Sync {
    async fn render(&self, context: &GuideContext) -> Result<Vec<u8>, GuideError>;
}

/// Converts an HTML page into document bytes.
#[async_trait]
pub trait HtmlToPdf: Send + Sync {
    async fn convert(&self, html: &str) -> Result<Vec<u8>, GuideError>;
}

/// A text template with `{{path}}` placeholders.
pub struct TemplateGuide<C> {
    template: String,
    converter: C,
}

impl<C: HtmlToPdf> TemplateGuide<C> {
    pub fn new(template: impl Into<String>, converter: C) -> Self {
        Self {
            template: template.into(),
            converter,
        }
    }

    pub fn render_html(&self, context: &GuideContext) -> String {
        substitute(&self.template, context)
    }
}

#[async_trait]
impl<C: HtmlToPdf> GuideRenderer for TemplateGuide<C> {
    async fn render(&self, context: &GuideContext) -> Result<Vec<u8>, GuideError> {
        let html = self.render_html(context);
        debug!(bytes = html.len(), "rendered guide html");
        self.converter.convert(&html).await
    }
}

/// Replace every `{{path}}` with the escaped value at `path`. Unknown paths
/// render empty; an unterminated `{{` is kept verbatim.
pub fn substitute(template: &str, context: &GuideContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let path = after[..end].trim();
        match context.get(path) {
            Some(value) => escape_into(&mut out, &display(value)),
            None => debug!(path, "guide placeholder has no value"),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item.get("name") {
                Some(name) => display(name),
                None => display(item),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => match serde_json::from_value::<Name>(value.clone()) {
            Ok(name) if !name.is_empty() => name.full(),
            _ => String::new(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

/// Runs an external converter that reads HTML on stdin and writes the
/// document to stdout, e.g. `wkhtmltopdf - -`.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
}

impl CommandConverter {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Split a whitespace-separated command line. `None` when blank.
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?;
        Some(Self {
            program: program.to_string(),
            args: parts.map(str::to_string).collect(),
        })
    }
}

#[async_trait]
impl HtmlToPdf for CommandConverter {
    async fn convert(&self, html: &str) -> Result<Vec<u8>, GuideError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| GuideError::Convert("converter stdin unavailable".into()))?;

        let input = html.as_bytes().to_vec();
        let write = async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            return Err(GuideError::Convert(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        written?;
        Ok(output.stdout)
    }
}

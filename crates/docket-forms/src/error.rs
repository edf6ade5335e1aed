use thiserror::Error;

use crate::backend::FieldKind;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("field not found: {0}")]
    FieldNotFound(String),

    #[error("field {field:?} is a {found} field, expected {expected}")]
    WrongFieldKind {
        field: String,
        expected: FieldKind,
        found: FieldKind,
    },

    #[error("field {field:?} has no option {choice:?}")]
    UnknownChoice { field: String, choice: String },

    #[error("page {0} out of range")]
    PageOutOfRange(usize),

    #[error("malformed template: {0}")]
    Malformed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "pdf")]
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("invalid template name: {0:?}")]
    InvalidName(String),

    #[error("reading {filename}: {source}")]
    Io {
        filename: String,
        source: std::io::Error,
    },

    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum GuideError {
    #[error("guide conversion failed: {0}")]
    Convert(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

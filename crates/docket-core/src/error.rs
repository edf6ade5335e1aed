use thiserror::Error;

use crate::process::Target;

/// Build-time configuration defects in documents, processes, or the catalog.
///
/// These are reported by deserialization and [`Catalog::validate`](crate::Catalog::validate),
/// never per applicant.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed formfill: {0}")]
    MalformedFormfill(String),

    #[error("document {document:?} has an empty map")]
    EmptyMap { document: String },

    #[error("document {document:?} has neither a filename nor a guide")]
    NoContent { document: String },

    #[error("document {document:?} selects an empty choice on field {field:?}")]
    EmptySelect { document: String, field: String },

    #[error("{required_by} in {jurisdiction} depends on {target}, which has no process")]
    UnresolvedDependency {
        jurisdiction: String,
        target: Target,
        required_by: Target,
    },

    #[error("process {target} in {jurisdiction} references unknown document id {id:?}")]
    UnknownDocument {
        jurisdiction: String,
        target: Target,
        id: String,
    },

    #[error("document id {0:?} is defined more than once")]
    DuplicateDocumentId(String),

    #[error("document {0:?} in a catalog file needs an id")]
    MissingDocumentId(String),

    #[error("unknown target: {0:?}")]
    UnknownTarget(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

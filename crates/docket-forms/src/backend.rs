//! The form-document abstraction the projector writes through.

use std::fmt;

use crate::FormError;

/// What a named field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Checkbox,
    RadioGroup,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldKind::Text => "text",
            FieldKind::Checkbox => "checkbox",
            FieldKind::RadioGroup => "radio group",
        })
    }
}

/// A paged form the projector can fill, flatten and merge.
///
/// Page heights are in points with a bottom-left origin. Field names are
/// fully qualified.
pub trait FormDocument: Sized {
    fn load(bytes: &[u8]) -> Result<Self, FormError>;

    /// A document with no pages, used as the merge target.
    fn empty() -> Self;

    fn page_count(&self) -> usize;

    fn page_height(&self, page: usize) -> Option<f32>;

    /// `None` when no field has this name.
    fn field_kind(&self, name: &str) -> Option<FieldKind>;

    fn set_text(&mut self, name: &str, value: &str) -> Result<(), FormError>;

    fn set_checked(&mut self, name: &str) -> Result<(), FormError>;

    fn select(&mut self, name: &str, choice: &str) -> Result<(), FormError>;

    /// Draw `text` with its baseline origin at (`x`, `y`).
    fn draw_text(
        &mut self,
        page: usize,
        x: f32,
        y: f32,
        font_size: f32,
        text: &str,
    ) -> Result<(), FormError>;

    /// Bake field values into page content and drop the interactive fields.
    fn flatten(&mut self) -> Result<(), FormError>;

    /// Append every page of `other` after this document's pages.
    fn append(&mut self, other: Self) -> Result<(), FormError>;

    fn to_bytes(&self) -> Result<Vec<u8>, FormError>;
}

//! Projection of applicant data onto document templates and assembly of
//! the merged packet.

mod backend;
mod error;
pub mod geometry;
pub mod guide;
pub mod projector;
pub mod sheet;
pub mod source;

#[cfg(feature = "pdf")]
pub mod pdf;

pub use backend::{FieldKind, FormDocument};
pub use error::{FetchError, FormError, GuideError};
pub use guide::{CommandConverter, GuideContext, GuideRenderer, HtmlToPdf, TemplateGuide};
pub use projector::{FormProjector, InfoGuide, Packet, ProjectionWarning};
pub use sheet::SheetDocument;
pub use source::{DirSource, MemorySource, TemplateSource};

#[cfg(feature = "pdf")]
pub use pdf::PdfDocument;

#[cfg(feature = "http")]
pub use source::HttpSource;

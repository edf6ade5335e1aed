//! Core types for Docket: the applicant record, targets, processes, documents,
//! form-fill bindings, rule expressions, and the process catalog.

pub mod catalog;
pub mod document;
mod error;
pub mod person;
pub mod process;
pub mod record;
pub mod reference;
pub mod rule;

pub use catalog::Catalog;
pub use document::{Document, Formfill, Location};
pub use error::ConfigError;
pub use person::{Address, Marker, Name, Person, Place};
pub use process::{Process, Target};
pub use record::{AccessLog, Record};
pub use reference::{CourtInfo, JurisdictionInfo, ReferenceData};
pub use rule::{Opaque, Predicate, Rule, Text};

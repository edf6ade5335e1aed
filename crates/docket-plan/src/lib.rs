//! Planning: which documents a set of targets implicates, and which
//! applicant fields those documents read.

mod error;
pub mod graph;
pub mod requirements;

pub use error::PlanError;
pub use graph::{FilingGroup, Plan, resolve, resolve_processes};
pub use requirements::{RequirementResolver, Requirements, ResolveWarning, SampleSet};

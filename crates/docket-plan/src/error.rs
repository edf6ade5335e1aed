use docket_core::Target;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    /// A target with no process is a configuration error, never dropped.
    #[error("no {target} process in {jurisdiction}{}", required_by_suffix(.required_by))]
    UnresolvedTarget {
        jurisdiction: String,
        target: Target,
        required_by: Option<Target>,
    },

    #[error("no targets selected")]
    EmptySelection,
}

fn required_by_suffix(required_by: &Option<Target>) -> String {
    required_by
        .map(|t| format!(" (required by {t})"))
        .unwrap_or_default()
}

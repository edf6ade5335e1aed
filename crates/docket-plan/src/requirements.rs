//! Requirement resolution: which applicant fields a document list reads.
//!
//! Declared rule expressions report their paths directly, both arms of
//! every conditional included. Custom closures are opaque, so they are run
//! against a set of fully populated sample records through a traced
//! [`Record`], and every path read is unioned into the result. Samples span
//! the age and consent breakpoints so branch-dependent closures report both
//! sides.
//!
//! A closure that panics on sample data loses that sample's contribution
//! for its document and produces a [`ResolveWarning`]; the rest of the
//! document list is still resolved.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{Local, Months};
use docket_core::{AccessLog, Document, Opaque, Person, Record};
use indexmap::IndexSet;
use serde_json::Value;
use tracing::{debug, warn};

const MINOR_AGE: u32 = 15;

/// Stand-in applicant records used to exercise custom closures.
#[derive(Debug, Clone)]
pub struct SampleSet {
    samples: Vec<Person>,
}

impl SampleSet {
    /// A single sample. Branch-dependent closures only report the branch
    /// this sample takes.
    pub fn single(person: Person) -> Self {
        Self {
            samples: vec![person],
        }
    }

    /// Adult and minor, each with every flag set and every flag cleared.
    /// The minor's birthdate agrees with their age as of today.
    pub fn standard() -> Self {
        let adult = Person::sample();
        let minor = Person {
            age: Some(MINOR_AGE),
            birthdate: Local::now()
                .date_naive()
                .checked_sub_months(Months::new(MINOR_AGE * 12)),
            ..adult.clone()
        };
        let cleared = |p: &Person| Person {
            parents_consent: Some(false),
            has_criminal_record: Some(false),
            previous_name_change: Some(false),
            ..p.clone()
        };
        let samples = vec![cleared(&adult), cleared(&minor), adult, minor];
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for SampleSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// A custom closure that failed on sample data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveWarning {
    pub document: String,
    pub sample: usize,
    pub message: String,
}

impl fmt::Display for ResolveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: predicate failed on sample {}: {}",
            self.document, self.sample, self.message
        )
    }
}

/// The fields a document list reads, in first-read order.
#[derive(Debug, Clone, Default)]
pub struct Requirements {
    paths: IndexSet<String>,
    pub warnings: Vec<ResolveWarning>,
}

impl Requirements {
    /// Dotted paths, e.g. `legalName.first`.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Top-level properties, e.g. `legalName`.
    pub fn roots(&self) -> Vec<&str> {
        let roots: IndexSet<&str> = self
            .paths
            .iter()
            .filter_map(|p| p.split('.').next())
            .collect();
        roots.into_iter().collect()
    }

    /// Whether `path` is required, or anything beneath it is.
    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| {
            p == path || (p.starts_with(path) && p.as_bytes().get(path.len()) == Some(&b'.'))
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Infers [`Requirements`] for a document list.
#[derive(Debug, Clone)]
pub struct RequirementResolver {
    samples: Vec<Value>,
}

impl Default for RequirementResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl RequirementResolver {
    pub fn new() -> Self {
        Self::with_samples(SampleSet::standard())
    }

    pub fn with_samples(samples: SampleSet) -> Self {
        Self {
            samples: samples.samples.iter().map(Person::to_value).collect(),
        }
    }

    pub fn resolve(&self, documents: &[Arc<Document>]) -> Requirements {
        let mut requirements = Requirements::default();

        for document in documents {
            let mut declared = IndexSet::new();
            let mut opaque = Vec::new();
            document.collect(&mut declared, &mut opaque);
            requirements.paths.extend(declared);

            if opaque.is_empty() {
                continue;
            }
            for (index, sample) in self.samples.iter().enumerate() {
                match trace(&opaque, sample) {
                    Ok(paths) => requirements.paths.extend(paths),
                    Err(message) => {
                        warn!(
                            document = document.label(),
                            sample = index,
                            %message,
                            "predicate failed during requirement tracing"
                        );
                        requirements.warnings.push(ResolveWarning {
                            document: document.label().to_string(),
                            sample: index,
                            message,
                        });
                    }
                }
            }
        }

        debug!(
            documents = documents.len(),
            paths = requirements.len(),
            warnings = requirements.warnings.len(),
            "resolved requirements"
        );
        requirements
    }
}

/// Run every closure against `sample` with a fresh log.
fn trace(opaque: &[Opaque<'_>], sample: &Value) -> Result<IndexSet<String>, String> {
    let log = AccessLog::new();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let record = Record::traced(sample, &log);
        for predicate in opaque {
            predicate.run(&record);
        }
    }));
    match outcome {
        Ok(()) => Ok(log.into_paths()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "predicate panicked".to_string()
    }
}

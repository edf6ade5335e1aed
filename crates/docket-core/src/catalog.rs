//! The jurisdiction → target → process lookup table.
//!
//! Catalogs are built in code or loaded from JSON. In the JSON form,
//! documents are declared once with an `id` and referenced by id from
//! processes, so a document shared by several processes is one
//! `Arc<Document>`.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::ConfigError;
use crate::document::{Document, Formfill};
use crate::process::{Process, Target};

type Key = (Option<String>, Target);

/// Process lookup table keyed by `(jurisdiction, target)`.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    processes: BTreeMap<Key, Arc<Process>>,
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    documents: Vec<Document>,
    processes: Vec<ProcessEntry>,
}

#[derive(Deserialize)]
struct ProcessEntry {
    #[serde(default)]
    jurisdiction: Option<String>,
    target: Target,
    #[serde(default)]
    depends: Vec<Target>,
    #[serde(default)]
    documents: Vec<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog file. Structural problems (unknown document ids,
    /// malformed formfills) fail here; use [`validate`](Self::validate) for
    /// the rest.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = serde_json::from_str(json)?;

        let mut by_id: HashMap<String, Arc<Document>> = HashMap::new();
        for document in file.documents {
            let id = document
                .id
                .clone()
                .ok_or_else(|| ConfigError::MissingDocumentId(document.name.clone()))?;
            if by_id.insert(id.clone(), Arc::new(document)).is_some() {
                return Err(ConfigError::DuplicateDocumentId(id));
            }
        }

        let mut catalog = Catalog::new();
        for entry in file.processes {
            let documents = entry
                .documents
                .iter()
                .map(|id| {
                    by_id
                        .get(id)
                        .cloned()
                        .ok_or_else(|| ConfigError::UnknownDocument {
                            jurisdiction: entry.jurisdiction.clone().unwrap_or("federal".into()),
                            target: entry.target,
                            id: id.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            catalog.insert(
                Process::new(entry.jurisdiction.as_deref(), entry.target)
                    .depends_on(entry.depends)
                    .with_documents(documents),
            );
        }

        info!(
            processes = catalog.len(),
            documents = by_id.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    /// Add a process, replacing any previous one for the same key.
    pub fn insert(&mut self, process: Process) -> Arc<Process> {
        let process = Arc::new(process);
        let key = (process.jurisdiction.clone(), process.target);
        self.processes.insert(key, Arc::clone(&process));
        process
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Exact lookup, without federal fallback.
    pub fn get(&self, jurisdiction: Option<&str>, target: Target) -> Option<&Arc<Process>> {
        self.processes
            .get(&(jurisdiction.map(str::to_string), target))
    }

    /// The process for `target` in `jurisdiction`, falling back to the
    /// federal process.
    pub fn lookup(&self, jurisdiction: Option<&str>, target: Target) -> Option<Arc<Process>> {
        self.get(jurisdiction, target)
            .or_else(|| self.get(None, target))
            .cloned()
    }

    pub fn processes(&self) -> impl Iterator<Item = &Arc<Process>> {
        self.processes.values()
    }

    /// Jurisdiction codes with at least one process.
    pub fn jurisdictions(&self) -> BTreeSet<&str> {
        self.processes
            .keys()
            .filter_map(|(j, _)| j.as_deref())
            .collect()
    }

    /// Every configuration defect in the catalog. Empty means valid.
    ///
    /// Federal processes must have their dependencies satisfiable from every
    /// jurisdiction in the catalog.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();

        for process in self.processes() {
            for document in &process.documents {
                if seen.insert(Arc::as_ptr(document)) {
                    check_document(document, &mut problems);
                }
            }

            let scopes: Vec<Option<&str>> = match process.jurisdiction.as_deref() {
                Some(j) => vec![Some(j)],
                None if self.jurisdictions().is_empty() => vec![None],
                None => self.jurisdictions().into_iter().map(Some).collect(),
            };
            for dep in &process.depends {
                for scope in &scopes {
                    if self.lookup(*scope, *dep).is_none() {
                        problems.push(ConfigError::UnresolvedDependency {
                            jurisdiction: scope.unwrap_or("federal").to_string(),
                            target: *dep,
                            required_by: process.target,
                        });
                    }
                }
            }
        }
        problems
    }
}

fn check_document(document: &Document, problems: &mut Vec<ConfigError>) {
    let label = document.label().to_string();
    if document.map.as_ref().is_some_and(Vec::is_empty) {
        problems.push(ConfigError::EmptyMap {
            document: label.clone(),
        });
    }
    if document.filename.is_none() && document.guide.is_none() {
        problems.push(ConfigError::NoContent {
            document: label.clone(),
        });
    }
    for fill in document.fills() {
        if let Formfill::CheckField {
            field,
            select: Some(choice),
            ..
        } = fill
            && choice.trim().is_empty()
        {
            problems.push(ConfigError::EmptySelect {
                document: label.clone(),
                field: field.clone(),
            });
        }
    }
}

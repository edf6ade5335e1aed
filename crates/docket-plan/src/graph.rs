//! Process graph resolution.
//!
//! Expands selected targets through their `depends` lists into the full set
//! of processes, then flattens their documents into one ordered list with
//! each document appearing once, at its first position.
//!
//! # Ordering
//!
//! Processes are visited depth-first, preorder, starting from each root in
//! selection order. A process's documents keep their declared order.
//!
//! # Cycles
//!
//! A dependency on an already-visited target is satisfied, not expanded
//! again. Cycles mean "file these together": after the walk, the visited
//! target graph is collapsed into strongly connected components and every
//! non-trivial component is reported as a [`FilingGroup`].

use std::collections::HashSet;
use std::sync::Arc;

use docket_core::{Catalog, Document, Process, Target};
use indexmap::IndexMap;
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, info};

use crate::PlanError;

/// Targets that depend on each other and must be filed simultaneously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingGroup {
    /// Members in visitation order.
    pub targets: Vec<Target>,
}

/// The resolved packet plan.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Deduplicated documents in packet order.
    pub documents: Vec<Arc<Document>>,
    /// Visited processes in visitation order.
    pub processes: Vec<Arc<Process>>,
    pub filing_groups: Vec<FilingGroup>,
}

impl Plan {
    pub fn targets(&self) -> impl Iterator<Item = Target> + '_ {
        self.processes.iter().map(|p| p.target)
    }

    /// The filing group containing `target`, if it is part of a cycle.
    pub fn group_of(&self, target: Target) -> Option<&FilingGroup> {
        self.filing_groups
            .iter()
            .find(|g| g.targets.contains(&target))
    }
}

/// Resolve `targets` in `jurisdiction` (federal processes fill gaps).
pub fn resolve(
    catalog: &Catalog,
    jurisdiction: Option<&str>,
    targets: &[Target],
) -> Result<Plan, PlanError> {
    if targets.is_empty() {
        return Err(PlanError::EmptySelection);
    }

    let mut walker = Walker::new(catalog);
    for &target in targets {
        let root = catalog
            .lookup(jurisdiction, target)
            .ok_or_else(|| unresolved(jurisdiction, target, None))?;
        walker.visit(root, jurisdiction)?;
    }
    Ok(walker.finish())
}

/// Resolve from explicit root processes. Each root's dependencies are
/// looked up in that root's own jurisdiction.
pub fn resolve_processes(catalog: &Catalog, roots: &[Arc<Process>]) -> Result<Plan, PlanError> {
    if roots.is_empty() {
        return Err(PlanError::EmptySelection);
    }

    let mut walker = Walker::new(catalog);
    for root in roots {
        let jurisdiction = root.jurisdiction.clone();
        walker.visit(Arc::clone(root), jurisdiction.as_deref())?;
    }
    Ok(walker.finish())
}

fn unresolved(jurisdiction: Option<&str>, target: Target, required_by: Option<Target>) -> PlanError {
    PlanError::UnresolvedTarget {
        jurisdiction: jurisdiction.unwrap_or("federal").to_string(),
        target,
        required_by,
    }
}

struct Walker<'c> {
    catalog: &'c Catalog,
    visited: IndexMap<Target, Arc<Process>>,
    graph: DiGraphMap<Target, ()>,
}

impl<'c> Walker<'c> {
    fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            visited: IndexMap::new(),
            graph: DiGraphMap::new(),
        }
    }

    fn visit(&mut self, process: Arc<Process>, jurisdiction: Option<&str>) -> Result<(), PlanError> {
        let target = process.target;
        if self.visited.contains_key(&target) {
            debug!(%target, "target already resolved");
            return Ok(());
        }
        self.graph.add_node(target);
        self.visited.insert(target, Arc::clone(&process));

        for &dep in &process.depends {
            self.graph.add_edge(target, dep, ());
            if self.visited.contains_key(&dep) {
                debug!(%target, %dep, "dependency already satisfied");
                continue;
            }
            let next = self
                .catalog
                .lookup(jurisdiction, dep)
                .ok_or_else(|| unresolved(jurisdiction, dep, Some(target)))?;
            self.visit(next, jurisdiction)?;
        }
        Ok(())
    }

    fn filing_groups(&self) -> Vec<FilingGroup> {
        let position = |t: &Target| self.visited.get_index_of(t).unwrap_or(usize::MAX);

        let mut groups: Vec<FilingGroup> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1 || self.graph.contains_edge(component[0], component[0])
            })
            .map(|mut targets| {
                targets.sort_by_key(position);
                FilingGroup { targets }
            })
            .collect();
        groups.sort_by_key(|g| position(&g.targets[0]));
        groups
    }

    fn finish(self) -> Plan {
        let filing_groups = self.filing_groups();

        let mut seen = HashSet::new();
        let mut documents = Vec::new();
        for process in self.visited.values() {
            for document in &process.documents {
                if seen.insert(Arc::as_ptr(document)) {
                    documents.push(Arc::clone(document));
                }
            }
        }

        let processes: Vec<Arc<Process>> = self.visited.into_values().collect();
        info!(
            processes = processes.len(),
            documents = documents.len(),
            filing_groups = filing_groups.len(),
            "resolved plan"
        );
        Plan {
            documents,
            processes,
            filing_groups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str) -> Arc<Document> {
        Arc::new(Document::new(name).with_filename(&format!("{name}.pdf")))
    }

    fn names(plan: &Plan) -> Vec<&str> {
        plan.documents.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn empty_selection_is_an_error() {
        let catalog = Catalog::new();
        assert!(matches!(
            resolve(&catalog, Some("IL"), &[]),
            Err(PlanError::EmptySelection)
        ));
    }

    #[test]
    fn roots_in_selection_order_dependencies_preorder() {
        let mut catalog = Catalog::new();
        catalog.insert(
            Process::new(Some("IL"), Target::GenderMarker)
                .depends_on([Target::BirthRecord])
                .with_documents([doc("gm-1"), doc("gm-2")]),
        );
        catalog.insert(Process::new(Some("IL"), Target::BirthRecord).with_documents([doc("br")]));
        catalog.insert(Process::new(None, Target::Passport).with_documents([doc("ds-11")]));

        let plan = resolve(&catalog, Some("IL"), &[Target::Passport, Target::GenderMarker]).unwrap();
        assert_eq!(names(&plan), vec!["ds-11", "gm-1", "gm-2", "br"]);
        assert_eq!(
            plan.targets().collect::<Vec<_>>(),
            vec![Target::Passport, Target::GenderMarker, Target::BirthRecord]
        );
        assert!(plan.filing_groups.is_empty());
    }

    #[test]
    fn shared_document_appears_once_at_first_position() {
        let court_order = doc("court-order");
        let mut catalog = Catalog::new();
        catalog.insert(
            Process::new(Some("IL"), Target::NameChange)
                .with_documents([doc("petition"), Arc::clone(&court_order)]),
        );
        catalog.insert(
            Process::new(None, Target::SocialSecurity)
                .depends_on([Target::NameChange])
                .with_documents([doc("ss-5"), Arc::clone(&court_order)]),
        );
        catalog.insert(
            Process::new(None, Target::Passport)
                .depends_on([Target::NameChange])
                .with_documents([Arc::clone(&court_order), doc("ds-82")]),
        );

        let plan = resolve(
            &catalog,
            Some("IL"),
            &[Target::SocialSecurity, Target::Passport],
        )
        .unwrap();
        assert_eq!(
            names(&plan),
            vec!["ss-5", "court-order", "petition", "ds-82"]
        );
        let occurrences = plan
            .documents
            .iter()
            .filter(|d| Arc::ptr_eq(d, &court_order))
            .count();
        assert_eq!(occurrences, 1);
    }

    #[test]
    fn same_name_different_document_is_kept() {
        let mut catalog = Catalog::new();
        catalog.insert(
            Process::new(Some("IL"), Target::NameChange).with_documents([doc("notice"), doc("notice")]),
        );
        let plan = resolve(&catalog, Some("IL"), &[Target::NameChange]).unwrap();
        assert_eq!(plan.documents.len(), 2);
    }

    #[test]
    fn cycles_terminate_and_form_a_filing_group() {
        let mut catalog = Catalog::new();
        catalog.insert(
            Process::new(Some("IL"), Target::NameChange)
                .depends_on([Target::GenderMarker])
                .with_documents([doc("a-1"), doc("a-2")]),
        );
        catalog.insert(
            Process::new(Some("IL"), Target::GenderMarker)
                .depends_on([Target::NameChange])
                .with_documents([doc("b-1")]),
        );

        let plan = resolve(&catalog, Some("IL"), &[Target::NameChange, Target::GenderMarker]).unwrap();
        assert_eq!(names(&plan), vec!["a-1", "a-2", "b-1"]);
        assert_eq!(
            plan.filing_groups,
            vec![FilingGroup {
                targets: vec![Target::NameChange, Target::GenderMarker]
            }]
        );
        assert!(plan.group_of(Target::GenderMarker).is_some());
    }

    #[test]
    fn self_dependency_is_a_group_of_one() {
        let mut catalog = Catalog::new();
        catalog.insert(
            Process::new(None, Target::Passport)
                .depends_on([Target::Passport])
                .with_documents([doc("ds-11")]),
        );
        let plan = resolve(&catalog, None, &[Target::Passport]).unwrap();
        assert_eq!(names(&plan), vec!["ds-11"]);
        assert_eq!(plan.filing_groups.len(), 1);
    }

    #[test]
    fn missing_dependency_is_reported() {
        let mut catalog = Catalog::new();
        catalog.insert(
            Process::new(Some("IL"), Target::GenderMarker)
                .depends_on([Target::BirthRecord])
                .with_documents([doc("gm")]),
        );
        let err = resolve(&catalog, Some("IL"), &[Target::GenderMarker]).unwrap_err();
        match err {
            PlanError::UnresolvedTarget {
                jurisdiction,
                target,
                required_by,
            } => {
                assert_eq!(jurisdiction, "IL");
                assert_eq!(target, Target::BirthRecord);
                assert_eq!(required_by, Some(Target::GenderMarker));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            resolve(&catalog, Some("IL"), &[Target::Passport])
                .unwrap_err()
                .to_string(),
            "no passport process in IL"
        );
    }

    #[test]
    fn explicit_roots_use_their_own_jurisdiction() {
        let mut catalog = Catalog::new();
        catalog.insert(Process::new(Some("IL"), Target::NameChange).with_documents([doc("il")]));
        catalog.insert(Process::new(Some("WI"), Target::NameChange).with_documents([doc("wi")]));
        let root = catalog.insert(
            Process::new(Some("WI"), Target::GenderMarker)
                .depends_on([Target::NameChange])
                .with_documents([doc("gm")]),
        );
        let plan = resolve_processes(&catalog, &[root]).unwrap();
        assert_eq!(names(&plan), vec!["gm", "wi"]);
    }

    #[test]
    fn resolution_is_deterministic() {
        let mut catalog = Catalog::new();
        catalog.insert(
            Process::new(Some("IL"), Target::NameChange)
                .depends_on([Target::BirthRecord, Target::GenderMarker])
                .with_documents([doc("nc")]),
        );
        catalog.insert(
            Process::new(Some("IL"), Target::GenderMarker)
                .depends_on([Target::NameChange])
                .with_documents([doc("gm")]),
        );
        catalog.insert(Process::new(Some("IL"), Target::BirthRecord).with_documents([doc("br")]));

        let first = resolve(&catalog, Some("IL"), &[Target::NameChange]).unwrap();
        let second = resolve(&catalog, Some("IL"), &[Target::NameChange]).unwrap();
        let ptrs = |p: &Plan| p.documents.iter().map(Arc::as_ptr).collect::<Vec<_>>();
        assert_eq!(ptrs(&first), ptrs(&second));
        assert_eq!(first.filing_groups, second.filing_groups);
        assert_eq!(names(&first), vec!["nc", "br", "gm"]);
    }
}

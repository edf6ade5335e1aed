//! The catalog shipped under `data/` stays valid and plans as documented.

use docket_core::{Catalog, Target};
use docket_plan::{RequirementResolver, resolve};

const CATALOG: &str = include_str!("../../../data/catalog.json");

fn catalog() -> Catalog {
    Catalog::from_json(CATALOG).unwrap()
}

#[test]
fn demo_catalog_validates() {
    let problems = catalog().validate();
    assert!(problems.is_empty(), "{problems:?}");
}

#[test]
fn passport_pulls_in_name_change_and_social_security() {
    let plan = resolve(&catalog(), Some("IL"), &[Target::Passport]).unwrap();
    let targets: Vec<Target> = plan.targets().collect();
    assert_eq!(
        targets,
        vec![Target::Passport, Target::NameChange, Target::SocialSecurity]
    );
    let ids: Vec<&str> = plan.documents.iter().map(|d| d.label()).collect();
    assert_eq!(
        ids,
        vec![
            "ds-82",
            "ds-11",
            "il-petition",
            "il-petition-minor",
            "il-publication",
            "ss-5"
        ]
    );
    assert!(plan.filing_groups.is_empty());
}

#[test]
fn federal_only_selection_fails_without_a_name_change_process() {
    let err = resolve(&catalog(), None, &[Target::SocialSecurity]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "no name-change process in federal (required by social-security)"
    );
}

#[test]
fn requirements_cover_both_signer_branches() {
    let plan = resolve(&catalog(), Some("IL"), &[Target::SocialSecurity]).unwrap();
    let requirements = RequirementResolver::new().resolve(&plan.documents);
    assert!(requirements.warnings.is_empty());
    for path in ["age", "legalName", "representativeName", "parentsConsent", "ssn"] {
        assert!(requirements.contains(path), "missing {path}");
    }
    assert!(!requirements.contains("passportNumber"));
}

//! Terminal output for plans, requirements and packets.

use std::path::Path;

use docket_core::{Catalog, ConfigError};
use docket_forms::Packet;
use docket_plan::{Plan, Requirements};

// ── Catalog ──

pub fn print_problems(catalog: &Catalog, problems: &[ConfigError]) {
    let jurisdictions: Vec<&str> = catalog.jurisdictions().into_iter().collect();
    println!(
        "Catalog: {} processes across {}",
        catalog.len(),
        if jurisdictions.is_empty() {
            "federal only".to_string()
        } else {
            jurisdictions.join(", ")
        }
    );
    if problems.is_empty() {
        println!("No problems found.");
        return;
    }
    println!();
    println!("Problems");
    for problem in problems {
        println!("  - {problem}");
    }
}

// ── Plan ──

pub fn print_plan(plan: &Plan) {
    println!("Processes");
    for process in &plan.processes {
        let depends: Vec<String> = process.depends.iter().map(|t| t.to_string()).collect();
        let suffix = if depends.is_empty() {
            String::new()
        } else {
            format!(" (after {})", depends.join(", "))
        };
        println!("  {:<26} {}{}", process.target.to_string(), process.scope(), suffix);
    }

    println!();
    println!("Documents");
    if plan.documents.is_empty() {
        println!("  (none)");
    }
    for (i, document) in plan.documents.iter().enumerate() {
        let source = match (&document.filename, &document.guide) {
            (Some(filename), _) => filename.as_str(),
            (None, Some(_)) => "(guide only)",
            (None, None) => "-",
        };
        println!("  {:>2}. {:<34} {}", i + 1, document.name, source);
    }

    if !plan.filing_groups.is_empty() {
        println!();
        println!("File together");
        for group in &plan.filing_groups {
            let targets: Vec<String> = group.targets.iter().map(|t| t.to_string()).collect();
            println!("  {}", targets.join(" + "));
        }
    }
}

// ── Requirements ──

pub fn print_requirements(requirements: &Requirements, roots: bool) {
    if roots {
        for root in requirements.roots() {
            println!("{root}");
        }
    } else {
        for path in requirements.paths() {
            println!("{path}");
        }
    }
    for warning in &requirements.warnings {
        eprintln!("warning: {warning}");
    }
}

// ── Packet ──

pub fn print_packet(packet: &Packet, out: &Path) {
    println!(
        "Wrote {} pages to {} ({} bytes)",
        packet.page_count,
        out.display(),
        packet.bytes.len()
    );
    for label in &packet.included {
        println!("  + {label}");
    }

    if !packet.info_guides.is_empty() {
        println!();
        println!("Also required");
        for info in &packet.info_guides {
            println!("  {}", info.document);
            for line in info.guide.lines() {
                println!("      {line}");
            }
        }
    }

    if !packet.warnings.is_empty() {
        println!();
        println!("Warnings");
        for warning in &packet.warnings {
            println!("  ! {warning}");
        }
    }
}

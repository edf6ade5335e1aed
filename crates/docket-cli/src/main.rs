//! `docket`: plan, inspect and build legal document packets.
//!
//! # Commands
//!
//! - `validate` - Check the catalog for configuration errors
//! - `plan <TARGET>...` - Show the ordered documents and filing groups
//! - `requirements <TARGET>...` - Show which applicant fields are needed
//! - `build <TARGET>...` - Fill and merge the packet for one applicant

mod display;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use docket_core::{Catalog, Person, ReferenceData, Target};
use docket_forms::{
    CommandConverter, DirSource, FormProjector, HttpSource, PdfDocument, SheetDocument,
    TemplateGuide,
};
use docket_plan::{Plan, RequirementResolver};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Assemble legal document packets.
#[derive(Parser)]
#[command(name = "docket", version)]
#[command(about = "Assemble legal document packets", long_about = None)]
struct Cli {
    /// Process catalog (JSON)
    #[arg(long, global = true, env = "DOCKET_CATALOG", default_value = "catalog.json")]
    catalog: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the catalog for configuration errors.
    ///
    /// Exits non-zero when any are found.
    Validate,

    /// Show the ordered document list and filing groups for the targets.
    Plan {
        #[command(flatten)]
        selection: Selection,
    },

    /// Show the applicant fields the selected documents read.
    Requirements {
        #[command(flatten)]
        selection: Selection,

        /// Print top-level properties only
        #[arg(long)]
        roots: bool,
    },

    /// Fill, flatten and merge the packet for one applicant.
    Build {
        #[command(flatten)]
        selection: Selection,

        /// Applicant record (JSON)
        #[arg(long)]
        person: PathBuf,

        /// Where to write the packet
        #[arg(short, long)]
        out: PathBuf,

        /// Template directory, or an http(s) base URL
        #[arg(long, env = "DOCKET_TEMPLATES", default_value = "templates")]
        templates: String,

        /// Court reference data (JSON)
        #[arg(long, env = "DOCKET_REFERENCE")]
        reference: Option<PathBuf>,

        /// Guide template rendered as the first pages (pdf format only)
        #[arg(long)]
        guide: Option<PathBuf>,

        /// HTML-to-document converter for the guide, reading stdin
        #[arg(long, env = "DOCKET_CONVERTER", default_value = "wkhtmltopdf --quiet - -")]
        converter: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Pdf)]
        format: Format,

        /// Date used to derive age from birthdate (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

#[derive(Args)]
struct Selection {
    /// Jurisdiction code, e.g. IL; omit for federal processes only
    #[arg(short, long)]
    jurisdiction: Option<String>,

    /// Targets to pursue, e.g. name-change passport
    #[arg(required = true)]
    targets: Vec<Target>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Sheet,
    Pdf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("docket v{}", env!("CARGO_PKG_VERSION"));
    let catalog = load_catalog(&cli.catalog)?;

    match cli.command {
        Commands::Validate => validate(&catalog),
        Commands::Plan { selection } => {
            let plan = plan(&catalog, &selection)?;
            display::print_plan(&plan);
            Ok(())
        }
        Commands::Requirements { selection, roots } => {
            let plan = plan(&catalog, &selection)?;
            let requirements = RequirementResolver::new().resolve(&plan.documents);
            display::print_requirements(&requirements, roots);
            Ok(())
        }
        Commands::Build {
            selection,
            person,
            out,
            templates,
            reference,
            guide,
            converter,
            format,
            today,
        } => {
            check_guide_format(guide.is_some(), format)?;
            let plan = plan(&catalog, &selection)?;
            let person: Person = read_json(&person, "applicant record")?;

            let remote = templates.starts_with("http://") || templates.starts_with("https://");
            let mut projector = if remote {
                FormProjector::new(HttpSource::new(&templates))
            } else {
                FormProjector::new(DirSource::new(&templates))
            };
            if let Some(path) = reference {
                let text = read_text(&path, "reference data")?;
                let reference = ReferenceData::from_json(&text).context("parsing reference data")?;
                projector = projector.with_reference(reference);
            }
            if let Some(path) = guide {
                let template = read_text(&path, "guide template")?;
                let converter =
                    CommandConverter::parse(&converter).context("converter command is empty")?;
                projector = projector.with_guide(TemplateGuide::new(template, converter));
            }
            if let Some(today) = today {
                projector = projector.with_today(today);
            }

            let packet = match format {
                Format::Sheet => projector.project::<SheetDocument>(&person, &plan.documents).await,
                Format::Pdf => projector.project::<PdfDocument>(&person, &plan.documents).await,
            }
            .context("assembling packet")?;

            std::fs::write(&out, &packet.bytes)
                .with_context(|| format!("writing {}", out.display()))?;
            display::print_packet(&packet, &out);
            Ok(())
        }
    }
}

fn validate(catalog: &Catalog) -> Result<()> {
    let problems = catalog.validate();
    display::print_problems(catalog, &problems);
    if !problems.is_empty() {
        bail!("{} configuration problem(s)", problems.len());
    }
    Ok(())
}

/// The converter emits PDF, which only the pdf backend can merge.
fn check_guide_format(guide: bool, format: Format) -> Result<()> {
    if guide && format != Format::Pdf {
        bail!("--guide requires --format pdf");
    }
    Ok(())
}

fn plan(catalog: &Catalog, selection: &Selection) -> Result<Plan> {
    docket_plan::resolve(catalog, selection.jurisdiction.as_deref(), &selection.targets)
        .context("resolving targets")
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    let text = read_text(path, "catalog")?;
    Catalog::from_json(&text).with_context(|| format!("parsing catalog {}", path.display()))
}

fn read_text(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {what} {}", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = read_text(path, what)?;
    serde_json::from_str(&text).with_context(|| format!("parsing {what} {}", path.display()))
}

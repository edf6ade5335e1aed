//! Projection: fill every included document for one applicant and merge the
//! results into a single packet.
//!
//! Templates are fetched and filled concurrently; pages are appended in the
//! order the documents were given, with the generated guide (if any) first.
//! Per-document and per-field failures become [`ProjectionWarning`]s, so a
//! drifted template or an unreachable source never stops the rest of the
//! packet.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use docket_core::{Document, Formfill, Location, Person, Record, ReferenceData};
use futures::future::join_all;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::geometry::{self, CHECK_MARK};
use crate::guide::{GuideContext, GuideRenderer};
use crate::source::TemplateSource;
use crate::{FieldKind, FormDocument, FormError};

/// Something that went wrong for one document or field. The packet is
/// still produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionWarning {
    #[error("{document}: could not fetch template: {error}")]
    FetchFailed { document: String, error: String },

    #[error("{document}: could not load template: {error}")]
    LoadFailed { document: String, error: String },

    #[error("{document}: template has no field {field:?}")]
    MissingField { document: String, field: String },

    #[error("{document}: field {field:?} is a {found} field, expected {expected}")]
    WrongFieldKind {
        document: String,
        field: String,
        expected: FieldKind,
        found: FieldKind,
    },

    #[error("{document}: template has no page {page}")]
    MissingPage { document: String, page: usize },

    #[error("{document}: could not fill {target}: {error}")]
    FillFailed {
        document: String,
        target: String,
        error: String,
    },

    #[error("{document}: could not flatten: {error}")]
    FlattenFailed { document: String, error: String },

    #[error("{document}: could not merge: {error}")]
    MergeFailed { document: String, error: String },

    #[error("guide: {error}")]
    GuideFailed { error: String },
}

/// Guide text of an included document that has no template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoGuide {
    pub document: String,
    pub guide: String,
}

/// The assembled packet.
#[derive(Debug)]
pub struct Packet {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Labels of the page blocks in merge order; `"guide"` for the guide.
    pub included: Vec<String>,
    pub info_guides: Vec<InfoGuide>,
    pub warnings: Vec<ProjectionWarning>,
}

struct Filled<D> {
    document: D,
    warnings: Vec<ProjectionWarning>,
}

pub struct FormProjector {
    source: Box<dyn TemplateSource>,
    guide: Option<Box<dyn GuideRenderer>>,
    reference: ReferenceData,
    today: NaiveDate,
}

impl FormProjector {
    pub fn new(source: impl TemplateSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            guide: None,
            reference: ReferenceData::default(),
            today: Local::now().date_naive(),
        }
    }

    pub fn with_guide(mut self, guide: impl GuideRenderer + 'static) -> Self {
        self.guide = Some(Box::new(guide));
        self
    }

    pub fn with_reference(mut self, reference: ReferenceData) -> Self {
        self.reference = reference;
        self
    }

    /// Date used to derive `age` from `birthdate`.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Build the packet for `person` from `documents`, in order.
    pub async fn project<D: FormDocument>(
        &self,
        person: &Person,
        documents: &[Arc<Document>],
    ) -> Result<Packet, FormError> {
        let person = person.finalized(self.today);
        let value = person.to_value();

        let mut warnings = Vec::new();
        let mut info_guides = Vec::new();
        let mut selected = Vec::new();
        {
            let record = Record::new(&value);
            for document in documents {
                if !document.is_included(&record) {
                    debug!(document = document.label(), "excluded");
                    continue;
                }
                match (&document.filename, &document.guide) {
                    (Some(filename), _) => selected.push((document.as_ref(), filename.as_str())),
                    (None, Some(guide)) => info_guides.push(InfoGuide {
                        document: document.label().to_string(),
                        guide: guide.clone(),
                    }),
                    (None, None) => debug!(document = document.label(), "no template or guide"),
                }
            }
        }

        let labels: Vec<String> = selected
            .iter()
            .map(|(d, _)| d.label().to_string())
            .collect();
        let guide = self.render_guide::<D>(&person, &labels, &info_guides);
        let fills = join_all(
            selected
                .iter()
                .map(|(document, filename)| fill_one::<D>(&*self.source, document, filename, &value)),
        );
        let (guide, filled) = futures::join!(guide, fills);

        let mut packet = D::empty();
        let mut included = Vec::new();
        match guide {
            Some(Ok(doc)) => match packet.append(doc) {
                Ok(()) => included.push("guide".to_string()),
                Err(e) => report(&mut warnings, ProjectionWarning::GuideFailed { error: e.to_string() }),
            },
            Some(Err(w)) => report(&mut warnings, w),
            None => {}
        }
        for (label, result) in labels.into_iter().zip(filled) {
            match result {
                Ok(Filled {
                    document,
                    warnings: field_warnings,
                }) => {
                    warnings.extend(field_warnings);
                    match packet.append(document) {
                        Ok(()) => included.push(label),
                        Err(e) => report(
                            &mut warnings,
                            ProjectionWarning::MergeFailed {
                                document: label,
                                error: e.to_string(),
                            },
                        ),
                    }
                }
                Err(w) => warnings.push(w),
            }
        }

        let page_count = packet.page_count();
        let bytes = packet.to_bytes()?;
        info!(
            documents = included.len(),
            pages = page_count,
            info_guides = info_guides.len(),
            warnings = warnings.len(),
            "assembled packet"
        );
        Ok(Packet {
            bytes,
            page_count,
            included,
            info_guides,
            warnings,
        })
    }

    async fn render_guide<D: FormDocument>(
        &self,
        person: &Person,
        documents: &[String],
        info_guides: &[InfoGuide],
    ) -> Option<Result<D, ProjectionWarning>> {
        let renderer = self.guide.as_ref()?;
        let court = person
            .jurisdiction
            .as_deref()
            .and_then(|j| self.reference.court(j, person.county.as_deref()));
        if court.is_none() {
            debug!(jurisdiction = ?person.jurisdiction, county = ?person.county, "no court reference");
        }
        let context = GuideContext::new(person, court, documents, info_guides);

        let rendered = match renderer.render(&context).await {
            Ok(bytes) => D::load(&bytes).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        Some(rendered.map_err(|error| ProjectionWarning::GuideFailed { error }))
    }
}

fn report(warnings: &mut Vec<ProjectionWarning>, warning: ProjectionWarning) {
    warn!(%warning, "projection warning");
    warnings.push(warning);
}

/// Fetch, load, fill and flatten one document.
async fn fill_one<D: FormDocument>(
    source: &dyn TemplateSource,
    document: &Document,
    filename: &str,
    value: &Value,
) -> Result<Filled<D>, ProjectionWarning> {
    let label = document.label();
    let fail = |warning: ProjectionWarning| {
        warn!(%warning, "projection warning");
        warning
    };

    let bytes = source.fetch(filename).await.map_err(|e| {
        fail(ProjectionWarning::FetchFailed {
            document: label.to_string(),
            error: e.to_string(),
        })
    })?;
    let mut doc = D::load(&bytes).map_err(|e| {
        fail(ProjectionWarning::LoadFailed {
            document: label.to_string(),
            error: e.to_string(),
        })
    })?;

    let record = Record::new(value);
    let mut warnings = Vec::new();
    for fill in document.fills() {
        if let Err(warning) = apply(&mut doc, fill, &record, label) {
            report(&mut warnings, warning);
        }
    }
    doc.flatten().map_err(|e| {
        fail(ProjectionWarning::FlattenFailed {
            document: label.to_string(),
            error: e.to_string(),
        })
    })?;

    debug!(document = label, pages = doc.page_count(), "filled");
    Ok(Filled {
        document: doc,
        warnings,
    })
}

fn apply<D: FormDocument>(
    doc: &mut D,
    fill: &Formfill,
    record: &Record<'_>,
    label: &str,
) -> Result<(), ProjectionWarning> {
    let failed = |e: FormError| ProjectionWarning::FillFailed {
        document: label.to_string(),
        target: fill.target(),
        error: e.to_string(),
    };

    match fill {
        Formfill::TextField { text, field } => {
            expect_kind(doc, field, FieldKind::Text, label)?;
            if let Some(value) = text.eval(record) {
                doc.set_text(field, &value).map_err(failed)?;
            }
        }
        Formfill::CheckField {
            check,
            field,
            select: None,
        } => {
            expect_kind(doc, field, FieldKind::Checkbox, label)?;
            if check.eval(record) {
                doc.set_checked(field).map_err(failed)?;
            }
        }
        Formfill::CheckField {
            check,
            field,
            select: Some(choice),
        } => {
            expect_kind(doc, field, FieldKind::RadioGroup, label)?;
            if check.eval(record) {
                doc.select(field, choice).map_err(failed)?;
            }
        }
        Formfill::TextAt { text, loc } => {
            if let Some(value) = text.eval(record) {
                draw(doc, loc, &value, label).map_err(|w| w.or_fill(failed))?;
            }
        }
        Formfill::CheckAt { check, loc } => {
            if check.eval(record) {
                draw(doc, loc, CHECK_MARK, label).map_err(|w| w.or_fill(failed))?;
            }
        }
    }
    Ok(())
}

fn expect_kind<D: FormDocument>(
    doc: &D,
    field: &str,
    expected: FieldKind,
    label: &str,
) -> Result<(), ProjectionWarning> {
    match doc.field_kind(field) {
        None => Err(ProjectionWarning::MissingField {
            document: label.to_string(),
            field: field.to_string(),
        }),
        Some(found) if found != expected => Err(ProjectionWarning::WrongFieldKind {
            document: label.to_string(),
            field: field.to_string(),
            expected,
            found,
        }),
        Some(_) => Ok(()),
    }
}

enum DrawError {
    MissingPage(ProjectionWarning),
    Backend(FormError),
}

impl DrawError {
    fn or_fill(self, failed: impl FnOnce(FormError) -> ProjectionWarning) -> ProjectionWarning {
        match self {
            DrawError::MissingPage(warning) => warning,
            DrawError::Backend(e) => failed(e),
        }
    }
}

fn draw<D: FormDocument>(
    doc: &mut D,
    loc: &Location,
    text: &str,
    label: &str,
) -> Result<(), DrawError> {
    let height = doc.page_height(loc.page).ok_or_else(|| {
        DrawError::MissingPage(ProjectionWarning::MissingPage {
            document: label.to_string(),
            page: loc.page,
        })
    })?;
    let placement = geometry::place(loc, height);
    doc.draw_text(loc.page, placement.x, placement.y, loc.font_size, text)
        .map_err(DrawError::Backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::{SheetDocument, Widget};
    use crate::{GuideError, MemorySource};
    use async_trait::async_trait;
    use docket_core::{Rule, Text};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn template() -> Vec<u8> {
        let sheet = SheetDocument::blank(1)
            .with_field("Name", 0, Widget::Text { value: None })
            .with_field("Minor", 0, Widget::Checkbox { checked: false })
            .with_field(
                "Sex",
                0,
                Widget::Radio {
                    options: vec!["F".into(), "M".into(), "X".into()],
                    selected: None,
                },
            );
        sheet.to_bytes().unwrap()
    }

    fn projector() -> FormProjector {
        FormProjector::new(MemorySource::new().with("form.json", template())).with_today(today())
    }

    async fn project(documents: Vec<Document>, person: &Person) -> (Packet, SheetDocument) {
        let documents: Vec<_> = documents.into_iter().map(Arc::new).collect();
        let packet = projector()
            .project::<SheetDocument>(person, &documents)
            .await
            .unwrap();
        let sheet = SheetDocument::load(&packet.bytes).unwrap();
        (packet, sheet)
    }

    #[tokio::test]
    async fn fills_every_formfill_kind() {
        let document = Document::new("Form").with_filename("form.json").with_map(vec![
            Formfill::text_field(Text::name("legalName"), "Name"),
            Formfill::check_field(Rule::below("age", 18.0), "Minor"),
            Formfill::select_field(Rule::equals("genderMarker", "X"), "Sex", "X"),
            Formfill::text_at(Text::field("county"), Location::new(100.0, 100.0)),
            Formfill::check_at(Rule::flag("parentsConsent"), Location::new(50.0, 50.0)),
        ]);
        let (packet, sheet) = project(vec![document], &Person::sample()).await;
        assert!(packet.warnings.is_empty(), "{:?}", packet.warnings);
        assert_eq!(packet.included, vec!["Form"]);
        assert!(sheet.fields.is_empty());

        let text = sheet.text();
        assert!(text.contains(&"Alex Jordan Rivera Jr"));
        assert!(text.contains(&"Sangamon"));
        assert!(text.contains(&"X"));
        // adult: the checkbox stays unchecked and draws nothing
        assert_eq!(text.len(), 4);

        let county = sheet.runs(0).iter().find(|r| r.text == "Sangamon").unwrap();
        let scale = 792.0 / 11.0 / 100.0;
        assert!((county.x - 100.0 * scale).abs() < 1e-3);
        assert!((county.y - (792.0 - 100.0 * scale - 12.0)).abs() < 1e-3);
    }

    #[tokio::test]
    async fn template_drift_warns_and_continues() {
        let document = Document::new("Form").with_filename("form.json").with_map(vec![
            Formfill::text_field(Text::literal("x"), "Renamed"),
            Formfill::text_field(Text::literal("x"), "Minor"),
            Formfill::select_field(Rule::Always, "Sex", "Q"),
            Formfill::text_at(Text::literal("x"), Location::new(1.0, 1.0).on_page(3)),
            Formfill::text_field(Text::field("phone"), "Name"),
        ]);
        let (packet, sheet) = project(vec![document], &Person::sample()).await;

        assert_eq!(packet.included, vec!["Form"]);
        assert_eq!(packet.warnings.len(), 4);
        assert!(matches!(
            &packet.warnings[0],
            ProjectionWarning::MissingField { field, .. } if field == "Renamed"
        ));
        assert!(matches!(
            &packet.warnings[1],
            ProjectionWarning::WrongFieldKind { found: FieldKind::Checkbox, .. }
        ));
        assert!(matches!(&packet.warnings[2], ProjectionWarning::FillFailed { .. }));
        assert!(matches!(
            &packet.warnings[3],
            ProjectionWarning::MissingPage { page: 3, .. }
        ));
        assert_eq!(sheet.text(), vec!["555-0100"]);
    }

    #[tokio::test]
    async fn missing_template_drops_only_that_document() {
        let documents = vec![
            Document::new("Gone").with_filename("gone.json").with_map(vec![]),
            Document::new("Form").with_filename("form.json").with_map(vec![]),
        ];
        let (packet, sheet) = project(documents, &Person::sample()).await;

        assert_eq!(packet.included, vec!["Form"]);
        assert_eq!(sheet.page_count(), 1);
        assert!(matches!(
            &packet.warnings[..],
            [ProjectionWarning::FetchFailed { document, .. }] if document == "Gone"
        ));
    }

    #[tokio::test]
    async fn unloadable_template_warns() {
        let source = MemorySource::new().with("bad.json", "not json");
        let documents = vec![Arc::new(
            Document::new("Bad").with_filename("bad.json").with_map(vec![]),
        )];
        let packet = FormProjector::new(source)
            .project::<SheetDocument>(&Person::sample(), &documents)
            .await
            .unwrap();
        assert_eq!(packet.page_count, 0);
        assert!(matches!(
            &packet.warnings[..],
            [ProjectionWarning::LoadFailed { .. }]
        ));
    }

    #[tokio::test]
    async fn guide_only_documents_become_info_guides() {
        let documents = vec![
            Document::new("Publication")
                .with_guide("Publish notice in a local paper.")
                .with_include(Rule::Always),
            Document::new("Unmapped").with_guide("no include, no map"),
            Document::new("Hidden")
                .with_guide("never shown")
                .with_include(Rule::Never),
        ];
        let (packet, _) = project(documents, &Person::sample()).await;
        assert!(packet.included.is_empty());
        assert_eq!(
            packet.info_guides,
            vec![InfoGuide {
                document: "Publication".into(),
                guide: "Publish notice in a local paper.".into(),
            }]
        );
    }

    #[tokio::test]
    async fn packet_with_nothing_included_reloads() {
        let documents = vec![
            Document::new("Hidden")
                .with_filename("form.json")
                .with_include(Rule::Never)
                .with_map(vec![]),
        ];
        let (packet, sheet) = project(documents, &Person::sample()).await;
        assert!(packet.included.is_empty());
        assert!(packet.warnings.is_empty());
        assert_eq!(packet.page_count, 0);
        assert_eq!(sheet.page_count(), 0);
    }

    /// Renders a one-page sheet naming the documents it was given.
    struct SheetGuide;

    #[async_trait]
    impl GuideRenderer for SheetGuide {
        async fn render(&self, context: &GuideContext) -> Result<Vec<u8>, GuideError> {
            let mut sheet = SheetDocument::blank(1);
            sheet
                .draw_text(0, 0.0, 0.0, 10.0, "GUIDE")
                .map_err(|e| GuideError::Convert(e.to_string()))?;
            let documents = context.get("documents").map(Value::to_string).unwrap_or_default();
            sheet
                .draw_text(0, 0.0, 20.0, 10.0, &documents)
                .map_err(|e| GuideError::Convert(e.to_string()))?;
            sheet.to_bytes().map_err(|e| GuideError::Convert(e.to_string()))
        }
    }

    struct BrokenGuide;

    #[async_trait]
    impl GuideRenderer for BrokenGuide {
        async fn render(&self, _: &GuideContext) -> Result<Vec<u8>, GuideError> {
            Err(GuideError::Convert("converter exited with status 1".into()))
        }
    }

    fn marked(mark: &str) -> Vec<u8> {
        let mut sheet = SheetDocument::blank(1);
        sheet.draw_text(0, 0.0, 0.0, 8.0, mark).unwrap();
        sheet.to_bytes().unwrap()
    }

    fn two_documents() -> Vec<Arc<Document>> {
        ["a", "b"]
            .into_iter()
            .map(|name| Arc::new(Document::new(name).with_filename(name).with_map(vec![])))
            .collect()
    }

    fn marked_source() -> MemorySource {
        MemorySource::new().with("a", marked("A")).with("b", marked("B"))
    }

    #[tokio::test]
    async fn guide_is_the_first_page_block() {
        let packet = FormProjector::new(marked_source())
            .with_guide(SheetGuide)
            .with_today(today())
            .project::<SheetDocument>(&Person::sample(), &two_documents())
            .await
            .unwrap();

        assert!(packet.warnings.is_empty(), "{:?}", packet.warnings);
        assert_eq!(packet.included, vec!["guide", "a", "b"]);
        assert_eq!(packet.page_count, 3);
        let sheet = SheetDocument::load(&packet.bytes).unwrap();
        let first: Vec<&str> = (0..3).map(|p| sheet.runs(p)[0].text.as_str()).collect();
        assert_eq!(first, vec!["GUIDE", "A", "B"]);
        assert_eq!(sheet.runs(0)[1].text, r#"["a","b"]"#);
    }

    #[tokio::test]
    async fn failed_guide_keeps_document_pages() {
        let packet = FormProjector::new(marked_source())
            .with_guide(BrokenGuide)
            .with_today(today())
            .project::<SheetDocument>(&Person::sample(), &two_documents())
            .await
            .unwrap();

        assert_eq!(packet.included, vec!["a", "b"]);
        assert!(matches!(
            &packet.warnings[..],
            [ProjectionWarning::GuideFailed { error }] if error.contains("status 1")
        ));
        let sheet = SheetDocument::load(&packet.bytes).unwrap();
        assert_eq!(sheet.page_count(), 2);
        assert_eq!(sheet.runs(0)[0].text, "A");
    }

    #[tokio::test]
    async fn age_is_derived_before_projection() {
        let document = Document::new("Minor form")
            .with_filename("form.json")
            .with_include(Rule::below("age", 18.0))
            .with_map(vec![]);
        let person = Person {
            birthdate: NaiveDate::from_ymd_opt(2012, 1, 1),
            ..Default::default()
        };
        let (packet, _) = project(vec![document], &person).await;
        assert_eq!(packet.included, vec!["Minor form"]);
    }
}

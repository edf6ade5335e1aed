//! AcroForm PDFs through lopdf.
//!
//! Fields are indexed by fully qualified name when a document is loaded.
//! Flattening draws each value into its widget rectangle with Helvetica,
//! then removes the widget annotations and the AcroForm dictionary.
//! Appending grafts the other document's page tree under this one's root.

use std::collections::{BTreeMap, HashSet};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::debug;

use crate::{FieldKind, FormDocument, FormError};

/// Resource name of the font used for drawn text.
const FONT_NAME: &str = "DocketHelv";
const FIELD_FONT_SIZE: f32 = 10.0;
/// Guard against cyclic field and page trees.
const MAX_DEPTH: usize = 32;

const FF_RADIO: i64 = 1 << 15;
const FF_PUSHBUTTON: i64 = 1 << 16;

#[derive(Debug, Clone)]
struct PdfField {
    name: String,
    id: ObjectId,
    kind: FieldKind,
    widgets: Vec<ObjectId>,
}

#[derive(Debug, Clone)]
pub struct PdfDocument {
    doc: lopdf::Document,
    fields: Vec<PdfField>,
    font: Option<ObjectId>,
}

impl PdfDocument {
    pub fn inner(&self) -> &lopdf::Document {
        &self.doc
    }

    /// Fully qualified names of every fillable field.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Current value of a text field.
    pub fn text_value(&self, name: &str) -> Option<String> {
        self.text_value_of(self.field(name)?.id)
    }

    fn field(&self, name: &str) -> Option<&PdfField> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn typed_field(&self, name: &str, expected: FieldKind) -> Result<PdfField, FormError> {
        let field = self
            .field(name)
            .ok_or_else(|| FormError::FieldNotFound(name.to_string()))?;
        if field.kind != expected {
            return Err(FormError::WrongFieldKind {
                field: name.to_string(),
                expected,
                found: field.kind,
            });
        }
        Ok(field.clone())
    }

    fn dict(&self, id: ObjectId) -> Result<&Dictionary, FormError> {
        Ok(self.doc.get_object(id)?.as_dict()?)
    }

    fn dict_mut(&mut self, id: ObjectId) -> Result<&mut Dictionary, FormError> {
        Ok(self.doc.get_object_mut(id)?.as_dict_mut()?)
    }

    fn catalog_id(&self) -> Result<ObjectId, FormError> {
        Ok(self.doc.trailer.get(b"Root")?.as_reference()?)
    }

    fn pages_root(&self) -> Result<ObjectId, FormError> {
        Ok(self.dict(self.catalog_id()?)?.get(b"Pages")?.as_reference()?)
    }

    fn page_id(&self, page: usize) -> Result<ObjectId, FormError> {
        self.doc
            .get_pages()
            .get(&(page as u32 + 1))
            .copied()
            .ok_or(FormError::PageOutOfRange(page))
    }

    fn ensure_font(&mut self, page_id: ObjectId) -> Result<(), FormError> {
        let font_id = match self.font {
            Some(id) => id,
            None => {
                let id = self.doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Helvetica",
                    "Encoding" => "WinAnsiEncoding",
                });
                self.font = Some(id);
                id
            }
        };

        let mut resources = inherited(&self.doc, page_id, b"Resources")
            .and_then(|o| o.as_dict().ok())
            .cloned()
            .unwrap_or_default();
        let mut fonts = resources
            .get(b"Font")
            .ok()
            .and_then(|o| resolve(&self.doc, o))
            .and_then(|o| o.as_dict().ok())
            .cloned()
            .unwrap_or_default();
        fonts.set(FONT_NAME, font_id);
        resources.set("Font", fonts);
        self.dict_mut(page_id)?.set("Resources", resources);
        Ok(())
    }

    fn push_content(&mut self, page_id: ObjectId, content: Vec<u8>) -> Result<(), FormError> {
        let mut contents = match self.dict(page_id)?.get(b"Contents") {
            Ok(obj @ Object::Reference(_)) => match resolve(&self.doc, obj) {
                Some(Object::Array(items)) => items.clone(),
                _ => vec![obj.clone()],
            },
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        let stream_id = self.doc.add_object(Stream::new(Dictionary::new(), content));
        contents.push(stream_id.into());
        self.dict_mut(page_id)?.set("Contents", contents);
        Ok(())
    }

    /// Which page a widget sits on: its `/P` entry, else the page whose
    /// `/Annots` lists it.
    fn widget_page(&self, widget: ObjectId, pages: &BTreeMap<u32, ObjectId>) -> Option<usize> {
        let index = |id: ObjectId| pages.values().position(|p| *p == id);
        if let Ok(page) = self.dict(widget).ok()?.get(b"P").and_then(Object::as_reference)
            && let Some(i) = index(page)
        {
            return Some(i);
        }
        pages
            .values()
            .position(|page| annots(&self.doc, *page).contains(&widget))
    }

    fn strip_widgets(&mut self, page_id: ObjectId, widgets: &HashSet<ObjectId>) -> Result<(), FormError> {
        let current = annots(&self.doc, page_id);
        if !current.iter().any(|a| widgets.contains(a)) {
            return Ok(());
        }
        let kept: Vec<Object> = current
            .into_iter()
            .filter(|a| !widgets.contains(a))
            .map(Object::from)
            .collect();
        let page = self.dict_mut(page_id)?;
        if kept.is_empty() {
            page.remove(b"Annots");
        } else {
            page.set("Annots", kept);
        }
        Ok(())
    }
}

impl FormDocument for PdfDocument {
    fn load(bytes: &[u8]) -> Result<Self, FormError> {
        let doc = lopdf::Document::load_mem(bytes)?;
        let fields = scan_fields(&doc);
        debug!(pages = doc.get_pages().len(), fields = fields.len(), "loaded pdf");
        Ok(Self {
            doc,
            fields,
            font: None,
        })
    }

    fn empty() -> Self {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        Self {
            doc,
            fields: Vec::new(),
            font: None,
        }
    }

    fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    fn page_height(&self, page: usize) -> Option<f32> {
        let id = self.page_id(page).ok()?;
        let media_box = inherited(&self.doc, id, b"MediaBox")?.as_array().ok()?;
        match media_box.as_slice() {
            [_, y0, _, y1] => Some(number(y1)? - number(y0)?),
            _ => None,
        }
    }

    fn field_kind(&self, name: &str) -> Option<FieldKind> {
        self.field(name).map(|f| f.kind)
    }

    fn set_text(&mut self, name: &str, value: &str) -> Result<(), FormError> {
        let field = self.typed_field(name, FieldKind::Text)?;
        self.dict_mut(field.id)?.set("V", encode_text(value));
        Ok(())
    }

    fn set_checked(&mut self, name: &str) -> Result<(), FormError> {
        let field = self.typed_field(name, FieldKind::Checkbox)?;
        let on = field
            .widgets
            .iter()
            .find_map(|w| on_state(&self.doc, *w))
            .unwrap_or_else(|| b"Yes".to_vec());
        self.dict_mut(field.id)?.set("V", Object::Name(on.clone()));
        for widget in &field.widgets {
            self.dict_mut(*widget)?.set("AS", Object::Name(on.clone()));
        }
        Ok(())
    }

    fn select(&mut self, name: &str, choice: &str) -> Result<(), FormError> {
        let field = self.typed_field(name, FieldKind::RadioGroup)?;
        let states: Vec<(ObjectId, Option<Vec<u8>>)> = field
            .widgets
            .iter()
            .map(|w| (*w, on_state(&self.doc, *w)))
            .collect();
        if !states.iter().any(|(_, s)| s.as_deref() == Some(choice.as_bytes())) {
            return Err(FormError::UnknownChoice {
                field: name.to_string(),
                choice: choice.to_string(),
            });
        }
        self.dict_mut(field.id)?
            .set("V", Object::Name(choice.as_bytes().to_vec()));
        for (widget, state) in states {
            let appearance = match state {
                Some(s) if s == choice.as_bytes() => s,
                _ => b"Off".to_vec(),
            };
            self.dict_mut(widget)?.set("AS", Object::Name(appearance));
        }
        Ok(())
    }

    fn draw_text(
        &mut self,
        page: usize,
        x: f32,
        y: f32,
        font_size: f32,
        text: &str,
    ) -> Result<(), FormError> {
        let page_id = self.page_id(page)?;
        self.ensure_font(page_id)?;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![FONT_NAME.into(), font_size.into()]),
                Operation::new("Td", vec![x.into(), y.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(win_ansi(text), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ],
        };
        self.push_content(page_id, content.encode()?)
    }

    fn flatten(&mut self) -> Result<(), FormError> {
        let fields = std::mem::take(&mut self.fields);
        let pages = self.doc.get_pages();

        let mut draws = Vec::new();
        let mut widgets = HashSet::new();
        for field in &fields {
            let value = match field.kind {
                FieldKind::Text => self.text_value_of(field.id),
                FieldKind::Checkbox | FieldKind::RadioGroup => None,
            };
            for widget in &field.widgets {
                widgets.insert(*widget);
                let text = match field.kind {
                    FieldKind::Text => value.clone(),
                    FieldKind::Checkbox | FieldKind::RadioGroup => {
                        is_on(&self.doc, *widget).then(|| "X".to_string())
                    }
                };
                let (Some(text), Some(rect), Some(page)) = (
                    text,
                    widget_rect(&self.doc, *widget),
                    self.widget_page(*widget, &pages),
                ) else {
                    continue;
                };
                let [x0, y0, _, y1] = rect;
                let height = y1 - y0;
                let size = FIELD_FONT_SIZE.min((height * 0.8).max(1.0));
                draws.push((page, x0 + 2.0, y0 + (height - size).max(0.0) / 2.0, size, text));
            }
        }

        for (page, x, y, size, text) in draws {
            self.draw_text(page, x, y, size, &text)?;
        }
        for page_id in pages.values() {
            self.strip_widgets(*page_id, &widgets)?;
        }
        let catalog_id = self.catalog_id()?;
        self.dict_mut(catalog_id)?.remove(b"AcroForm");
        self.doc.prune_objects();
        debug!(fields = fields.len(), "flattened pdf");
        Ok(())
    }

    fn append(&mut self, other: Self) -> Result<(), FormError> {
        let mut other = other.doc;
        other.renumber_objects_with(self.doc.max_id + 1);
        let other_catalog = other.trailer.get(b"Root")?.as_reference()?;
        let other_root = other
            .get_object(other_catalog)?
            .as_dict()?
            .get(b"Pages")?
            .as_reference()?;
        let added = other.get_pages().len() as i64;
        self.doc.max_id = self.doc.max_id.max(other.max_id);

        for (id, object) in other.objects {
            if id != other_catalog {
                self.doc.objects.insert(id, object);
            }
        }

        let root = self.pages_root()?;
        self.dict_mut(other_root)?.set("Parent", root);
        let pages = self.dict_mut(root)?;
        let mut kids = pages
            .get(b"Kids")
            .and_then(Object::as_array)
            .cloned()
            .unwrap_or_default();
        kids.push(other_root.into());
        let count = pages.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
        pages.set("Kids", kids);
        pages.set("Count", count + added);

        self.fields = scan_fields(&self.doc);
        Ok(())
    }

    fn to_bytes(&self) -> Result<Vec<u8>, FormError> {
        let mut doc = self.doc.clone();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

impl PdfDocument {
    fn text_value_of(&self, id: ObjectId) -> Option<String> {
        match self.dict(id).ok()?.get(b"V").ok()? {
            Object::String(bytes, _) => Some(decode_text(bytes)).filter(|s| !s.is_empty()),
            _ => None,
        }
    }
}

// ── Object helpers ──

fn resolve<'a>(doc: &'a lopdf::Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// A page attribute, following `/Parent` for inheritable keys.
fn inherited<'a>(doc: &'a lopdf::Document, page: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_object(page).and_then(Object::as_dict).ok()?;
    for _ in 0..MAX_DEPTH {
        if let Ok(value) = current.get(key) {
            return resolve(doc, value);
        }
        let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_object(parent).and_then(Object::as_dict).ok()?;
    }
    None
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn annots(doc: &lopdf::Document, page: ObjectId) -> Vec<ObjectId> {
    doc.get_object(page)
        .and_then(Object::as_dict)
        .ok()
        .and_then(|d| d.get(b"Annots").ok())
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .map(|items| items.iter().filter_map(|o| o.as_reference().ok()).collect())
        .unwrap_or_default()
}

fn widget_rect(doc: &lopdf::Document, widget: ObjectId) -> Option<[f32; 4]> {
    let dict = doc.get_object(widget).and_then(Object::as_dict).ok()?;
    let rect = resolve(doc, dict.get(b"Rect").ok()?)?.as_array().ok()?;
    match rect.as_slice() {
        [a, b, c, d] => {
            let (x0, y0, x1, y1) = (number(a)?, number(b)?, number(c)?, number(d)?);
            Some([x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)])
        }
        _ => None,
    }
}

/// The appearance state a checkbox or radio widget shows when on.
fn on_state(doc: &lopdf::Document, widget: ObjectId) -> Option<Vec<u8>> {
    let dict = doc.get_object(widget).and_then(Object::as_dict).ok()?;
    let ap = resolve(doc, dict.get(b"AP").ok()?)?.as_dict().ok()?;
    let normal = resolve(doc, ap.get(b"N").ok()?)?.as_dict().ok()?;
    normal
        .iter()
        .map(|(key, _)| key)
        .find(|key| key.as_slice() != b"Off")
        .cloned()
}

fn is_on(doc: &lopdf::Document, widget: ObjectId) -> bool {
    doc.get_object(widget)
        .and_then(Object::as_dict)
        .and_then(|d| d.get(b"AS"))
        .is_ok_and(|state| matches!(state, Object::Name(name) if name.as_slice() != b"Off"))
}

// ── Field tree ──

fn scan_fields(doc: &lopdf::Document) -> Vec<PdfField> {
    let roots: Vec<ObjectId> = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .and_then(|id| doc.get_object(id))
        .and_then(Object::as_dict)
        .ok()
        .and_then(|catalog| catalog.get(b"AcroForm").ok())
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
        .and_then(|form| form.get(b"Fields").ok())
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .map(|items| items.iter().filter_map(|o| o.as_reference().ok()).collect())
        .unwrap_or_default();

    let mut fields = Vec::new();
    let mut seen = HashSet::new();
    for root in roots {
        walk(doc, root, &Inherited::default(), &mut fields, &mut seen, 0);
    }
    fields
}

#[derive(Default, Clone)]
struct Inherited {
    name: Option<String>,
    field_type: Option<Vec<u8>>,
    flags: i64,
}

fn walk(
    doc: &lopdf::Document,
    id: ObjectId,
    parent: &Inherited,
    out: &mut Vec<PdfField>,
    seen: &mut HashSet<ObjectId>,
    depth: usize,
) {
    if depth > MAX_DEPTH || !seen.insert(id) {
        return;
    }
    let Ok(dict) = doc.get_object(id).and_then(Object::as_dict) else {
        return;
    };

    let partial = match dict.get(b"T") {
        Ok(Object::String(bytes, _)) => Some(decode_text(bytes)),
        _ => None,
    };
    let here = Inherited {
        name: match (&parent.name, partial) {
            (Some(p), Some(t)) => Some(format!("{p}.{t}")),
            (None, t) => t,
            (p, None) => p.clone(),
        },
        field_type: match dict.get(b"FT") {
            Ok(Object::Name(ft)) => Some(ft.clone()),
            _ => parent.field_type.clone(),
        },
        flags: dict.get(b"Ff").and_then(Object::as_i64).unwrap_or(parent.flags),
    };

    let kids: Vec<ObjectId> = dict
        .get(b"Kids")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .map(|items| items.iter().filter_map(|o| o.as_reference().ok()).collect())
        .unwrap_or_default();
    let (named, widgets): (Vec<ObjectId>, Vec<ObjectId>) = kids.into_iter().partition(|kid| {
        doc.get_object(*kid)
            .and_then(Object::as_dict)
            .is_ok_and(|d| d.has(b"T"))
    });

    for kid in named {
        walk(doc, kid, &here, out, seen, depth + 1);
    }
    if !widgets.is_empty() || dict.has(b"Rect") {
        let Some(name) = here.name else { return };
        let Some(kind) = kind_of(here.field_type.as_deref(), here.flags) else {
            return;
        };
        let widgets = if widgets.is_empty() { vec![id] } else { widgets };
        out.push(PdfField {
            name,
            id,
            kind,
            widgets,
        });
    }
}

fn kind_of(field_type: Option<&[u8]>, flags: i64) -> Option<FieldKind> {
    match field_type? {
        b"Tx" | b"Ch" => Some(FieldKind::Text),
        b"Btn" if flags & FF_PUSHBUTTON != 0 => None,
        b"Btn" if flags & FF_RADIO != 0 => Some(FieldKind::RadioGroup),
        b"Btn" => Some(FieldKind::Checkbox),
        _ => None,
    }
}

// ── Text encoding ──

/// PDF text string: UTF-16BE with a byte-order mark, or PDFDocEncoding
/// (treated as Latin-1).
fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn encode_text(text: &str) -> Object {
    let bytes = if text.chars().all(|c| (c as u32) < 0x80) {
        text.as_bytes().to_vec()
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        bytes
    };
    Object::String(bytes, StringFormat::Literal)
}

/// Bytes for a WinAnsi-encoded simple font. Characters outside Latin-1
/// become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(c as u32).unwrap_or(b'?'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appearance(doc: &mut lopdf::Document, on: &str) -> Object {
        let on_stream = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
        let off_stream = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
        let mut normal = Dictionary::new();
        normal.set(on, on_stream);
        normal.set("Off", off_stream);
        dictionary! { "N" => normal }.into()
    }

    /// One letter page carrying a text field, a checkbox and a radio group
    /// nested under a parent field.
    fn template() -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.new_object_id();

        let name = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Tx",
            "T" => Object::string_literal("Name"),
            "Rect" => vec![100.into(), 700.into(), 300.into(), 720.into()],
            "P" => page_id,
        });
        let minor_ap = appearance(&mut doc, "Yes");
        let minor = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Btn",
            "T" => Object::string_literal("Minor"),
            "Rect" => vec![100.into(), 650.into(), 112.into(), 662.into()],
            "AP" => minor_ap,
            "AS" => "Off",
        });
        let female_ap = appearance(&mut doc, "F");
        let male_ap = appearance(&mut doc, "M");
        let female = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Rect" => vec![100.into(), 600.into(), 112.into(), 612.into()],
            "AP" => female_ap,
            "P" => page_id,
        });
        let male = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Rect" => vec![150.into(), 600.into(), 162.into(), 612.into()],
            "AP" => male_ap,
            "P" => page_id,
        });
        let sex = doc.add_object(dictionary! {
            "FT" => "Btn",
            "Ff" => FF_RADIO,
            "T" => Object::string_literal("Sex"),
            "Kids" => vec![female.into(), male.into()],
        });
        let applicant = doc.add_object(dictionary! {
            "T" => Object::string_literal("Applicant"),
            "Kids" => vec![sex.into()],
        });

        doc.objects.insert(
            page_id,
            dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Annots" => vec![name.into(), minor.into(), female.into(), male.into()],
            }
            .into(),
        );
        doc.objects.insert(
            pages_id,
            dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }
            .into(),
        );
        let acroform = dictionary! {
            "Fields" => vec![name.into(), minor.into(), applicant.into()],
        };
        let catalog = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "AcroForm" => acroform,
        });
        doc.trailer.set("Root", catalog);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn page_text(pdf: &PdfDocument, page: usize) -> String {
        let id = pdf.page_id(page).unwrap();
        String::from_utf8_lossy(&pdf.inner().get_page_content(id).unwrap()).into_owned()
    }

    #[test]
    fn indexes_fields_by_qualified_name() {
        let pdf = PdfDocument::load(&template()).unwrap();
        assert_eq!(pdf.field_names(), vec!["Name", "Minor", "Applicant.Sex"]);
        assert_eq!(pdf.field_kind("Name"), Some(FieldKind::Text));
        assert_eq!(pdf.field_kind("Minor"), Some(FieldKind::Checkbox));
        assert_eq!(pdf.field_kind("Applicant.Sex"), Some(FieldKind::RadioGroup));
        assert_eq!(pdf.page_count(), 1);
        assert_eq!(pdf.page_height(0), Some(792.0));
    }

    #[test]
    fn fills_and_flattens() {
        let mut pdf = PdfDocument::load(&template()).unwrap();
        pdf.set_text("Name", "Alex Rivera").unwrap();
        pdf.set_checked("Minor").unwrap();
        pdf.select("Applicant.Sex", "M").unwrap();
        assert_eq!(pdf.text_value("Name").as_deref(), Some("Alex Rivera"));
        assert!(matches!(
            pdf.select("Applicant.Sex", "Q"),
            Err(FormError::UnknownChoice { .. })
        ));

        pdf.flatten().unwrap();
        assert!(pdf.field_names().is_empty());
        let catalog = pdf.dict(pdf.catalog_id().unwrap()).unwrap();
        assert!(!catalog.has(b"AcroForm"));
        let page = pdf.page_id(0).unwrap();
        assert!(annots(pdf.inner(), page).is_empty());

        let content = page_text(&pdf, 0);
        assert!(content.contains("(Alex Rivera)"));
        // checkbox and the selected radio button
        assert_eq!(content.matches("(X)").count(), 2);
    }

    #[test]
    fn draws_text_at_position() {
        let mut pdf = PdfDocument::load(&template()).unwrap();
        pdf.draw_text(0, 72.0, 500.0, 12.0, "Sangamon").unwrap();
        let content = page_text(&pdf, 0);
        assert!(content.contains("(Sangamon)"));
        assert!(content.contains(FONT_NAME));
        assert!(matches!(
            pdf.draw_text(5, 0.0, 0.0, 12.0, "x"),
            Err(FormError::PageOutOfRange(5))
        ));
    }

    #[test]
    fn append_concatenates_pages() {
        let mut packet = PdfDocument::empty();
        assert_eq!(packet.page_count(), 0);
        for _ in 0..2 {
            let mut form = PdfDocument::load(&template()).unwrap();
            form.flatten().unwrap();
            packet.append(form).unwrap();
        }
        assert_eq!(packet.page_count(), 2);

        let reloaded = PdfDocument::load(&packet.to_bytes().unwrap()).unwrap();
        assert_eq!(reloaded.page_count(), 2);
        assert_eq!(reloaded.page_height(1), Some(792.0));
    }

    #[test]
    fn text_strings_round_trip_utf16() {
        let Object::String(bytes, _) = encode_text("Zoë") else {
            panic!("not a string");
        };
        assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
        assert_eq!(decode_text(&bytes), "Zoë");
        assert_eq!(win_ansi("Zoë→"), vec![b'Z', b'o', 0xEB, b'?']);
    }
}

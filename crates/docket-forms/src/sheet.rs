//! A JSON-serialized form model: pages with drawn text runs and typed
//! fields. Dry runs and tests project onto sheets instead of PDFs.

use serde::{Deserialize, Serialize};

use crate::{FieldKind, FormDocument, FormError};

/// US Letter in points.
pub const LETTER_WIDTH: f32 = 612.0;
pub const LETTER_HEIGHT: f32 = 792.0;

const FIELD_FONT_SIZE: f32 = 10.0;

fn letter_width() -> f32 {
    LETTER_WIDTH
}

fn letter_height() -> f32 {
    LETTER_HEIGHT
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetDocument {
    pub pages: Vec<SheetPage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SheetField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetPage {
    #[serde(default = "letter_width")]
    pub width: f32,
    #[serde(default = "letter_height")]
    pub height: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runs: Vec<TextRun>,
}

impl Default for SheetPage {
    fn default() -> Self {
        Self {
            width: LETTER_WIDTH,
            height: LETTER_HEIGHT,
            runs: Vec::new(),
        }
    }
}

/// Text placed on a page, baseline origin, bottom-left coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetField {
    pub name: String,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub rect: Rect,
    #[serde(flatten)]
    pub widget: Widget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Widget {
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    Checkbox {
        #[serde(default)]
        checked: bool,
    },
    Radio {
        options: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selected: Option<String>,
    },
}

impl Widget {
    fn kind(&self) -> FieldKind {
        match self {
            Widget::Text { .. } => FieldKind::Text,
            Widget::Checkbox { .. } => FieldKind::Checkbox,
            Widget::Radio { .. } => FieldKind::RadioGroup,
        }
    }

    /// What flattening draws for this widget, if anything.
    fn rendered(&self) -> Option<&str> {
        match self {
            Widget::Text { value } => value.as_deref().filter(|v| !v.is_empty()),
            Widget::Checkbox { checked: true } => Some("X"),
            Widget::Checkbox { checked: false } => None,
            Widget::Radio { selected, .. } => selected.as_deref(),
        }
    }
}

impl SheetDocument {
    /// `pages` blank letter-size pages and no fields.
    pub fn blank(pages: usize) -> Self {
        Self {
            pages: vec![SheetPage::default(); pages],
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: &str, page: usize, widget: Widget) -> Self {
        self.fields.push(SheetField {
            name: name.to_string(),
            page,
            rect: Rect::default(),
            widget,
        });
        self
    }

    pub fn field(&self, name: &str) -> Option<&SheetField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Every run on `page`, in drawing order.
    pub fn runs(&self, page: usize) -> &[TextRun] {
        self.pages.get(page).map(|p| p.runs.as_slice()).unwrap_or_default()
    }

    /// Every drawn string across all pages.
    pub fn text(&self) -> Vec<&str> {
        self.pages
            .iter()
            .flat_map(|p| p.runs.iter().map(|r| r.text.as_str()))
            .collect()
    }

    fn widget_mut(&mut self, name: &str, expected: FieldKind) -> Result<&mut Widget, FormError> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| FormError::FieldNotFound(name.to_string()))?;
        let found = field.widget.kind();
        if found != expected {
            return Err(FormError::WrongFieldKind {
                field: name.to_string(),
                expected,
                found,
            });
        }
        Ok(&mut field.widget)
    }
}

impl FormDocument for SheetDocument {
    fn load(bytes: &[u8]) -> Result<Self, FormError> {
        let sheet: SheetDocument = serde_json::from_slice(bytes)?;
        if let Some(field) = sheet.fields.iter().find(|f| f.page >= sheet.pages.len()) {
            return Err(FormError::Malformed(format!(
                "field {:?} is on page {} of {}",
                field.name,
                field.page,
                sheet.pages.len()
            )));
        }
        Ok(sheet)
    }

    fn empty() -> Self {
        Self::default()
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_height(&self, page: usize) -> Option<f32> {
        self.pages.get(page).map(|p| p.height)
    }

    fn field_kind(&self, name: &str) -> Option<FieldKind> {
        self.field(name).map(|f| f.widget.kind())
    }

    fn set_text(&mut self, name: &str, value: &str) -> Result<(), FormError> {
        if let Widget::Text { value: slot } = self.widget_mut(name, FieldKind::Text)? {
            *slot = Some(value.to_string());
        }
        Ok(())
    }

    fn set_checked(&mut self, name: &str) -> Result<(), FormError> {
        if let Widget::Checkbox { checked } = self.widget_mut(name, FieldKind::Checkbox)? {
            *checked = true;
        }
        Ok(())
    }

    fn select(&mut self, name: &str, choice: &str) -> Result<(), FormError> {
        if let Widget::Radio { options, selected } =
            self.widget_mut(name, FieldKind::RadioGroup)?
        {
            if !options.iter().any(|o| o == choice) {
                return Err(FormError::UnknownChoice {
                    field: name.to_string(),
                    choice: choice.to_string(),
                });
            }
            *selected = Some(choice.to_string());
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
        let page = self
            .pages
            .get_mut(page)
            .ok_or(FormError::PageOutOfRange(page))?;
        page.runs.push(TextRun {
            x,
            y,
            font_size,
            text: text.to_string(),
        });
        Ok(())
    }

    fn flatten(&mut self) -> Result<(), FormError> {
        for field in std::mem::take(&mut self.fields) {
            let Some(text) = field.widget.rendered() else {
                continue;
            };
            let font_size = FIELD_FONT_SIZE.min(field.rect.height.max(1.0));
            let y = field.rect.y + (field.rect.height - font_size).max(0.0) / 2.0;
            self.draw_text(field.page, field.rect.x + 2.0, y, font_size, text)?;
        }
        Ok(())
    }

    fn append(&mut self, other: Self) -> Result<(), FormError> {
        let offset = self.pages.len();
        self.pages.extend(other.pages);
        self.fields
            .extend(other.fields.into_iter().map(|f| SheetField {
                page: f.page + offset,
                ..f
            }));
        Ok(())
    }

    fn to_bytes(&self) -> Result<Vec<u8>, FormError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> SheetDocument {
        SheetDocument::blank(2)
            .with_field("Name", 0, Widget::Text { value: None })
            .with_field("Minor", 0, Widget::Checkbox { checked: false })
            .with_field(
                "Sex",
                1,
                Widget::Radio {
                    options: vec!["F".into(), "M".into(), "X".into()],
                    selected: None,
                },
            )
    }

    #[test]
    fn loads_wire_form() {
        let json = r#"{
            "pages": [{ "height": 1100 }],
            "fields": [
                { "name": "F1", "type": "text", "rect": { "x": 10, "y": 20, "width": 100, "height": 14 } },
                { "name": "Sex", "type": "radio", "options": ["F", "M"] }
            ]
        }"#;
        let sheet = SheetDocument::load(json.as_bytes()).unwrap();
        assert_eq!(sheet.page_count(), 1);
        assert_eq!(sheet.page_height(0), Some(1100.0));
        assert_eq!(sheet.pages[0].width, LETTER_WIDTH);
        assert_eq!(sheet.field_kind("F1"), Some(FieldKind::Text));
        assert_eq!(sheet.field_kind("Sex"), Some(FieldKind::RadioGroup));
        assert_eq!(sheet.field_kind("Nope"), None);
    }

    #[test]
    fn loads_empty_sheet() {
        let sheet = SheetDocument::load(br#"{ "pages": [] }"#).unwrap();
        assert_eq!(sheet.page_count(), 0);
        let reloaded = SheetDocument::load(&SheetDocument::empty().to_bytes().unwrap()).unwrap();
        assert_eq!(reloaded.page_count(), 0);
    }

    #[test]
    fn rejects_stray_fields() {
        let stray = br#"{ "pages": [{}], "fields": [{ "name": "A", "page": 3, "type": "checkbox" }] }"#;
        let err = SheetDocument::load(stray).unwrap_err();
        assert!(err.to_string().contains("page 3 of 1"));
    }

    #[test]
    fn fills_typed_fields() {
        let mut sheet = form();
        sheet.set_text("Name", "Alex Rivera").unwrap();
        sheet.set_checked("Minor").unwrap();
        sheet.select("Sex", "X").unwrap();

        assert!(matches!(
            sheet.set_text("Minor", "yes"),
            Err(FormError::WrongFieldKind { found: FieldKind::Checkbox, .. })
        ));
        assert!(matches!(
            sheet.select("Sex", "Q"),
            Err(FormError::UnknownChoice { .. })
        ));
        assert!(matches!(
            sheet.set_checked("Missing"),
            Err(FormError::FieldNotFound(_))
        ));
    }

    #[test]
    fn flatten_bakes_values_and_drops_fields() {
        let mut sheet = form();
        sheet.set_text("Name", "Alex Rivera").unwrap();
        sheet.select("Sex", "F").unwrap();
        sheet.flatten().unwrap();

        assert!(sheet.fields.is_empty());
        assert_eq!(sheet.runs(0).len(), 1);
        assert_eq!(sheet.runs(0)[0].text, "Alex Rivera");
        assert_eq!(sheet.runs(1)[0].text, "F");
    }

    #[test]
    fn append_offsets_pages() {
        let mut packet = SheetDocument::empty();
        packet.append(SheetDocument::blank(1)).unwrap();
        packet.append(form()).unwrap();
        assert_eq!(packet.page_count(), 3);
        assert_eq!(packet.field("Name").map(|f| f.page), Some(1));
        assert_eq!(packet.field("Sex").map(|f| f.page), Some(2));
    }

    #[test]
    fn draw_out_of_range() {
        let mut sheet = SheetDocument::blank(1);
        assert!(matches!(
            sheet.draw_text(4, 0.0, 0.0, 12.0, "X"),
            Err(FormError::PageOutOfRange(4))
        ));
    }
}

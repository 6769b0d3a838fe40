//! PDF document builder

use crate::font::PdfFont;
use crate::graphics::{line_operators, rect_operators, RectStyle};
use crate::text::{generate_text_operators, TextRenderContext};
use crate::{Align, PdfError, Result};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeSet, HashMap};

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Parse `#RRGGBB` or `#RGB`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match digits.len() {
            6 => Some(Self::from_rgb(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            3 => {
                let expand = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
                Some(Self::from_rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => None,
        }
    }

    /// `#rrggbb` form for markup output
    pub fn to_hex(&self) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
    }

    /// Black color
    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    /// White color
    pub fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }

    /// Red color
    pub fn red() -> Self {
        Self::rgb(1.0, 0.0, 0.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Values for the document information dictionary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: String,
    pub author: String,
    pub subject: Option<String>,
    pub creator: Option<String>,
}

impl Metadata {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            subject: None,
            creator: None,
        }
    }
}

struct Page {
    width: f64,
    height: f64,
    content: Vec<u8>,
}

/// A font used by the document together with the characters drawn with it
struct FontUsage {
    font: PdfFont,
    resource_name: String,
    used_chars: BTreeSet<char>,
}

/// PDF document built page by page
///
/// All coordinates taken by the drawing methods are measured from the top-left
/// corner of the page; they are flipped to PDF coordinates when operators are
/// generated.
pub struct PdfDocument {
    pages: Vec<Page>,
    /// Fonts in order of first use
    fonts: Vec<FontUsage>,
    /// Font key -> index into `fonts`
    font_index: HashMap<String, usize>,
    metadata: Option<Metadata>,
    compress: bool,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            fonts: Vec::new(),
            font_index: HashMap::new(),
            metadata: None,
            compress: false,
        }
    }

    /// Append a blank page
    ///
    /// # Returns
    /// New page number (1-indexed)
    pub fn add_page(&mut self, width: f64, height: f64) -> usize {
        self.pages.push(Page {
            width,
            height,
            content: Vec::new(),
        });
        self.pages.len()
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Set the document information dictionary
    pub fn set_metadata(&mut self, metadata: Metadata) {
        self.metadata = Some(metadata);
    }

    /// Compress content and font streams when saving
    pub fn set_compression(&mut self, compress: bool) {
        self.compress = compress;
    }

    /// Insert a line of text
    ///
    /// # Arguments
    /// * `text` - Text to insert
    /// * `page` - Page number (1-indexed)
    /// * `x` - Anchor X coordinate in points (left, center or right edge per `align`)
    /// * `baseline` - Baseline Y coordinate in points (from top)
    /// * `align` - Text alignment
    /// * `font` - Font to draw with
    /// * `font_size` - Font size in points
    /// * `color` - Fill color
    #[allow(clippy::too_many_arguments)]
    pub fn insert_text(
        &mut self,
        text: &str,
        page: usize,
        x: f64,
        baseline: f64,
        align: Align,
        font: &PdfFont,
        font_size: f64,
        color: Color,
    ) -> Result<()> {
        let page_height = self.page(page)?.height;

        // Skip empty text - nothing to render
        if text.is_empty() {
            return Ok(());
        }

        let resource_name = self.register_font_use(font, text);
        let ctx = TextRenderContext {
            font_name: resource_name,
            font_size,
            text_width: font.text_width(text, font_size),
            color,
        };

        let operators = generate_text_operators(
            &font.encode_text_hex(text),
            x,
            page_height - baseline,
            align,
            &ctx,
        );
        self.page_mut(page)?.content.extend_from_slice(&operators);

        Ok(())
    }

    /// Draw a straight line
    #[allow(clippy::too_many_arguments)]
    pub fn draw_line(
        &mut self,
        page: usize,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        color: Color,
        width: f64,
    ) -> Result<()> {
        let target = self.page_mut(page)?;
        let height = target.height;
        let operators = line_operators(x1, height - y1, x2, height - y2, color, width);
        target.content.extend_from_slice(&operators);
        Ok(())
    }

    /// Draw a rectangle whose top-left corner is `(x, y)`
    pub fn draw_rect(
        &mut self,
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        style: RectStyle,
    ) -> Result<()> {
        let target = self.page_mut(page)?;
        let pdf_y = target.height - y - height;
        let operators = rect_operators(x, pdf_y, width, height, style);
        target.content.extend_from_slice(&operators);
        Ok(())
    }

    /// Save the document to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.pages.is_empty() {
            return Err(PdfError::SaveError("document has no pages".to_string()));
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut font_dict = Dictionary::new();
        for usage in &self.fonts {
            let font_id = embed_font(&mut doc, usage);
            font_dict.set(usage.resource_name.as_bytes(), Object::Reference(font_id));
        }
        let resources_id = doc.add_object(dictionary! { "Font" => font_dict });

        let mut kids = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), page.content.clone()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(page.width as f32),
                    Object::Real(page.height as f32),
                ],
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if let Some(metadata) = &self.metadata {
            let info_id = doc.add_object(info_dictionary(metadata));
            doc.trailer.set("Info", info_id);
        }

        if self.compress {
            doc.compress();
        }

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    /// Get or assign the resource name for a font and record the characters drawn
    fn register_font_use(&mut self, font: &PdfFont, text: &str) -> String {
        let key = font.key();
        let index = match self.font_index.get(&key) {
            Some(&index) => index,
            None => {
                let index = self.fonts.len();
                self.fonts.push(FontUsage {
                    font: font.clone(),
                    resource_name: format!("F{}", index + 1),
                    used_chars: BTreeSet::new(),
                });
                self.font_index.insert(key, index);
                index
            }
        };

        let usage = &mut self.fonts[index];
        usage.used_chars.extend(text.chars());
        usage.resource_name.clone()
    }

    fn page(&self, page: usize) -> Result<&Page> {
        let count = self.pages.len();
        page.checked_sub(1)
            .and_then(|index| self.pages.get(index))
            .ok_or(PdfError::InvalidPage(page, count))
    }

    fn page_mut(&mut self, page: usize) -> Result<&mut Page> {
        let count = self.pages.len();
        page.checked_sub(1)
            .and_then(|index| self.pages.get_mut(index))
            .ok_or(PdfError::InvalidPage(page, count))
    }
}

/// Add the objects for one font and return the id of the font dictionary
fn embed_font(doc: &mut Document, usage: &FontUsage) -> ObjectId {
    match &usage.font {
        PdfFont::Standard(font) => doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        }),
        PdfFont::TrueType(data) => {
            let objects = data.to_pdf_objects(&usage.used_chars);

            let font_file_id = doc.add_object(objects.font_file_stream);

            let mut font_descriptor = objects.font_descriptor;
            font_descriptor.set("FontFile2", Object::Reference(font_file_id));
            let font_descriptor_id = doc.add_object(font_descriptor);

            let mut cid_font = objects.cid_font;
            cid_font.set("FontDescriptor", Object::Reference(font_descriptor_id));
            let cid_font_id = doc.add_object(cid_font);

            let tounicode_id = doc.add_object(objects.tounicode_stream);

            let mut type0_font = objects.type0_font;
            type0_font.set(
                "DescendantFonts",
                Object::Array(vec![Object::Reference(cid_font_id)]),
            );
            type0_font.set("ToUnicode", Object::Reference(tounicode_id));
            doc.add_object(type0_font)
        }
    }
}

fn info_dictionary(metadata: &Metadata) -> Dictionary {
    let mut info = dictionary! {
        "Title" => text_string(&metadata.title),
        "Author" => text_string(&metadata.author),
        "Producer" => Object::string_literal(concat!("pdf-core ", env!("CARGO_PKG_VERSION"))),
    };
    if let Some(subject) = &metadata.subject {
        info.set("Subject", text_string(subject));
    }
    if let Some(creator) = &metadata.creator {
        info.set("Creator", text_string(creator));
    }
    info
}

/// PDF text string: literal for ASCII, UTF-16BE with BOM otherwise
fn text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::string_literal(value);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StandardFont;

    fn helvetica() -> PdfFont {
        PdfFont::Standard(StandardFont::Helvetica)
    }

    #[test]
    fn test_add_page_numbers() {
        let mut doc = PdfDocument::new();
        assert_eq!(doc.page_count(), 0);
        assert_eq!(doc.add_page(595.0, 842.0), 1);
        assert_eq!(doc.add_page(595.0, 842.0), 2);
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn test_insert_text_invalid_page() {
        let mut doc = PdfDocument::new();
        doc.add_page(595.0, 842.0);
        let result = doc.insert_text(
            "Hello",
            2,
            10.0,
            10.0,
            Align::Left,
            &helvetica(),
            12.0,
            Color::black(),
        );
        assert!(matches!(result, Err(PdfError::InvalidPage(2, 1))));

        let result = doc.draw_line(0, 0.0, 0.0, 1.0, 1.0, Color::black(), 1.0);
        assert!(matches!(result, Err(PdfError::InvalidPage(0, 1))));
    }

    #[test]
    fn test_empty_document_cannot_be_saved() {
        let doc = PdfDocument::new();
        assert!(matches!(doc.to_bytes(), Err(PdfError::SaveError(_))));
    }

    #[test]
    fn test_text_coordinates_flipped() {
        let mut doc = PdfDocument::new();
        doc.add_page(200.0, 300.0);
        doc.insert_text(
            "Hi",
            1,
            10.0,
            50.0,
            Align::Left,
            &helvetica(),
            10.0,
            Color::black(),
        )
        .unwrap();

        let content = String::from_utf8(doc.pages[0].content.clone()).unwrap();
        assert!(content.contains("/F1 10 Tf"));
        assert!(content.contains("10 250 Td"));
        assert!(content.contains("<4869> Tj"));
    }

    #[test]
    fn test_font_resources_shared() {
        let mut doc = PdfDocument::new();
        doc.add_page(200.0, 300.0);
        let bold = PdfFont::Standard(StandardFont::HelveticaBold);
        for font in [helvetica(), bold, helvetica()] {
            doc.insert_text("x", 1, 0.0, 20.0, Align::Left, &font, 8.0, Color::black())
                .unwrap();
        }
        assert_eq!(doc.fonts.len(), 2);
        assert_eq!(doc.fonts[1].resource_name, "F2");
    }

    #[test]
    fn test_rect_uses_top_left_origin() {
        let mut doc = PdfDocument::new();
        doc.add_page(100.0, 100.0);
        doc.draw_rect(
            1,
            10.0,
            10.0,
            20.0,
            30.0,
            RectStyle::Stroke {
                color: Color::black(),
                width: 1.0,
            },
        )
        .unwrap();
        let content = String::from_utf8(doc.pages[0].content.clone()).unwrap();
        assert!(content.contains("10 60 20 30 re"));
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(Color::from_hex("#FF0000"), Some(Color::red()));
        assert_eq!(Color::from_hex("#fff"), Some(Color::white()));
        assert_eq!(Color::from_hex("red"), None);
        assert_eq!(Color::from_rgb(0x33, 0x66, 0x99).to_hex(), "#336699");
    }

    #[test]
    fn test_text_string_encoding() {
        assert!(matches!(
            text_string("Report"),
            Object::String(ref bytes, StringFormat::Literal) if bytes == b"Report"
        ));
        match text_string("é") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(bytes, vec![0xFE, 0xFF, 0x00, 0xE9]);
            }
            other => panic!("unexpected object: {other:?}"),
        }
    }
}

//! Font handling for PDF documents

use crate::standard::{encode_win_ansi, StandardFont};
use crate::{PdfError, Result};
use lopdf::{dictionary, Dictionary, Object, Stream};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// A font usable for text runs
#[derive(Debug, Clone)]
pub enum PdfFont {
    /// One of the standard fonts, never embedded
    Standard(StandardFont),
    /// A TrueType font embedded into the document
    TrueType(Arc<FontData>),
}

impl PdfFont {
    /// Identity of the font inside one document
    pub fn key(&self) -> String {
        match self {
            PdfFont::Standard(font) => font.base_font().to_string(),
            PdfFont::TrueType(data) => format!("ttf:{}", data.name),
        }
    }

    /// Human-readable font name
    pub fn name(&self) -> &str {
        match self {
            PdfFont::Standard(font) => font.base_font(),
            PdfFont::TrueType(data) => &data.name,
        }
    }

    /// CSS font-family value for markup output
    pub fn css_family(&self) -> String {
        match self {
            PdfFont::Standard(font) => font.css_family().to_string(),
            PdfFont::TrueType(data) => {
                let family = data.family.as_deref().unwrap_or(&data.name);
                format!("'{}', sans-serif", family.replace('\'', ""))
            }
        }
    }

    /// Characters in `text` this font has no glyph for (deduplicated, in order)
    pub fn missing_glyphs(&self, text: &str) -> Vec<char> {
        let mut seen = BTreeSet::new();
        text.chars()
            .filter(|c| !c.is_control())
            .filter(|c| !self.has_glyph(*c))
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Check if the font can show the character
    pub fn has_glyph(&self, c: char) -> bool {
        match self {
            PdfFont::Standard(_) => encode_win_ansi(c).is_some(),
            PdfFont::TrueType(data) => data.has_glyph(c),
        }
    }

    /// Width of `text` in points at `font_size`
    pub fn text_width(&self, text: &str, font_size: f64) -> f64 {
        match self {
            PdfFont::Standard(font) => font.text_width(text, font_size),
            PdfFont::TrueType(data) => data.text_width_points(text, font_size),
        }
    }

    /// Distance from the top of the line box to the baseline, in points
    pub fn ascent(&self, font_size: f64) -> f64 {
        match self {
            PdfFont::Standard(_) => font_size * 0.8,
            PdfFont::TrueType(data) => {
                data.ascender as f64 / data.units_per_em as f64 * font_size
            }
        }
    }

    /// Encode text for a `Tj` operator as a hex string
    pub(crate) fn encode_text_hex(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len() * 4 + 2);
        result.push('<');
        match self {
            PdfFont::Standard(_) => {
                for c in text.chars() {
                    let byte = encode_win_ansi(c).unwrap_or(b'?');
                    result.push_str(&format!("{byte:02X}"));
                }
            }
            PdfFont::TrueType(data) => {
                for c in text.chars() {
                    let gid = data.glyph_id(c).unwrap_or(0);
                    result.push_str(&format!("{gid:04X}"));
                }
            }
        }
        result.push('>');
        result
    }
}

/// TrueType font program with the tables needed for layout and embedding
#[derive(Debug, Clone)]
pub struct FontData {
    /// Font identifier
    pub name: String,
    /// Family name from the `name` table
    pub family: Option<String>,
    /// Full name from the `name` table
    pub full_name: Option<String>,
    /// Whether the OS/2 table marks the font bold
    pub bold: bool,
    /// Whether the OS/2 table marks the font italic
    pub italic: bool,
    /// Raw TTF data
    ttf_data: Vec<u8>,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    bbox: [i16; 4],
    /// Unicode scalar -> glyph id
    glyphs: HashMap<char, u16>,
    /// Glyph id -> advance width in font units
    advances: HashMap<u16, u16>,
}

/// PDF objects generated for font embedding
pub(crate) struct FontObjects {
    pub type0_font: Dictionary,
    pub cid_font: Dictionary,
    pub font_descriptor: Dictionary,
    pub font_file_stream: Stream,
    pub tounicode_stream: Stream,
}

impl FontData {
    /// Create font data from TTF bytes
    ///
    /// # Arguments
    /// * `name` - Font identifier
    /// * `ttf_data` - TrueType font file bytes
    pub fn from_ttf(name: &str, ttf_data: Vec<u8>) -> Result<Self> {
        let face = ttf_parser::Face::parse(&ttf_data, 0)
            .map_err(|e| PdfError::FontParseError(format!("{name}: {e}")))?;

        let mut glyphs = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|code_point| {
                    if let (Some(c), Some(gid)) =
                        (char::from_u32(code_point), subtable.glyph_index(code_point))
                    {
                        glyphs.entry(c).or_insert(gid.0);
                    }
                });
            }
        }

        let advances = glyphs
            .values()
            .filter_map(|&gid| {
                face.glyph_hor_advance(ttf_parser::GlyphId(gid))
                    .map(|advance| (gid, advance))
            })
            .collect();

        let family = find_name(&face, ttf_parser::name_id::FAMILY);
        let full_name = find_name(&face, ttf_parser::name_id::FULL_NAME);
        let bbox = face.global_bounding_box();

        let data = Self {
            name: name.to_string(),
            family,
            full_name,
            bold: face.is_bold(),
            italic: face.is_italic(),
            units_per_em: face.units_per_em(),
            ascender: face.ascender(),
            descender: face.descender(),
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            glyphs,
            advances,
            ttf_data: Vec::new(),
        };

        Ok(Self { ttf_data, ..data })
    }

    /// Get glyph ID for a character
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        self.glyphs.get(&c).copied()
    }

    /// Check if font has a glyph for the given character
    pub fn has_glyph(&self, c: char) -> bool {
        self.glyph_id(c).map(|id| id != 0).unwrap_or(false)
    }

    /// Number of characters mapped by the font's cmap
    pub fn mapped_chars(&self) -> usize {
        self.glyphs.len()
    }

    /// Calculate text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f64) -> f64 {
        let units: u32 = text
            .chars()
            .filter_map(|c| self.glyph_id(c))
            .filter_map(|gid| self.advances.get(&gid))
            .map(|&w| w as u32)
            .sum();
        units as f64 / self.units_per_em.max(1) as f64 * font_size
    }

    /// Scale a value in font units to the 1000-unit glyph space
    fn to_glyph_space(&self, value: i32) -> i32 {
        value * 1000 / self.units_per_em.max(1) as i32
    }

    /// Generate all PDF objects needed to embed this font
    ///
    /// References between the objects are left as placeholders; the document
    /// wires them up when it adds the objects.
    pub(crate) fn to_pdf_objects(&self, used_chars: &BTreeSet<char>) -> FontObjects {
        let base_font = Object::Name(sanitize_base_font(&self.name).into_bytes());

        let tounicode_content = self.generate_tounicode_cmap(used_chars);
        let tounicode_stream = Stream::new(Dictionary::new(), tounicode_content.into_bytes());

        let font_file_stream = Stream::new(
            dictionary! { "Length1" => self.ttf_data.len() as i64 },
            self.ttf_data.clone(),
        );

        let font_bbox: Vec<Object> = self
            .bbox
            .iter()
            .map(|&v| Object::Integer(self.to_glyph_space(v as i32) as i64))
            .collect();

        let mut flags = 32; // Nonsymbolic
        if self.italic {
            flags |= 64;
        }

        let font_descriptor = dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => base_font.clone(),
            "Flags" => flags,
            "FontBBox" => font_bbox,
            "ItalicAngle" => if self.italic { -12 } else { 0 },
            "Ascent" => self.to_glyph_space(self.ascender as i32) as i64,
            "Descent" => self.to_glyph_space(self.descender as i32) as i64,
            "CapHeight" => self.to_glyph_space(self.ascender as i32) as i64,
            "StemV" => if self.bold { 120 } else { 80 },
        };

        let cid_font = dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => base_font.clone(),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "CIDToGIDMap" => "Identity",
            "W" => self.generate_widths_array(used_chars),
            "DW" => 1000,
        };

        let type0_font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => base_font,
            "Encoding" => "Identity-H",
        };

        FontObjects {
            type0_font,
            cid_font,
            font_descriptor,
            font_file_stream,
            tounicode_stream,
        }
    }

    /// Generate /W array for the glyphs actually used: `[gid [width] ...]`
    fn generate_widths_array(&self, used_chars: &BTreeSet<char>) -> Vec<Object> {
        let mut gids: Vec<u16> = used_chars.iter().filter_map(|&c| self.glyph_id(c)).collect();
        gids.sort_unstable();
        gids.dedup();

        let mut widths = Vec::with_capacity(gids.len() * 2);
        for gid in gids {
            let advance = self.advances.get(&gid).copied().unwrap_or(0);
            widths.push(Object::Integer(gid as i64));
            widths.push(Object::Array(vec![Object::Integer(
                self.to_glyph_space(advance as i32) as i64,
            )]));
        }
        widths
    }

    /// Generate ToUnicode CMap stream content
    fn generate_tounicode_cmap(&self, used_chars: &BTreeSet<char>) -> String {
        let mut cmap = String::new();

        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
        cmap.push_str("/CMapType 2 def\n");
        cmap.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

        let mapped: Vec<(u16, char)> = used_chars
            .iter()
            .filter_map(|&c| self.glyph_id(c).map(|gid| (gid, c)))
            .collect();

        // bfchar sections are limited to 100 entries
        for chunk in mapped.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for (gid, c) in chunk {
                let mut utf16 = [0u16; 2];
                let units: String = c
                    .encode_utf16(&mut utf16)
                    .iter()
                    .map(|u| format!("{u:04X}"))
                    .collect();
                cmap.push_str(&format!("<{gid:04X}> <{units}>\n"));
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\nend\n");

        cmap
    }
}

fn find_name(face: &ttf_parser::Face<'_>, name_id: u16) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|name| name.name_id == name_id && name.is_unicode())
        .find_map(|name| name.to_string())
}

/// PDF names cannot carry spaces or delimiters
fn sanitize_base_font(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}

//! Compiled template model

use crate::expression::Expression;
use pdf_core::Color;
use serde::Serialize;

/// Declared type of a field or parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "class")]
pub enum FieldType {
    Text,
    Integer,
    Long,
    Decimal,
    Timestamp,
    /// Unsupported class, kept for diagnostics
    Other(String),
}

impl FieldType {
    /// Map a `class` attribute to a field type
    ///
    /// Accepts fully qualified and short names.
    pub fn from_class(class: &str) -> Self {
        let class = class.trim();
        let short = class.rsplit('.').next().unwrap_or(class);
        match short {
            "String" => FieldType::Text,
            "Integer" => FieldType::Integer,
            "Long" => FieldType::Long,
            "Double" => FieldType::Decimal,
            "Timestamp" => FieldType::Timestamp,
            _ => FieldType::Other(class.to_string()),
        }
    }
}

/// A declared template field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub field_type: FieldType,
}

/// A declared template parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub default_value: Option<Expression>,
}

/// Page geometry in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    pub width: f64,
    pub height: f64,
    pub left_margin: f64,
    pub right_margin: f64,
    pub top_margin: f64,
    pub bottom_margin: f64,
    pub column_width: f64,
}

impl Default for PageSetup {
    /// A4 portrait with 20pt margins
    fn default() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
            left_margin: 20.0,
            right_margin: 20.0,
            top_margin: 20.0,
            bottom_margin: 20.0,
            column_width: 555.0,
        }
    }
}

impl PageSetup {
    /// Height available for bands
    pub fn body_height(&self) -> f64 {
        self.height - self.top_margin - self.bottom_margin
    }
}

/// Report sections in print order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandKind {
    Title,
    PageHeader,
    ColumnHeader,
    Detail,
    ColumnFooter,
    PageFooter,
    Summary,
    NoData,
}

impl BandKind {
    pub const ALL: [BandKind; 8] = [
        BandKind::Title,
        BandKind::PageHeader,
        BandKind::ColumnHeader,
        BandKind::Detail,
        BandKind::ColumnFooter,
        BandKind::PageFooter,
        BandKind::Summary,
        BandKind::NoData,
    ];

    /// XML element name of the section
    pub fn tag(&self) -> &'static str {
        match self {
            BandKind::Title => "title",
            BandKind::PageHeader => "pageHeader",
            BandKind::ColumnHeader => "columnHeader",
            BandKind::Detail => "detail",
            BandKind::ColumnFooter => "columnFooter",
            BandKind::PageFooter => "pageFooter",
            BandKind::Summary => "summary",
            BandKind::NoData => "noData",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

/// A horizontal strip of elements
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub height: f64,
    /// Band prints only when this evaluates to `true`
    pub print_when: Option<Expression>,
    pub elements: Vec<Element>,
}

/// Bands of every section; sections that are absent are empty
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bands {
    pub title: Vec<Band>,
    pub page_header: Vec<Band>,
    pub column_header: Vec<Band>,
    pub detail: Vec<Band>,
    pub column_footer: Vec<Band>,
    pub page_footer: Vec<Band>,
    pub summary: Vec<Band>,
    pub no_data: Vec<Band>,
}

impl Bands {
    pub fn section(&self, kind: BandKind) -> &[Band] {
        match kind {
            BandKind::Title => &self.title,
            BandKind::PageHeader => &self.page_header,
            BandKind::ColumnHeader => &self.column_header,
            BandKind::Detail => &self.detail,
            BandKind::ColumnFooter => &self.column_footer,
            BandKind::PageFooter => &self.page_footer,
            BandKind::Summary => &self.summary,
            BandKind::NoData => &self.no_data,
        }
    }

    pub(crate) fn section_mut(&mut self, kind: BandKind) -> &mut Vec<Band> {
        match kind {
            BandKind::Title => &mut self.title,
            BandKind::PageHeader => &mut self.page_header,
            BandKind::ColumnHeader => &mut self.column_header,
            BandKind::Detail => &mut self.detail,
            BandKind::ColumnFooter => &mut self.column_footer,
            BandKind::PageFooter => &mut self.page_footer,
            BandKind::Summary => &mut self.summary,
            BandKind::NoData => &mut self.no_data,
        }
    }

    /// Total height of a section
    pub fn height(&self, kind: BandKind) -> f64 {
        self.section(kind).iter().map(|band| band.height).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BandKind, &Band)> {
        BandKind::ALL
            .into_iter()
            .flat_map(move |kind| self.section(kind).iter().map(move |band| (kind, band)))
    }
}

/// Position, size and colors of an element, relative to its band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub forecolor: Color,
    pub backcolor: Color,
    /// Paint the background
    pub opaque: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
    /// Printed as left aligned
    Justified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// Requested font of a text element
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    /// Font name; `None` uses the catalog default
    pub name: Option<String>,
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            name: None,
            size: 10.0,
            bold: false,
            italic: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextStyle {
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
    pub font: FontSpec,
}

/// Diagonal of the element box a line follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineDirection {
    /// Top-left to bottom-right
    #[default]
    TopDown,
    /// Bottom-left to top-right
    BottomUp,
}

/// When a text field expression is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvaluationTime {
    /// While the band is printed
    #[default]
    Now,
    /// After the whole report is filled
    Report,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    StaticText {
        text: String,
        style: TextStyle,
    },
    TextField {
        expression: Expression,
        style: TextStyle,
        pattern: Option<String>,
        blank_when_null: bool,
        evaluation_time: EvaluationTime,
    },
    Line {
        width: f64,
        direction: LineDirection,
    },
    Rectangle {
        line_width: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub frame: ElementFrame,
    pub kind: ElementKind,
}

/// A template ready to be filled
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    pub name: String,
    pub page: PageSetup,
    pub parameters: Vec<ParameterDescriptor>,
    pub(crate) fields: Vec<FieldDescriptor>,
    pub bands: Bands,
}

impl CompiledTemplate {
    /// Declared fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|param| param.name == name)
    }
}

//! Filling a compiled template with records
//!
//! The filler walks the bands of a [`CompiledTemplate`] the way a banded
//! report prints: title once, page header and column header at the top of
//! every page, one set of detail bands per record, column footer under the
//! last detail of a page, page footer at the bottom and the summary last.
//! The result is a [`FilledDocument`] with absolute positions that the
//! exporters draw without further layout.

use crate::datasource::{DataSource, EmptyDataSource};
use crate::expression::EvalContext;
use crate::fonts::{FontCatalog, RenderingCapabilities};
use crate::format::format_value;
use crate::schema::*;
use crate::value::{Parameters, Record, Value};
use crate::{Result, TemplateError, IS_IGNORE_PAGINATION};
use pdf_core::{wrap_to_width, Color, PdfFont};
use tracing::{debug, trace};

/// Line height as a multiple of the font size
const LINE_SPACING: f64 = 1.2;

/// A run of text lines positioned on a page
#[derive(Debug, Clone)]
pub struct PrintText {
    /// Left edge of the element box in points
    pub x: f64,
    /// Top edge of the element box in points
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Wrapped lines that fit the box
    pub lines: Vec<String>,
    pub font: PdfFont,
    pub font_size: f64,
    pub line_height: f64,
    pub color: Color,
    /// Background for opaque elements
    pub backcolor: Option<Color>,
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
}

impl PrintText {
    /// All lines joined with newlines
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Offset of the first line from the top of the box
    pub fn vertical_offset(&self) -> f64 {
        let used = self.lines.len() as f64 * self.line_height;
        match self.vertical {
            VerticalAlign::Top => 0.0,
            VerticalAlign::Middle => ((self.height - used) / 2.0).max(0.0),
            VerticalAlign::Bottom => (self.height - used).max(0.0),
        }
    }
}

/// Something to draw, in page coordinates with the origin at the top left
#[derive(Debug, Clone)]
pub enum PrintElement {
    Text(PrintText),
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        color: Color,
        width: f64,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        stroke: Option<Color>,
        fill: Option<Color>,
        line_width: f64,
    },
}

#[derive(Debug, Clone)]
pub struct FilledPage {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<PrintElement>,
}

/// Output of a fill, ready for export
#[derive(Debug, Clone)]
pub struct FilledDocument {
    pub name: String,
    pub pages: Vec<FilledPage>,
}

impl FilledDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Text of every text element, page by page
    pub fn texts(&self) -> Vec<String> {
        self.pages
            .iter()
            .flat_map(|page| page.elements.iter())
            .filter_map(|element| match element {
                PrintElement::Text(text) => Some(text.text()),
                _ => None,
            })
            .collect()
    }
}

/// Fills one compiled template
///
/// A filler is cheap to build; create one per fill attempt so each attempt
/// can run with its own [`RenderingCapabilities`].
pub struct Filler<'a> {
    template: &'a CompiledTemplate,
    catalog: &'a FontCatalog,
    caps: RenderingCapabilities,
}

impl<'a> Filler<'a> {
    pub fn new(
        template: &'a CompiledTemplate,
        catalog: &'a FontCatalog,
        caps: RenderingCapabilities,
    ) -> Self {
        Self {
            template,
            catalog,
            caps,
        }
    }

    /// Fill the template
    ///
    /// `None` means no data source: the `noData` section prints when the
    /// template has one, otherwise the report is filled as if the source
    /// were empty.
    pub fn fill(
        &self,
        parameters: &Parameters,
        source: Option<&mut dyn DataSource>,
    ) -> Result<FilledDocument> {
        let parameters = self.merge_parameters(parameters);
        let paginate = !parameters
            .get(IS_IGNORE_PAGINATION)
            .is_some_and(Value::is_truthy);

        let mut run = FillRun {
            filler: self,
            parameters: &parameters,
            paginate,
            pages: Vec::new(),
            y: 0.0,
            report_count: 0,
            record: None,
            page_has_detail: false,
            deferred: Vec::new(),
        };

        match source {
            None if !self.template.bands.no_data.is_empty() => run.print_no_data()?,
            None => run.print_report(&mut EmptyDataSource)?,
            Some(source) => run.print_report(source)?,
        }

        let document = run.finish()?;
        debug!(
            template = %self.template.name,
            pages = document.page_count(),
            paginate,
            "filled report"
        );
        Ok(document)
    }

    /// Supplied parameters over evaluated defaults
    fn merge_parameters(&self, supplied: &Parameters) -> Parameters {
        let mut merged = supplied.clone();
        let empty = Parameters::new();
        for param in &self.template.parameters {
            if merged.contains_key(&param.name) {
                continue;
            }
            if let Some(default) = &param.default_value {
                let ctx = EvalContext {
                    record: None,
                    parameters: &empty,
                    page_number: 0,
                    page_count: 0,
                    report_count: 0,
                };
                merged.insert(param.name.clone(), default.evaluate(&ctx));
            }
        }
        merged
    }
}

/// A text field evaluated once the fill completes
struct Deferred<'t> {
    page: usize,
    top: f64,
    element: &'t Element,
}

struct FillRun<'f, 'a> {
    filler: &'f Filler<'a>,
    parameters: &'f Parameters,
    paginate: bool,
    pages: Vec<FilledPage>,
    /// Cursor from the top of the current page
    y: f64,
    report_count: i32,
    /// Current record; the last one once the source is exhausted
    record: Option<Record>,
    page_has_detail: bool,
    deferred: Vec<Deferred<'a>>,
}

impl<'f, 'a> FillRun<'f, 'a> {
    fn template(&self) -> &'a CompiledTemplate {
        self.filler.template
    }

    fn page(&self) -> PageSetup {
        self.filler.template.page
    }

    fn context(&self) -> EvalContext<'_> {
        let pages = self.pages.len() as i32;
        EvalContext {
            record: self.record.as_ref(),
            parameters: self.parameters,
            page_number: pages,
            page_count: pages,
            report_count: self.report_count,
        }
    }

    fn print_no_data(&mut self) -> Result<()> {
        self.new_page();
        self.print_section(BandKind::NoData)?;
        self.close_page()?;
        Ok(())
    }

    fn print_report(&mut self, source: &mut dyn DataSource) -> Result<()> {
        // The title sees the first record
        self.record = source.next_record();
        let mut has_record = self.record.is_some();

        self.new_page();
        self.print_section(BandKind::Title)?;
        self.print_page_header(true)?;

        while has_record {
            self.report_count += 1;
            trace!(count = self.report_count, "printing record");
            self.print_detail()?;

            match source.next_record() {
                Some(record) => self.record = Some(record),
                None => has_record = false,
            }
        }

        self.print_section(BandKind::ColumnFooter)?;
        self.print_summary()?;
        self.print_page_footer()?;
        self.close_page()
    }

    fn print_detail(&mut self) -> Result<()> {
        let template = self.template();
        for band in &template.bands.detail {
            if !self.should_print(band) {
                continue;
            }
            if self.paginate && self.page_has_detail && self.y + band.height > self.detail_limit()
            {
                self.break_page()?;
            }
            self.print_band(band)?;
            self.page_has_detail = true;
        }
        Ok(())
    }

    fn print_summary(&mut self) -> Result<()> {
        let template = self.template();
        if template.bands.summary.is_empty() {
            return Ok(());
        }

        let needed = template.bands.height(BandKind::Summary);
        if self.paginate && self.y + needed > self.footer_top() {
            self.print_page_footer()?;
            self.new_page();
            self.print_page_header(false)?;
        }
        self.print_section(BandKind::Summary)
    }

    /// Finish the current page and start the next one
    fn break_page(&mut self) -> Result<()> {
        self.print_section(BandKind::ColumnFooter)?;
        self.print_page_footer()?;
        self.new_page();
        self.print_page_header(true)
    }

    fn new_page(&mut self) {
        let page = self.page();
        self.pages.push(FilledPage {
            width: page.width,
            height: page.height,
            elements: Vec::new(),
        });
        self.y = page.top_margin;
        self.page_has_detail = false;
    }

    fn print_page_header(&mut self, with_column_header: bool) -> Result<()> {
        self.print_section(BandKind::PageHeader)?;
        if with_column_header {
            self.print_section(BandKind::ColumnHeader)?;
        }
        Ok(())
    }

    fn print_page_footer(&mut self) -> Result<()> {
        if self.paginate {
            self.y = self.footer_top();
        }
        self.print_section(BandKind::PageFooter)
    }

    /// Grow the last page to its content when not paginating
    fn close_page(&mut self) -> Result<()> {
        if !self.paginate {
            let bottom = self.y + self.page().bottom_margin;
            if let Some(page) = self.pages.last_mut() {
                page.height = bottom.max(self.filler.template.page.top_margin);
            }
        }
        Ok(())
    }

    /// Lowest position a detail band may reach
    fn detail_limit(&self) -> f64 {
        self.footer_top() - self.template().bands.height(BandKind::ColumnFooter)
    }

    fn footer_top(&self) -> f64 {
        let page = self.page();
        page.height - page.bottom_margin - self.template().bands.height(BandKind::PageFooter)
    }

    fn should_print(&self, band: &Band) -> bool {
        band.print_when
            .as_ref()
            .map_or(true, |expr| expr.evaluate(&self.context()).is_truthy())
    }

    fn print_section(&mut self, kind: BandKind) -> Result<()> {
        let template = self.template();
        for band in template.bands.section(kind) {
            if self.should_print(band) {
                self.print_band(band)?;
            }
        }
        Ok(())
    }

    fn print_band(&mut self, band: &'a Band) -> Result<()> {
        let top = self.y;
        let page_index = self.pages.len() - 1;

        for element in &band.elements {
            if let ElementKind::TextField {
                evaluation_time: EvaluationTime::Report,
                ..
            } = element.kind
            {
                self.deferred.push(Deferred {
                    page: page_index,
                    top,
                    element,
                });
                continue;
            }

            let printed = self.print_element(element, top, &self.context())?;
            self.pages[page_index].elements.extend(printed);
        }

        self.y += band.height;
        Ok(())
    }

    fn print_element(
        &self,
        element: &Element,
        top: f64,
        ctx: &EvalContext<'_>,
    ) -> Result<Vec<PrintElement>> {
        let frame = &element.frame;
        let x = self.page().left_margin + frame.x;
        let y = top + frame.y;

        let printed = match &element.kind {
            ElementKind::StaticText { text, style } => {
                vec![self.text_element(frame, style, text, x, y)?]
            }
            ElementKind::TextField {
                expression,
                style,
                pattern,
                blank_when_null,
                ..
            } => {
                let value = expression.evaluate(ctx);
                let text = match value {
                    Value::Null if *blank_when_null => String::new(),
                    Value::Null => "null".to_string(),
                    other => format_value(&other, pattern.as_deref()),
                };
                vec![self.text_element(frame, style, &text, x, y)?]
            }
            ElementKind::Line { width, direction } => {
                let (x1, y1, x2, y2) = line_endpoints(x, y, frame.width, frame.height, *direction);
                vec![PrintElement::Line {
                    x1,
                    y1,
                    x2,
                    y2,
                    color: frame.forecolor,
                    width: *width,
                }]
            }
            ElementKind::Rectangle { line_width } => vec![PrintElement::Rect {
                x,
                y,
                width: frame.width,
                height: frame.height,
                stroke: (*line_width > 0.0).then_some(frame.forecolor),
                fill: frame.opaque.then_some(frame.backcolor),
                line_width: *line_width,
            }],
        };
        Ok(printed)
    }

    fn text_element(
        &self,
        frame: &ElementFrame,
        style: &TextStyle,
        text: &str,
        x: f64,
        y: f64,
    ) -> Result<PrintElement> {
        let catalog = self.filler.catalog;
        let caps = self.filler.caps;

        let font = catalog.resolve(&style.font, caps)?;
        let font = catalog.cover_text(font, text, caps)?;
        let size = style.font.size;
        let line_height = size * LINE_SPACING;

        let mut lines = wrap_to_width(text, frame.width, |s| font.text_width(s, size));
        let max_lines = (((frame.height + 1e-6) / line_height).floor() as usize).max(1);
        lines.truncate(max_lines);

        Ok(PrintElement::Text(PrintText {
            x,
            y,
            width: frame.width,
            height: frame.height,
            lines,
            font,
            font_size: size,
            line_height,
            color: frame.forecolor,
            backcolor: frame.opaque.then_some(frame.backcolor),
            horizontal: style.horizontal,
            vertical: style.vertical,
        }))
    }

    /// Resolve report-time text fields with the final counts and last record
    fn finish(mut self) -> Result<FilledDocument> {
        let deferred = std::mem::take(&mut self.deferred);
        let total = self.pages.len() as i32;

        for item in deferred {
            let ctx = EvalContext {
                record: self.record.as_ref(),
                parameters: self.parameters,
                page_number: total,
                page_count: total,
                report_count: self.report_count,
            };
            let printed = self.print_element(item.element, item.top, &ctx)?;
            let page = self.pages.get_mut(item.page).ok_or_else(|| {
                TemplateError::FillError(format!("deferred element on missing page {}", item.page))
            })?;
            page.elements.extend(printed);
        }

        Ok(FilledDocument {
            name: self.filler.template.name.clone(),
            pages: self.pages,
        })
    }
}

fn line_endpoints(
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    direction: LineDirection,
) -> (f64, f64, f64, f64) {
    // Thin boxes are straight lines along their long side
    if height <= 1.0 {
        return (x, y, x + width, y);
    }
    if width <= 1.0 {
        return (x, y, x, y + height);
    }
    match direction {
        LineDirection::TopDown => (x, y, x + width, y + height),
        LineDirection::BottomUp => (x, y + height, x + width, y),
    }
}

//! PDF export of filled documents

use crate::fill::{FilledDocument, PrintElement, PrintText};
use crate::schema::HorizontalAlign;
use crate::Result;
use pdf_core::{Align, Metadata, PdfDocument, RectStyle};
use tracing::debug;

/// Document-level settings of a PDF export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfExportOptions {
    pub title: String,
    pub author: String,
    /// Compress content streams
    pub compress: bool,
}

impl Default for PdfExportOptions {
    fn default() -> Self {
        Self {
            title: "Report".to_string(),
            author: "Report Service".to_string(),
            compress: true,
        }
    }
}

/// Render a filled document to PDF bytes
pub fn export_pdf(filled: &FilledDocument, options: &PdfExportOptions) -> Result<Vec<u8>> {
    let mut doc = PdfDocument::new();
    doc.set_metadata(Metadata::new(&options.title, &options.author));
    doc.set_compression(options.compress);

    for page in &filled.pages {
        let page_num = doc.add_page(page.width, page.height);

        for element in &page.elements {
            match element {
                PrintElement::Text(text) => draw_text(&mut doc, page_num, text)?,
                PrintElement::Line {
                    x1,
                    y1,
                    x2,
                    y2,
                    color,
                    width,
                } => doc.draw_line(page_num, *x1, *y1, *x2, *y2, *color, *width)?,
                PrintElement::Rect {
                    x,
                    y,
                    width,
                    height,
                    stroke,
                    fill,
                    line_width,
                } => {
                    let style = match (fill, stroke) {
                        (Some(fill), Some(stroke)) => RectStyle::FillStroke {
                            fill: *fill,
                            stroke: *stroke,
                            width: *line_width,
                        },
                        (Some(fill), None) => RectStyle::Fill { color: *fill },
                        (None, Some(stroke)) => RectStyle::Stroke {
                            color: *stroke,
                            width: *line_width,
                        },
                        (None, None) => continue,
                    };
                    doc.draw_rect(page_num, *x, *y, *width, *height, style)?;
                }
            }
        }
    }

    let bytes = doc.to_bytes()?;
    debug!(
        pages = filled.page_count(),
        bytes = bytes.len(),
        "exported PDF"
    );
    Ok(bytes)
}

fn draw_text(doc: &mut PdfDocument, page: usize, text: &PrintText) -> Result<()> {
    if let Some(back) = text.backcolor {
        doc.draw_rect(
            page,
            text.x,
            text.y,
            text.width,
            text.height,
            RectStyle::Fill { color: back },
        )?;
    }

    let (anchor, align) = match text.horizontal {
        HorizontalAlign::Left | HorizontalAlign::Justified => (text.x, Align::Left),
        HorizontalAlign::Center => (text.x + text.width / 2.0, Align::Center),
        HorizontalAlign::Right => (text.x + text.width, Align::Right),
    };

    let first_baseline = text.y + text.vertical_offset() + text.font.ascent(text.font_size);
    for (i, line) in text.lines.iter().enumerate() {
        let baseline = first_baseline + i as f64 * text.line_height;
        doc.insert_text(
            line,
            page,
            anchor,
            baseline,
            align,
            &text.font,
            text.font_size,
            text.color,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::FilledPage;
    use pdf_core::{Color, PdfFont, StandardFont};

    fn text(lines: &[&str]) -> PrintElement {
        PrintElement::Text(PrintText {
            x: 20.0,
            y: 20.0,
            width: 200.0,
            height: 40.0,
            lines: lines.iter().map(|l| l.to_string()).collect(),
            font: PdfFont::Standard(StandardFont::Helvetica),
            font_size: 10.0,
            line_height: 12.0,
            color: Color::black(),
            backcolor: Some(Color::white()),
            horizontal: HorizontalAlign::Right,
            vertical: Default::default(),
        })
    }

    fn document(elements: Vec<PrintElement>) -> FilledDocument {
        FilledDocument {
            name: "test".into(),
            pages: vec![FilledPage {
                width: 300.0,
                height: 200.0,
                elements,
            }],
        }
    }

    #[test]
    fn test_export_starts_with_pdf_header() {
        let filled = document(vec![
            text(&["Total", "19.95"]),
            PrintElement::Line {
                x1: 20.0,
                y1: 70.0,
                x2: 220.0,
                y2: 70.0,
                color: Color::black(),
                width: 0.5,
            },
        ]);
        let bytes = export_pdf(&filled, &PdfExportOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_export_without_pages_fails() {
        let filled = FilledDocument {
            name: "empty".into(),
            pages: Vec::new(),
        };
        assert!(export_pdf(&filled, &PdfExportOptions::default()).is_err());
    }

    #[test]
    fn test_invisible_rect_is_skipped() {
        let filled = document(vec![PrintElement::Rect {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            stroke: None,
            fill: None,
            line_width: 0.0,
        }]);
        let options = PdfExportOptions {
            compress: false,
            ..Default::default()
        };
        let bytes = export_pdf(&filled, &options).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }
}

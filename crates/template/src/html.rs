//! HTML export of filled documents
//!
//! Every page becomes a fixed-size `<div class="page">` whose children are
//! absolutely positioned in points, so the markup mirrors the PDF layout.

use crate::fill::{FilledDocument, PrintElement, PrintText};
use crate::schema::{HorizontalAlign, VerticalAlign};
use pdf_core::Color;
use std::fmt::Write;

const STYLE: &str = "body{margin:0;background:#e0e0e0;}\
.page{position:relative;overflow:hidden;background:#ffffff;margin:12pt auto;box-shadow:0 0 4pt rgba(0,0,0,0.3);}\
.text{position:absolute;overflow:hidden;white-space:pre;}\
.shape{position:absolute;overflow:visible;}";

/// Render a filled document as a standalone HTML page
pub fn export_html(filled: &FilledDocument, title: &str) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape_html(title));
    let _ = writeln!(out, "<style>{STYLE}</style>");
    out.push_str("</head>\n<body>\n");

    for page in &filled.pages {
        let _ = writeln!(
            out,
            "<div class=\"page\" style=\"width:{}pt;height:{}pt;\">",
            num(page.width),
            num(page.height)
        );
        for element in &page.elements {
            match element {
                PrintElement::Text(text) => write_text(&mut out, text),
                PrintElement::Line {
                    x1,
                    y1,
                    x2,
                    y2,
                    color,
                    width,
                } => write_line(&mut out, (*x1, *y1), (*x2, *y2), *color, *width),
                PrintElement::Rect {
                    x,
                    y,
                    width,
                    height,
                    stroke,
                    fill,
                    line_width,
                } => {
                    let mut style = format!(
                        "left:{}pt;top:{}pt;width:{}pt;height:{}pt;box-sizing:border-box;",
                        num(*x),
                        num(*y),
                        num(*width),
                        num(*height)
                    );
                    if let Some(fill) = fill {
                        let _ = write!(style, "background:{};", fill.to_hex());
                    }
                    if let Some(stroke) = stroke {
                        let _ = write!(
                            style,
                            "border:{}pt solid {};",
                            num(*line_width),
                            stroke.to_hex()
                        );
                    }
                    let _ = writeln!(out, "<div class=\"shape\" style=\"{style}\"></div>");
                }
            }
        }
        out.push_str("</div>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn write_text(out: &mut String, text: &PrintText) {
    let align = match text.horizontal {
        HorizontalAlign::Left => "left",
        HorizontalAlign::Center => "center",
        HorizontalAlign::Right => "right",
        HorizontalAlign::Justified => "justify",
    };
    let mut style = format!(
        "left:{}pt;top:{}pt;width:{}pt;height:{}pt;font-family:{};font-size:{}pt;line-height:{}pt;color:{};text-align:{align};",
        num(text.x),
        num(text.y),
        num(text.width),
        num(text.height),
        escape_html(&text.font.css_family()),
        num(text.font_size),
        num(text.line_height),
        text.color.to_hex(),
    );
    if text.vertical != VerticalAlign::Top {
        let _ = write!(style, "padding-top:{}pt;box-sizing:border-box;", num(text.vertical_offset()));
    }
    if let Some(back) = text.backcolor {
        let _ = write!(style, "background:{};", back.to_hex());
    }

    let _ = writeln!(
        out,
        "<div class=\"text\" style=\"{style}\">{}</div>",
        escape_html(&text.text())
    );
}

fn write_line(out: &mut String, from: (f64, f64), to: (f64, f64), color: Color, width: f64) {
    let left = from.0.min(to.0);
    let top = from.1.min(to.1);
    let w = (from.0 - to.0).abs();
    let h = (from.1 - to.1).abs();
    let _ = writeln!(
        out,
        "<svg class=\"shape\" style=\"left:{}pt;top:{}pt;\" width=\"{}pt\" height=\"{}pt\" viewBox=\"0 0 {} {}\"><line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/></svg>",
        num(left),
        num(top),
        num(w.max(width)),
        num(h.max(width)),
        num(w.max(width)),
        num(h.max(width)),
        num(from.0 - left),
        num(from.1 - top),
        num(to.0 - left),
        num(to.1 - top),
        color.to_hex(),
        num(width)
    );
}

/// Escape text for HTML content and attribute values
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Number without trailing zeros
fn num(v: f64) -> String {
    let s = format!("{v:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

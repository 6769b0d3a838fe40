//! Line and rectangle operators

use crate::document::Color;

/// How a rectangle is painted
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RectStyle {
    /// Outline only
    Stroke { color: Color, width: f64 },
    /// Solid fill without outline
    Fill { color: Color },
    /// Fill, then outline
    FillStroke {
        fill: Color,
        stroke: Color,
        width: f64,
    },
}

/// Generate operators for a straight line between two points
///
/// Coordinates are PDF coordinates (origin bottom-left).
pub fn line_operators(x1: f64, y1: f64, x2: f64, y2: f64, color: Color, width: f64) -> Vec<u8> {
    format!(
        "q\n{} {} {} RG\n{width} w\n{x1} {y1} m\n{x2} {y2} l\nS\nQ\n",
        color.r, color.g, color.b
    )
    .into_bytes()
}

/// Generate operators for a rectangle whose lower-left corner is `(x, y)`
pub fn rect_operators(x: f64, y: f64, width: f64, height: f64, style: RectStyle) -> Vec<u8> {
    let mut ops = String::from("q\n");
    match style {
        RectStyle::Stroke { color, width: line } => {
            ops.push_str(&format!("{} {} {} RG\n{line} w\n", color.r, color.g, color.b));
            ops.push_str(&format!("{x} {y} {width} {height} re\nS\n"));
        }
        RectStyle::Fill { color } => {
            ops.push_str(&format!("{} {} {} rg\n", color.r, color.g, color.b));
            ops.push_str(&format!("{x} {y} {width} {height} re\nf\n"));
        }
        RectStyle::FillStroke {
            fill,
            stroke,
            width: line,
        } => {
            ops.push_str(&format!("{} {} {} rg\n", fill.r, fill.g, fill.b));
            ops.push_str(&format!("{} {} {} RG\n{line} w\n", stroke.r, stroke.g, stroke.b));
            ops.push_str(&format!("{x} {y} {width} {height} re\nB\n"));
        }
    }
    ops.push_str("Q\n");
    ops.into_bytes()
}

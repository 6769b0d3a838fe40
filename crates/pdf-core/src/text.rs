//! Text rendering utilities

use crate::document::Color;
use crate::Align;

/// Context for rendering text
pub struct TextRenderContext {
    /// PDF font resource name (e.g., "F1")
    pub font_name: String,
    /// Font size in points
    pub font_size: f64,
    /// Text width in points (for alignment)
    pub text_width: f64,
    /// Text color (RGB)
    pub color: Color,
}

/// Calculate X offset for text alignment inside a box
///
/// # Arguments
/// * `text_width` - Width of text in points
/// * `container_width` - Available width for alignment
/// * `align` - Desired alignment
pub fn calculate_x_offset(text_width: f64, container_width: f64, align: Align) -> f64 {
    match align {
        Align::Left => 0.0,
        Align::Center => (container_width - text_width) / 2.0,
        Align::Right => container_width - text_width,
    }
}

/// Generate PDF operators for text insertion
///
/// Creates the PDF text operators (BT, rg, Tf, Td, Tj, ET) to render text
/// anchored at `x`: the left edge, the center or the right edge depending on
/// `align`.
///
/// # Arguments
/// * `text_hex` - Hex-encoded text (e.g., "<48656C6C6F>")
/// * `x` - X coordinate in points (PDF coordinates, from left)
/// * `y` - Baseline Y coordinate in points (PDF coordinates, from bottom)
/// * `align` - Text alignment
/// * `ctx` - Text rendering context
pub fn generate_text_operators(
    text_hex: &str,
    x: f64,
    y: f64,
    align: Align,
    ctx: &TextRenderContext,
) -> Vec<u8> {
    let x_offset = match align {
        Align::Left => 0.0,
        Align::Center => -ctx.text_width / 2.0,
        Align::Right => -ctx.text_width,
    };

    let final_x = x + x_offset;

    let mut ops = String::new();
    ops.push_str("BT\n");
    ops.push_str(&format!(
        "{} {} {} rg\n",
        ctx.color.r, ctx.color.g, ctx.color.b
    ));
    ops.push_str(&format!("/{} {} Tf\n", ctx.font_name, ctx.font_size));
    ops.push_str(&format!("{final_x} {y} Td\n"));
    ops.push_str(&format!("{text_hex} Tj\n"));
    ops.push_str("ET\n");

    ops.into_bytes()
}

/// Split text into lines no wider than `max_width`
///
/// Explicit line breaks are kept. Words wider than the limit are placed on a
/// line of their own rather than broken.
///
/// # Arguments
/// * `text` - Text to split
/// * `max_width` - Maximum line width in points
/// * `measure` - Width of a string in points
pub fn wrap_to_width<F>(text: &str, max_width: f64, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f64,
{
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        if max_width <= 0.0 {
            lines.push(paragraph.to_string());
            continue;
        }

        let mut current_line = String::new();
        for word in paragraph.split_whitespace() {
            if current_line.is_empty() {
                current_line = word.to_string();
                continue;
            }

            let candidate = format!("{current_line} {word}");
            if measure(&candidate) <= max_width {
                current_line = candidate;
            } else {
                lines.push(std::mem::replace(&mut current_line, word.to_string()));
            }
        }
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every character is 1pt wide
    fn unit_width(s: &str) -> f64 {
        s.chars().count() as f64
    }

    #[test]
    fn test_x_offset_left() {
        assert_eq!(calculate_x_offset(100.0, 500.0, Align::Left), 0.0);
    }

    #[test]
    fn test_x_offset_center() {
        assert_eq!(calculate_x_offset(100.0, 500.0, Align::Center), 200.0);
    }

    #[test]
    fn test_x_offset_right() {
        assert_eq!(calculate_x_offset(100.0, 500.0, Align::Right), 400.0);
    }

    #[test]
    fn test_wrap_to_width() {
        let lines = wrap_to_width("Hello world this is a test", 12.0, unit_width);
        assert_eq!(lines, vec!["Hello world", "this is a", "test"]);
    }

    #[test]
    fn test_wrap_keeps_line_breaks() {
        let lines = wrap_to_width("first\nsecond line", 100.0, unit_width);
        assert_eq!(lines, vec!["first", "second line"]);
    }

    #[test]
    fn test_wrap_long_word() {
        let lines = wrap_to_width("Supercalifragilisticexpialidocious", 10.0, unit_width);
        assert_eq!(lines, vec!["Supercalifragilisticexpialidocious"]);
    }

    #[test]
    fn test_wrap_empty() {
        assert_eq!(wrap_to_width("", 10.0, unit_width), vec![""]);
    }

    #[test]
    fn test_wrap_zero_width() {
        let lines = wrap_to_width("Hello world", 0.0, unit_width);
        assert_eq!(lines, vec!["Hello world"]);
    }

    #[test]
    fn test_generate_text_operators_left() {
        let ctx = TextRenderContext {
            font_name: "F1".to_string(),
            font_size: 12.0,
            text_width: 100.0,
            color: Color::black(),
        };

        let ops = generate_text_operators("<48656C6C6F>", 100.0, 700.0, Align::Left, &ctx);
        let ops_str = String::from_utf8(ops).unwrap();

        assert!(ops_str.contains("BT"));
        assert!(ops_str.contains("/F1 12 Tf"));
        assert!(ops_str.contains("100 700 Td"));
        assert!(ops_str.contains("<48656C6C6F> Tj"));
        assert!(ops_str.contains("ET"));
    }

    #[test]
    fn test_generate_text_operators_center() {
        let ctx = TextRenderContext {
            font_name: "F2".to_string(),
            font_size: 14.0,
            text_width: 100.0,
            color: Color::black(),
        };

        let ops = generate_text_operators("<54657374>", 200.0, 600.0, Align::Center, &ctx);
        let ops_str = String::from_utf8(ops).unwrap();

        assert!(ops_str.contains("/F2 14 Tf"));
        assert!(ops_str.contains("150 600 Td"));
    }

    #[test]
    fn test_generate_text_operators_right() {
        let ctx = TextRenderContext {
            font_name: "F3".to_string(),
            font_size: 16.0,
            text_width: 80.0,
            color: Color::black(),
        };

        let ops = generate_text_operators("<5269676874>", 300.0, 500.0, Align::Right, &ctx);
        let ops_str = String::from_utf8(ops).unwrap();

        assert!(ops_str.contains("220 500 Td"));
    }

    #[test]
    fn test_generate_text_operators_with_color() {
        let ctx = TextRenderContext {
            font_name: "F1".to_string(),
            font_size: 12.0,
            text_width: 100.0,
            color: Color::red(),
        };

        let ops = generate_text_operators("<41>", 100.0, 700.0, Align::Left, &ctx);
        let ops_str = String::from_utf8(ops).unwrap();

        assert!(ops_str.contains("1 0 0 rg"));
    }
}

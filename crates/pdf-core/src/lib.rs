//! PDF Core - Low-level PDF writing
//!
//! This crate provides functionality for:
//! - Building PDF documents page by page
//! - Using the standard Type1 fonts or embedding TrueType fonts
//! - Inserting text at specific coordinates
//! - Drawing lines and rectangles
//! - Writing document metadata and compressing streams
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{Align, Color, Metadata, PdfDocument, PdfFont, StandardFont};
//!
//! let mut doc = PdfDocument::new();
//! let page = doc.add_page(595.0, 842.0);
//! let font = PdfFont::Standard(StandardFont::Helvetica);
//! doc.insert_text("Hello, World!", page, 100.0, 100.0, Align::Left, &font, 12.0, Color::black())?;
//! doc.set_metadata(Metadata::new("Report", "Report Service"));
//! let bytes = doc.to_bytes()?;
//! ```

mod document;
mod font;
mod graphics;
mod standard;
mod text;

pub use document::{Color, Metadata, PdfDocument};
pub use font::{FontData, PdfFont};
pub use graphics::{line_operators, rect_operators, RectStyle};
pub use standard::StandardFont;
pub use text::{
    calculate_x_offset, generate_text_operators, wrap_to_width, TextRenderContext,
};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Text alignment options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

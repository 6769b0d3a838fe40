//! Template Engine - XML report templates: compile, fill and export
//!
//! This crate provides:
//! - Compilation of XML report templates into [`CompiledTemplate`]
//! - Field/parameter expressions (`$F{..}`, `$P{..}`, `$V{..}`)
//! - Filling a template with records into a paginated [`FilledDocument`]
//! - Font resolution with configurable fallback ([`FontCatalog`])
//! - PDF and HTML exporters
//!
//! # Example
//!
//! ```ignore
//! use template::{compile, FontCatalog, Filler, PdfExportOptions, RecordDataSource};
//!
//! let compiled = compile(&std::fs::read_to_string("invoice.jrxml")?)?;
//! let catalog = FontCatalog::new("Helvetica");
//! let mut source = RecordDataSource::new(records);
//! let filled = Filler::new(&compiled, &catalog, Default::default())
//!     .fill(&parameters, Some(&mut source))?;
//! let pdf_bytes = template::export_pdf(&filled, &PdfExportOptions::default())?;
//! ```

mod datasource;
pub mod expression;
mod fill;
pub mod fonts;
pub mod format;
mod html;
mod parser;
mod pdf;
mod schema;
mod value;

pub use datasource::{DataSource, EmptyDataSource, RecordDataSource};
pub use expression::{Expression, Variable};
pub use fill::{FilledDocument, FilledPage, Filler, PrintElement, PrintText};
pub use fonts::{FontCatalog, RenderingCapabilities};
pub use html::export_html;
pub use parser::compile;
pub use pdf::{export_pdf, PdfExportOptions};
pub use schema::*;
pub use value::{Parameters, Record, Value};

use thiserror::Error;

/// Built-in parameter that switches pagination off
pub const IS_IGNORE_PAGINATION: &str = "IS_IGNORE_PAGINATION";

/// Errors that can occur during template processing
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to parse template: {0}")]
    ParseError(String),

    #[error("Invalid expression `{expression}`: {message}")]
    ExpressionError { expression: String, message: String },

    #[error("Font error: {0}")]
    FontError(String),

    #[error("Fill error: {0}")]
    FillError(String),

    #[error("PDF error: {0}")]
    PdfError(#[from] pdf_core::PdfError),

    #[error("XML error: {0}")]
    XmlError(#[from] roxmltree::Error),
}

impl TemplateError {
    /// Whether the error comes from the template source rather than from filling it
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            TemplateError::ParseError(_)
                | TemplateError::ExpressionError { .. }
                | TemplateError::XmlError(_)
        )
    }
}

/// Result type for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_classification() {
        assert!(TemplateError::ParseError("x".into()).is_compile_error());
        assert!(!TemplateError::FontError("x".into()).is_compile_error());
        assert!(!TemplateError::FillError("x".into()).is_compile_error());
    }

    #[test]
    fn test_expression_error_message() {
        let err = TemplateError::ExpressionError {
            expression: "$F{".to_string(),
            message: "unterminated reference".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid expression `$F{`: unterminated reference"
        );
    }
}

//! Error types for the report pipeline

use template::TemplateError;
use thiserror::Error;

/// Errors surfaced by the report service
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Fill failed: {0}")]
    FillFailed(String),

    #[error("Export failed: {0}")]
    ExportFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReportError {
    /// Whether the caller caused the error
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ReportError::InvalidTemplate(_) | ReportError::InvalidInput(_)
        )
    }

    /// Map a compile failure
    pub(crate) fn from_compile(err: TemplateError) -> Self {
        ReportError::InvalidTemplate(err.to_string())
    }
}

impl From<config::ConfigError> for ReportError {
    fn from(err: config::ConfigError) -> Self {
        ReportError::Config(err.to_string())
    }
}

/// Result type for report operations
pub type Result<T> = std::result::Result<T, ReportError>;

//! Caller-facing export request and result types

use crate::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use template::{Parameters, Record, Value};

/// Output format of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// PDF
    #[default]
    #[serde(alias = "pdf", alias = "PDF")]
    Paged,
    /// Self-contained HTML
    #[serde(alias = "html", alias = "HTML")]
    Markup,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Paged => "application/pdf",
            ExportFormat::Markup => "text/html; charset=utf-8",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Paged => "pdf",
            ExportFormat::Markup => "html",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Paged => f.write_str("paged"),
            ExportFormat::Markup => f.write_str("markup"),
        }
    }
}

/// Request to fill a stored template and export it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    #[serde(alias = "jrxmlFileName")]
    pub template_name: String,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub data_records: Vec<serde_json::Value>,
    #[serde(default, alias = "exportFormat")]
    pub format: ExportFormat,
}

impl ExportRequest {
    pub fn new(template_name: impl Into<String>, format: ExportFormat) -> Self {
        Self {
            template_name: template_name.into(),
            parameters: serde_json::Map::new(),
            data_records: Vec::new(),
            format,
        }
    }

    pub fn with_records(mut self, records: Vec<serde_json::Value>) -> Self {
        self.data_records = records;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn report_parameters(&self) -> Parameters {
        self.parameters
            .iter()
            .map(|(name, value)| (name.clone(), Value::from_json(value.clone())))
            .collect()
    }

    /// Data records as loosely-typed records
    ///
    /// Fails with `InvalidInput` when an entry is not a JSON object.
    pub fn records(&self) -> Result<Vec<Record>> {
        self.data_records
            .iter()
            .enumerate()
            .map(|(index, value)| {
                Value::record_from_json(value.clone()).ok_or_else(|| {
                    ReportError::InvalidInput(format!(
                        "dataRecords[{index}] must be an object"
                    ))
                })
            })
            .collect()
    }
}

/// Rendered output
#[derive(Debug, Clone, PartialEq)]
pub enum ExportResult {
    Pdf(Vec<u8>),
    Html(String),
}

impl ExportResult {
    pub fn format(&self) -> ExportFormat {
        match self {
            ExportResult::Pdf(_) => ExportFormat::Paged,
            ExportResult::Html(_) => ExportFormat::Markup,
        }
    }

    pub fn content_type(&self) -> &'static str {
        self.format().content_type()
    }

    pub fn len(&self) -> usize {
        match self {
            ExportResult::Pdf(bytes) => bytes.len(),
            ExportResult::Html(html) => html.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            ExportResult::Pdf(bytes) => bytes,
            ExportResult::Html(html) => html.into_bytes(),
        }
    }
}

//! Resolve → coerce → build → fill → render
//!
//! PDF and HTML exports share one pipeline and differ only in the
//! [`Renderer`] applied to the filled document.

use crate::coerce::TypeCoercer;
use crate::datasource::DataSourceBuilder;
use crate::engine::ReportEngine;
use crate::fill::FillOrchestrator;
use crate::registry::TemplateRegistry;
use crate::request::{ExportFormat, ExportRequest, ExportResult};
use crate::{ReportError, Result};
use std::sync::Arc;
use template::{FilledDocument, PdfExportOptions};
use tracing::{debug, instrument};

/// Turns a filled document into output bytes or text
pub trait Renderer: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn content_type(&self) -> &'static str {
        self.format().content_type()
    }

    fn render(&self, engine: &dyn ReportEngine, document: &FilledDocument) -> Result<ExportResult>;
}

/// PDF output with fixed document metadata
#[derive(Debug, Clone, Default)]
pub struct PagedRenderer {
    options: PdfExportOptions,
}

impl PagedRenderer {
    pub fn new(options: PdfExportOptions) -> Self {
        Self { options }
    }
}

impl Renderer for PagedRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Paged
    }

    fn render(&self, engine: &dyn ReportEngine, document: &FilledDocument) -> Result<ExportResult> {
        engine
            .export_pdf(document, &self.options)
            .map(ExportResult::Pdf)
            .map_err(|e| ReportError::ExportFailed(e.to_string()))
    }
}

/// Self-contained HTML output
#[derive(Debug, Clone)]
pub struct MarkupRenderer {
    title: String,
}

impl MarkupRenderer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl Default for MarkupRenderer {
    fn default() -> Self {
        Self::new("Report")
    }
}

impl Renderer for MarkupRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Markup
    }

    fn render(&self, engine: &dyn ReportEngine, document: &FilledDocument) -> Result<ExportResult> {
        engine
            .export_html(document, &self.title)
            .map(ExportResult::Html)
            .map_err(|e| ReportError::ExportFailed(e.to_string()))
    }
}

#[derive(Clone)]
pub struct ExportPipeline {
    registry: TemplateRegistry,
    orchestrator: FillOrchestrator,
    engine: Arc<dyn ReportEngine>,
}

impl ExportPipeline {
    pub fn new(
        registry: TemplateRegistry,
        orchestrator: FillOrchestrator,
        engine: Arc<dyn ReportEngine>,
    ) -> Self {
        Self {
            registry,
            orchestrator,
            engine,
        }
    }

    /// Run one export with the given renderer
    ///
    /// The request's own `format` is ignored; the renderer decides.
    #[instrument(
        name = "export",
        skip_all,
        fields(template = %request.template_name, format = %renderer.format())
    )]
    pub fn run(&self, request: &ExportRequest, renderer: &dyn Renderer) -> Result<ExportResult> {
        let compiled = self.registry.resolve(&request.template_name)?;

        let records = request.records()?;
        let records = TypeCoercer::new(compiled.fields()).coerce(records);
        let data = DataSourceBuilder::build(records);
        debug!(records = data.len(), "Records bound");

        let document = self.orchestrator.fill(
            &request.template_name,
            &compiled,
            request.report_parameters(),
            &data,
        )?;

        let result = renderer.render(self.engine.as_ref(), &document)?;
        debug!(pages = document.page_count(), bytes = result.len(), "Exported");
        Ok(result)
    }
}

//! The rendering engine boundary
//!
//! The pipeline only talks to [`ReportEngine`]; [`TemplateEngine`] is the
//! implementation backed by the `template` crate.

use template::{
    CompiledTemplate, DataSource, FilledDocument, Filler, FontCatalog, Parameters,
    PdfExportOptions, RenderingCapabilities, TemplateError,
};

type EngineResult<T> = std::result::Result<T, TemplateError>;

/// Compile, fill and export operations of a report engine
pub trait ReportEngine: Send + Sync {
    fn compile(&self, source: &str) -> EngineResult<CompiledTemplate>;

    /// Fill with explicit rendering capabilities
    ///
    /// `source` of `None` means no data source was supplied.
    fn fill(
        &self,
        template: &CompiledTemplate,
        parameters: &Parameters,
        source: Option<&mut dyn DataSource>,
        caps: RenderingCapabilities,
    ) -> EngineResult<FilledDocument>;

    fn export_pdf(
        &self,
        document: &FilledDocument,
        options: &PdfExportOptions,
    ) -> EngineResult<Vec<u8>>;

    fn export_html(&self, document: &FilledDocument, title: &str) -> EngineResult<String>;
}

/// Engine backed by the bundled template crate
#[derive(Debug, Default)]
pub struct TemplateEngine {
    catalog: FontCatalog,
}

impl TemplateEngine {
    pub fn new(catalog: FontCatalog) -> Self {
        Self { catalog }
    }
}

impl ReportEngine for TemplateEngine {
    fn compile(&self, source: &str) -> EngineResult<CompiledTemplate> {
        template::compile(source)
    }

    fn fill(
        &self,
        template: &CompiledTemplate,
        parameters: &Parameters,
        source: Option<&mut dyn DataSource>,
        caps: RenderingCapabilities,
    ) -> EngineResult<FilledDocument> {
        Filler::new(template, &self.catalog, caps).fill(parameters, source)
    }

    fn export_pdf(
        &self,
        document: &FilledDocument,
        options: &PdfExportOptions,
    ) -> EngineResult<Vec<u8>> {
        template::export_pdf(document, options)
    }

    fn export_html(&self, document: &FilledDocument, title: &str) -> EngineResult<String> {
        Ok(template::export_html(document, title))
    }
}

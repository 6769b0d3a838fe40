//! Facade used by the HTTP and CLI front ends

use crate::config::ReportConfig;
use crate::engine::{ReportEngine, TemplateEngine};
use crate::export::{ExportPipeline, MarkupRenderer, PagedRenderer, Renderer};
use crate::fill::{CapabilityCache, FillOrchestrator};
use crate::registry::TemplateRegistry;
use crate::request::{ExportFormat, ExportRequest, ExportResult};
use crate::store::TemplateStore;
use crate::{ReportError, Result};
use std::sync::Arc;
use template::{FieldDescriptor, PdfExportOptions};
use tracing::info;

/// Template management and export
///
/// All operations are synchronous; async callers run exports on a blocking
/// thread.
#[derive(Clone)]
pub struct ReportService {
    store: Arc<TemplateStore>,
    registry: TemplateRegistry,
    pipeline: ExportPipeline,
    paged: PagedRenderer,
    markup: MarkupRenderer,
}

impl ReportService {
    /// Build the service with the bundled engine
    pub fn from_config(config: &ReportConfig) -> Result<Self> {
        let engine = TemplateEngine::new(config.rendering.font_catalog());
        Self::with_engine(config, Arc::new(engine))
    }

    /// Build the service around any engine
    pub fn with_engine(config: &ReportConfig, engine: Arc<dyn ReportEngine>) -> Result<Self> {
        let store = Arc::new(TemplateStore::open(
            &config.storage.upload_dir,
            config.storage.extensions.clone(),
        )?);
        let registry = TemplateRegistry::new(store.clone(), engine.clone());
        let cache = Arc::new(CapabilityCache::new(
            config.rendering.capability_scope,
            config.rendering.capabilities(),
        ));
        let orchestrator = FillOrchestrator::new(engine.clone(), cache);
        let pipeline = ExportPipeline::new(registry.clone(), orchestrator, engine);

        let paged = PagedRenderer::new(PdfExportOptions {
            title: config.export.title.clone(),
            author: config.export.author.clone(),
            compress: config.export.compress,
        });
        let markup = MarkupRenderer::new(config.export.title.clone());

        info!(
            upload_dir = %store.dir().display(),
            scope = ?config.rendering.capability_scope,
            "Report service ready"
        );
        Ok(Self {
            store,
            registry,
            pipeline,
            paged,
            markup,
        })
    }

    /// Store a template, replacing any previous one of the same name
    pub fn upload(&self, name: &str, content: &[u8]) -> Result<String> {
        self.store.store(name, content)
    }

    pub fn list(&self) -> Result<Vec<String>> {
        self.store.list()
    }

    pub fn delete(&self, name: &str) -> Result<bool> {
        self.store.delete(name)
    }

    pub fn fields(&self, name: &str) -> Result<Vec<FieldDescriptor>> {
        self.registry.fields(name)
    }

    /// Export in the format named by the request
    pub fn export(&self, request: &ExportRequest) -> Result<ExportResult> {
        let renderer: &dyn Renderer = match request.format {
            ExportFormat::Paged => &self.paged,
            ExportFormat::Markup => &self.markup,
        };
        self.pipeline.run(request, renderer)
    }

    pub fn export_paged(&self, request: &ExportRequest) -> Result<Vec<u8>> {
        match self.pipeline.run(request, &self.paged)? {
            ExportResult::Pdf(bytes) => Ok(bytes),
            other => Err(unexpected(other)),
        }
    }

    pub fn export_markup(&self, request: &ExportRequest) -> Result<String> {
        match self.pipeline.run(request, &self.markup)? {
            ExportResult::Html(html) => Ok(html),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(result: ExportResult) -> ReportError {
    ReportError::ExportFailed(format!("renderer produced {} output", result.format()))
}

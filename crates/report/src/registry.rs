//! Template name resolution

use crate::engine::ReportEngine;
use crate::store::TemplateStore;
use crate::{ReportError, Result};
use std::sync::Arc;
use template::{CompiledTemplate, FieldDescriptor};
use tracing::debug;

/// Resolves template names to compiled templates
///
/// Every resolve reads and compiles the stored source, so a re-upload takes
/// effect on the next request.
#[derive(Clone)]
pub struct TemplateRegistry {
    store: Arc<TemplateStore>,
    engine: Arc<dyn ReportEngine>,
}

impl TemplateRegistry {
    pub fn new(store: Arc<TemplateStore>, engine: Arc<dyn ReportEngine>) -> Self {
        Self { store, engine }
    }

    /// Load and compile a template
    ///
    /// Fails with `NotFound` when nothing is stored under `name` and with
    /// `InvalidTemplate` when the source does not compile.
    pub fn resolve(&self, name: &str) -> Result<CompiledTemplate> {
        let source = self.store.read(name)?;
        let compiled = self
            .engine
            .compile(&source)
            .map_err(ReportError::from_compile)?;
        debug!(
            template = name,
            fields = compiled.fields().len(),
            "Template resolved"
        );
        Ok(compiled)
    }

    /// Declared fields of a stored template
    pub fn fields(&self, name: &str) -> Result<Vec<FieldDescriptor>> {
        Ok(self.resolve(name)?.fields().to_vec())
    }
}

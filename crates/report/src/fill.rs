//! Fill orchestration with a one-shot font fallback
//!
//! A fill runs with the capabilities held in the [`CapabilityCache`]. When it
//! fails for a font or glyph reason, the cache is degraded (substitute missing
//! fonts, no system font lookup) and the fill is attempted once more. Later
//! fills read the degraded capabilities and skip the failing first attempt.

use crate::config::CapabilityScope;
use crate::datasource::DataSourceHandle;
use crate::engine::ReportEngine;
use crate::{ReportError, Result};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use template::{
    CompiledTemplate, FilledDocument, Parameters, RenderingCapabilities, TemplateError, Value,
    IS_IGNORE_PAGINATION,
};
use tracing::{debug, warn};

/// Rendering capabilities remembered across fills
#[derive(Debug)]
pub struct CapabilityCache {
    scope: CapabilityScope,
    base: RenderingCapabilities,
    process: RwLock<RenderingCapabilities>,
    templates: RwLock<HashMap<String, RenderingCapabilities>>,
}

impl CapabilityCache {
    pub fn new(scope: CapabilityScope, base: RenderingCapabilities) -> Self {
        Self {
            scope,
            base,
            process: RwLock::new(base),
            templates: RwLock::new(HashMap::new()),
        }
    }

    pub fn scope(&self) -> CapabilityScope {
        self.scope
    }

    /// Capabilities for the next fill of `template`
    pub fn get(&self, template: &str) -> RenderingCapabilities {
        match self.scope {
            CapabilityScope::Process => *self.process.read().unwrap_or_else(PoisonError::into_inner),
            CapabilityScope::Template => self
                .templates
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(template)
                .copied()
                .unwrap_or(self.base),
        }
    }

    /// Switch `template` (or the whole process) to degraded capabilities
    pub fn degrade(&self, template: &str) -> RenderingCapabilities {
        let degraded = RenderingCapabilities::degraded();
        match self.scope {
            CapabilityScope::Process => {
                *self.process.write().unwrap_or_else(PoisonError::into_inner) = degraded;
            }
            CapabilityScope::Template => {
                self.templates
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(template.to_string(), degraded);
            }
        }
        degraded
    }
}

/// Drives engine fills, applying the font fallback policy
#[derive(Clone)]
pub struct FillOrchestrator {
    engine: Arc<dyn ReportEngine>,
    cache: Arc<CapabilityCache>,
}

impl FillOrchestrator {
    pub fn new(engine: Arc<dyn ReportEngine>, cache: Arc<CapabilityCache>) -> Self {
        Self { engine, cache }
    }

    pub fn cache(&self) -> &CapabilityCache {
        &self.cache
    }

    /// Fill `template` with the records behind `data`
    ///
    /// Pagination is always on. A font failure degrades the capabilities and
    /// retries once with a fresh cursor; any other failure, or a failure of the
    /// retry, is returned as [`ReportError::FillFailed`].
    pub fn fill(
        &self,
        name: &str,
        template: &CompiledTemplate,
        mut parameters: Parameters,
        data: &DataSourceHandle,
    ) -> Result<FilledDocument> {
        parameters.insert(IS_IGNORE_PAGINATION.to_string(), Value::Bool(false));

        let caps = self.cache.get(name);
        let err = match self.attempt(template, &parameters, data, caps) {
            Ok(document) => return Ok(document),
            Err(err) => err,
        };

        if !is_font_failure(&err) {
            return Err(ReportError::FillFailed(err.to_string()));
        }

        warn!(template = name, error = %err, "Font failure, retrying with degraded font handling");
        let caps = self.cache.degrade(name);
        self.attempt(template, &parameters, data, caps)
            .map_err(|err| ReportError::FillFailed(err.to_string()))
    }

    fn attempt(
        &self,
        template: &CompiledTemplate,
        parameters: &Parameters,
        data: &DataSourceHandle,
        caps: RenderingCapabilities,
    ) -> std::result::Result<FilledDocument, TemplateError> {
        debug!(
            template = %template.name,
            records = data.len(),
            ignore_missing_fonts = caps.ignore_missing_fonts,
            headless = caps.headless,
            "Filling"
        );
        let mut source = data.open();
        let document = self
            .engine
            .fill(template, parameters, Some(source.as_mut()), caps)?;
        debug!(template = %template.name, pages = document.page_count(), "Filled");
        Ok(document)
    }
}

/// Whether a fill failure is caused by missing fonts or glyphs
pub fn is_font_failure(err: &TemplateError) -> bool {
    if matches!(err, TemplateError::FontError(_)) {
        return true;
    }
    let message = err.to_string().to_lowercase();
    message.contains("font") || message.contains("glyph")
}

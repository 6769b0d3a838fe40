//! Report Service - bind records to report templates and export them
//!
//! This crate provides:
//! - Template storage with atomic overwrite ([`TemplateStore`])
//! - Template resolution and field schemas ([`TemplateRegistry`])
//! - Type coercion of loosely-typed records against declared fields
//! - A fill orchestrator with a one-shot font fallback retry
//! - PDF and HTML export behind a common [`Renderer`] trait
//! - Configuration and logging setup for the binaries
//!
//! # Example
//!
//! ```ignore
//! use report::{ExportRequest, ReportConfig, ReportService};
//!
//! let service = ReportService::from_config(&ReportConfig::default())?;
//! service.upload("invoice.jrxml", &std::fs::read("invoice.jrxml")?)?;
//! let request: ExportRequest = serde_json::from_str(r#"{
//!     "templateName": "invoice.jrxml",
//!     "dataRecords": [{"total": "19.95"}],
//!     "format": "paged"
//! }"#)?;
//! let pdf = service.export(&request)?;
//! ```

pub mod coerce;
pub mod config;
pub mod datasource;
pub mod engine;
mod error;
pub mod export;
pub mod fill;
pub mod logging;
pub mod registry;
pub mod request;
pub mod service;
pub mod store;

pub use coerce::{CoercionOutcome, TypeCoercer};
pub use config::{CapabilityScope, ReportConfig};
pub use datasource::{DataSourceBuilder, DataSourceHandle};
pub use engine::{ReportEngine, TemplateEngine};
pub use error::{ReportError, Result};
pub use export::{ExportPipeline, MarkupRenderer, PagedRenderer, Renderer};
pub use fill::{CapabilityCache, FillOrchestrator};
pub use registry::TemplateRegistry;
pub use request::{ExportFormat, ExportRequest, ExportResult};
pub use service::ReportService;
pub use store::TemplateStore;

pub use template::{FieldDescriptor, FieldType, RenderingCapabilities};

//! End-to-end tests of the export pipeline

use pretty_assertions::assert_eq;
use report::{
    CapabilityScope, ExportFormat, ExportRequest, ExportResult, RenderingCapabilities,
    ReportConfig, ReportEngine, ReportError, ReportService, TemplateEngine,
};
use serde_json::json;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use template::{
    CompiledTemplate, DataSource, FilledDocument, Parameters, PdfExportOptions, Record,
    RecordDataSource, TemplateError, Value,
};
use tempfile::TempDir;

const INVOICE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<jasperReport name="invoice" pageWidth="595" pageHeight="842"
              leftMargin="20" rightMargin="20" topMargin="20" bottomMargin="20">
    <parameter name="TITLE" class="java.lang.String">
        <defaultValueExpression>"Invoice"</defaultValueExpression>
    </parameter>
    <field name="total" class="java.lang.Double"/>
    <field name="issued" class="java.sql.Timestamp"/>
    <title>
        <band height="30">
            <textField>
                <reportElement x="0" y="0" width="555" height="30"/>
                <textFieldExpression>$P{TITLE}</textFieldExpression>
            </textField>
        </band>
    </title>
    <detail>
        <band height="20">
            <textField pattern="#,##0.00">
                <reportElement x="0" y="0" width="200" height="20"/>
                <textFieldExpression>$F{total}</textFieldExpression>
            </textField>
            <textField pattern="yyyy-MM-dd">
                <reportElement x="200" y="0" width="200" height="20"/>
                <textFieldExpression>$F{issued}</textFieldExpression>
            </textField>
        </band>
    </detail>
    <summary>
        <band height="20">
            <textField>
                <reportElement x="0" y="0" width="200" height="20"/>
                <textFieldExpression>"Rows: " + $V{REPORT_COUNT}</textFieldExpression>
            </textField>
        </band>
    </summary>
</jasperReport>
"##;

const GREETING: &str = r#"<jasperReport name="greeting">
    <title>
        <band height="30">
            <staticText>
                <reportElement x="0" y="0" width="300" height="30"/>
                <text>สวัสดี</text>
            </staticText>
        </band>
    </title>
</jasperReport>
"#;

fn config(dir: &Path) -> ReportConfig {
    let mut config = ReportConfig::default();
    config.storage.upload_dir = dir.to_path_buf();
    config.rendering.system_font_dirs = Vec::new();
    config.rendering.headless = true;
    config
}

fn service() -> (TempDir, ReportService) {
    let dir = tempfile::tempdir().unwrap();
    let service = ReportService::from_config(&config(dir.path())).unwrap();
    service.upload("invoice.tmpl", INVOICE.as_bytes()).unwrap();
    (dir, service)
}

/// Delegates to the real engine, recording fills and failing on demand
#[derive(Default)]
struct ScriptedEngine {
    inner: TemplateEngine,
    failures: Mutex<VecDeque<TemplateError>>,
    fills: AtomicUsize,
    caps: Mutex<Vec<RenderingCapabilities>>,
    parameters: Mutex<Vec<Parameters>>,
    records: Mutex<Vec<Record>>,
}

impl ScriptedEngine {
    fn failing_with(failures: Vec<TemplateError>) -> Self {
        Self {
            failures: Mutex::new(failures.into()),
            ..Self::default()
        }
    }

    fn fill_calls(&self) -> usize {
        self.fills.load(Ordering::SeqCst)
    }
}

impl ReportEngine for ScriptedEngine {
    fn compile(&self, source: &str) -> Result<CompiledTemplate, TemplateError> {
        self.inner.compile(source)
    }

    fn fill(
        &self,
        template: &CompiledTemplate,
        parameters: &Parameters,
        source: Option<&mut dyn DataSource>,
        caps: RenderingCapabilities,
    ) -> Result<FilledDocument, TemplateError> {
        self.fills.fetch_add(1, Ordering::SeqCst);
        self.caps.lock().unwrap().push(caps);
        self.parameters.lock().unwrap().push(parameters.clone());
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        let mut seen = Vec::new();
        if let Some(source) = source {
            while let Some(record) = source.next_record() {
                seen.push(record);
            }
        }
        *self.records.lock().unwrap() = seen.clone();
        let mut replay = RecordDataSource::new(seen);
        self.inner.fill(template, parameters, Some(&mut replay), caps)
    }

    fn export_pdf(
        &self,
        document: &FilledDocument,
        options: &PdfExportOptions,
    ) -> Result<Vec<u8>, TemplateError> {
        self.inner.export_pdf(document, options)
    }

    fn export_html(&self, document: &FilledDocument, title: &str) -> Result<String, TemplateError> {
        self.inner.export_html(document, title)
    }
}

fn scripted_service(
    engine: Arc<ScriptedEngine>,
    scope: CapabilityScope,
) -> (TempDir, ReportService) {
    scripted_service_with(engine, |config| config.rendering.capability_scope = scope)
}

fn scripted_service_with(
    engine: Arc<ScriptedEngine>,
    configure: impl FnOnce(&mut ReportConfig),
) -> (TempDir, ReportService) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    configure(&mut config);
    let service = ReportService::with_engine(&config, engine).unwrap();
    service.upload("invoice.tmpl", INVOICE.as_bytes()).unwrap();
    (dir, service)
}

fn invoice_request(format: ExportFormat) -> ExportRequest {
    ExportRequest::new("invoice.tmpl", format).with_records(vec![json!({
        "total": "19.95",
        "issued": "2024-03-01T00:00:00"
    })])
}

#[test]
fn test_invoice_scenario_coerces_and_exports_pdf() {
    let engine = Arc::new(ScriptedEngine::default());
    let (_dir, service) = scripted_service(engine.clone(), CapabilityScope::Process);

    let pdf = service.export_paged(&invoice_request(ExportFormat::Paged)).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));

    let records = engine.records.lock().unwrap().clone();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["total"], Value::Float(19.95));
    assert_eq!(records[0]["issued"].to_string(), "2024-03-01 00:00:00");
    assert!(matches!(records[0]["issued"], Value::Timestamp(_)));
}

#[test]
fn test_markup_export_contains_formatted_values() {
    let (_dir, service) = service();
    let html = service
        .export_markup(
            &invoice_request(ExportFormat::Markup).with_parameter("TITLE", json!("Receipt")),
        )
        .unwrap();

    assert!(html.contains("Receipt"));
    assert!(html.contains("19.95"));
    assert!(html.contains("2024-03-01"));
    assert!(html.contains("Rows: 1"));
}

#[test]
fn test_export_dispatches_on_format() {
    let (_dir, service) = service();
    let paged = service.export(&invoice_request(ExportFormat::Paged)).unwrap();
    assert_eq!(paged.content_type(), "application/pdf");

    let markup = service.export(&invoice_request(ExportFormat::Markup)).unwrap();
    assert!(matches!(markup, ExportResult::Html(ref html) if html.starts_with("<!DOCTYPE html>")));
}

#[test]
fn test_unparseable_values_do_not_fail_the_export() {
    let (_dir, service) = service();
    let request = ExportRequest::new("invoice.tmpl", ExportFormat::Markup).with_records(vec![
        json!({"total": "n/a", "issued": "yesterday", "note": "extra"}),
        json!({"total": 5}),
    ]);
    let html = service.export_markup(&request).unwrap();
    assert!(html.contains("n/a"));
    assert!(html.contains("5.00"));
    assert!(html.contains("Rows: 2"));
}

#[test]
fn test_empty_data_export_is_not_empty() {
    let (_dir, service) = service();
    let pdf = service
        .export_paged(&ExportRequest::new("invoice.tmpl", ExportFormat::Paged))
        .unwrap();
    assert!(pdf.starts_with(b"%PDF-"));

    let html = service
        .export_markup(&ExportRequest::new("invoice.tmpl", ExportFormat::Markup))
        .unwrap();
    assert!(html.contains("Invoice"));
    assert!(html.contains("Rows: 0"));
}

#[test]
fn test_missing_template_is_not_found() {
    let (_dir, service) = service();
    let err = service
        .export(&ExportRequest::new("missing.tmpl", ExportFormat::Paged))
        .unwrap_err();
    assert!(matches!(err, ReportError::NotFound(ref name) if name == "missing.tmpl"));
}

#[test]
fn test_invalid_template_is_client_error() {
    let (_dir, service) = service();
    service.upload("broken.tmpl", b"<jasperReport><field/></jasperReport>").unwrap();
    let err = service
        .export(&ExportRequest::new("broken.tmpl", ExportFormat::Paged))
        .unwrap_err();
    assert!(matches!(err, ReportError::InvalidTemplate(_)));
    assert!(err.is_client_error());
}

#[test]
fn test_non_object_record_is_invalid_input() {
    let (_dir, service) = service();
    let request =
        ExportRequest::new("invoice.tmpl", ExportFormat::Paged).with_records(vec![json!("row")]);
    assert!(matches!(
        service.export(&request),
        Err(ReportError::InvalidInput(_))
    ));
}

#[test]
fn test_template_management() {
    let (_dir, service) = service();
    service.upload("a.jrxml", INVOICE.as_bytes()).unwrap();
    assert_eq!(service.list().unwrap(), vec!["a.jrxml", "invoice.tmpl"]);

    // Re-upload replaces the content
    service.upload("a.jrxml", GREETING.as_bytes()).unwrap();
    assert_eq!(service.list().unwrap(), vec!["a.jrxml", "invoice.tmpl"]);
    assert!(service.fields("a.jrxml").unwrap().is_empty());

    assert!(service.delete("a.jrxml").unwrap());
    assert!(!service.delete("ghost.tmpl").unwrap());
    assert_eq!(service.list().unwrap(), vec!["invoice.tmpl"]);
}

#[test]
fn test_font_failure_then_other_failure_fails_once() {
    let engine = Arc::new(ScriptedEngine::failing_with(vec![
        TemplateError::FontError("font 'Tahoma' not found".into()),
        TemplateError::FillError("division by zero".into()),
    ]));
    let (_dir, service) = scripted_service(engine.clone(), CapabilityScope::Process);

    let err = service.export(&invoice_request(ExportFormat::Paged)).unwrap_err();
    assert!(matches!(err, ReportError::FillFailed(ref msg) if msg.contains("division by zero")));
    assert_eq!(engine.fill_calls(), 2);
}

#[test]
fn test_non_font_failure_is_not_retried() {
    let engine = Arc::new(ScriptedEngine::failing_with(vec![TemplateError::FillError(
        "division by zero".into(),
    )]));
    let (_dir, service) = scripted_service(engine.clone(), CapabilityScope::Process);

    assert!(matches!(
        service.export(&invoice_request(ExportFormat::Paged)),
        Err(ReportError::FillFailed(_))
    ));
    assert_eq!(engine.fill_calls(), 1);
}

#[test]
fn test_degraded_capabilities_are_remembered() {
    let engine = Arc::new(ScriptedEngine::failing_with(vec![TemplateError::FontError(
        "missing glyph".into(),
    )]));
    let (_dir, service) = scripted_service(engine.clone(), CapabilityScope::Process);
    service.upload("other.tmpl", INVOICE.as_bytes()).unwrap();

    service.export(&invoice_request(ExportFormat::Paged)).unwrap();
    assert_eq!(engine.fill_calls(), 2);

    let mut other = invoice_request(ExportFormat::Paged);
    other.template_name = "other.tmpl".into();
    service.export(&other).unwrap();
    assert_eq!(engine.fill_calls(), 3);

    let strict = RenderingCapabilities {
        ignore_missing_fonts: false,
        headless: true,
    };
    assert_eq!(
        *engine.caps.lock().unwrap(),
        vec![
            strict,
            RenderingCapabilities::degraded(),
            RenderingCapabilities::degraded()
        ]
    );
}

#[test]
fn test_template_scope_keeps_other_templates_strict() {
    let engine = Arc::new(ScriptedEngine::failing_with(vec![TemplateError::FontError(
        "missing glyph".into(),
    )]));
    let (_dir, service) = scripted_service(engine.clone(), CapabilityScope::Template);
    service.upload("other.tmpl", INVOICE.as_bytes()).unwrap();

    service.export(&invoice_request(ExportFormat::Paged)).unwrap();
    let mut other = invoice_request(ExportFormat::Paged);
    other.template_name = "other.tmpl".into();
    service.export(&other).unwrap();

    let caps = engine.caps.lock().unwrap().clone();
    assert_eq!(caps.len(), 3);
    assert_eq!(caps[1], RenderingCapabilities::degraded());
    assert!(!caps[2].ignore_missing_fonts);
}

#[test]
fn test_retry_rereads_records_from_the_start() {
    let engine = Arc::new(ScriptedEngine::failing_with(vec![TemplateError::FontError(
        "missing glyph".into(),
    )]));
    let (_dir, service) = scripted_service(engine.clone(), CapabilityScope::Process);

    service.export(&invoice_request(ExportFormat::Markup)).unwrap();
    assert_eq!(engine.records.lock().unwrap().len(), 1);
}

#[test]
fn test_unencodable_text_recovers_with_real_engine() {
    let (_dir, service) = service();
    service.upload("greeting.jrxml", GREETING.as_bytes()).unwrap();

    let pdf = service
        .export_paged(&ExportRequest::new("greeting.jrxml", ExportFormat::Paged))
        .unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
}

#[test]
fn test_font_failure_is_retried_when_already_degraded() {
    let engine = Arc::new(ScriptedEngine::failing_with(vec![TemplateError::FontError(
        "Font 'X' transient".into(),
    )]));
    let (_dir, service) = scripted_service_with(engine.clone(), |config| {
        config.rendering.ignore_missing_fonts = true;
        config.rendering.headless = true;
    });

    service.export(&invoice_request(ExportFormat::Paged)).unwrap();
    assert_eq!(engine.fill_calls(), 2);
    assert_eq!(
        *engine.caps.lock().unwrap(),
        vec![RenderingCapabilities::degraded(); 2]
    );
}

#[test]
fn test_degraded_cache_still_retries_font_failures() {
    let engine = Arc::new(ScriptedEngine::failing_with(vec![
        TemplateError::FontError("missing glyph".into()),
    ]));
    let (_dir, service) = scripted_service(engine.clone(), CapabilityScope::Process);
    service.export(&invoice_request(ExportFormat::Paged)).unwrap();
    assert_eq!(engine.fill_calls(), 2);

    engine
        .failures
        .lock()
        .unwrap()
        .push_back(TemplateError::FontError("missing glyph".into()));
    service.export(&invoice_request(ExportFormat::Paged)).unwrap();
    assert_eq!(engine.fill_calls(), 4);
}

#[test]
fn test_pagination_is_always_on() {
    let engine = Arc::new(ScriptedEngine::default());
    let (_dir, service) = scripted_service(engine.clone(), CapabilityScope::Process);

    let request = invoice_request(ExportFormat::Paged)
        .with_parameter("IS_IGNORE_PAGINATION", json!(true))
        .with_parameter("TITLE", json!("Receipt"));
    service.export(&request).unwrap();

    let parameters = engine.parameters.lock().unwrap().clone();
    assert_eq!(parameters.len(), 1);
    assert_eq!(parameters[0].get("IS_IGNORE_PAGINATION"), Some(&Value::Bool(false)));
    assert_eq!(parameters[0].get("TITLE"), Some(&Value::from("Receipt")));
}

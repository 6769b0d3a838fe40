use report::{ReportConfig, ReportService};
use std::sync::Arc;

/// Shared application state accessible to all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: ReportService,

    pub config: Arc<ReportConfig>,
}

impl AppState {
    pub fn new(config: ReportConfig) -> report::Result<Self> {
        let service = ReportService::from_config(&config)?;
        Ok(Self {
            service,
            config: Arc::new(config),
        })
    }

    /// Largest accepted request body in bytes
    pub fn body_limit(&self) -> usize {
        self.config.server.max_upload_mb * 1024 * 1024
    }
}

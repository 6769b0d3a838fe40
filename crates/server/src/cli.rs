//! CLI interface and argument parsing

use crate::state::AppState;
use anyhow::Context;
use clap::{Parser, Subcommand};
use report::{ExportRequest, ReportConfig, ReportService};
use std::path::PathBuf;

/// Report Server - fill report templates with data and export PDF or HTML
#[derive(Parser, Debug)]
#[command(name = "report-server")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "report.toml", env = "REPORT_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "REPORT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Store a template file
    Upload {
        /// Template file; stored under its file name
        file: PathBuf,
    },

    /// List stored templates
    List,

    /// Delete a stored template
    Delete { name: String },

    /// Show the declared fields of a template
    Fields { name: String },

    /// Export a report described by a JSON request file
    Export {
        /// Export request (templateName, parameters, dataRecords, format)
        #[arg(short, long)]
        request: PathBuf,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,
    },
}

impl Commands {
    pub async fn execute(self, mut config: ReportConfig) -> anyhow::Result<()> {
        match self {
            Commands::Serve { port } => {
                if let Some(port) = port {
                    config.server.port = port;
                }
                serve(config).await
            }
            Commands::Upload { file } => {
                let name = file
                    .file_name()
                    .and_then(|name| name.to_str())
                    .with_context(|| format!("{} has no usable file name", file.display()))?
                    .to_string();
                let content = std::fs::read(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let stored = service(&config)?.upload(&name, &content)?;
                println!("Uploaded {stored}");
                Ok(())
            }
            Commands::List => {
                for name in service(&config)?.list()? {
                    println!("{name}");
                }
                Ok(())
            }
            Commands::Delete { name } => {
                if service(&config)?.delete(&name)? {
                    println!("Deleted {name}");
                    Ok(())
                } else {
                    anyhow::bail!("Template '{name}' not found")
                }
            }
            Commands::Fields { name } => {
                for field in service(&config)?.fields(&name)? {
                    println!("{}\t{:?}", field.name, field.field_type);
                }
                Ok(())
            }
            Commands::Export { request, out } => {
                let body = std::fs::read_to_string(&request)
                    .with_context(|| format!("Failed to read {}", request.display()))?;
                let request: ExportRequest =
                    serde_json::from_str(&body).context("Invalid export request")?;
                let result = service(&config)?.export(&request)?;
                let bytes = result.len();
                std::fs::write(&out, result.into_bytes())
                    .with_context(|| format!("Failed to write {}", out.display()))?;
                println!("Wrote {bytes} bytes to {}", out.display());
                Ok(())
            }
        }
    }
}

fn service(config: &ReportConfig) -> anyhow::Result<ReportService> {
    ReportService::from_config(config).context("Failed to initialize report service")
}

async fn serve(config: ReportConfig) -> anyhow::Result<()> {
    let addr = config.server.bind_address();
    let state = AppState::new(config).context("Failed to initialize report service")?;
    let app = crate::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("Report service listening on {}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  - POST   /api/reports/upload");
    tracing::info!("  - GET    /api/reports/list");
    tracing::info!("  - DELETE /api/reports/delete/:name");
    tracing::info!("  - GET    /api/reports/fields/:name");
    tracing::info!("  - POST   /api/reports/export");
    tracing::info!("  - POST   /api/reports/export-pdf-with-data");
    tracing::info!("  - POST   /api/reports/export-html-with-data");
    tracing::info!("  - GET    /health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Report service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

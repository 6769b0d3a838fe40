//! Service configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed with `REPORT` using `__` between sections,
//! e.g. `REPORT__STORAGE__UPLOAD_DIR=/srv/templates`.

use crate::{ReportError, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use template::{FontCatalog, RenderingCapabilities};

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "REPORT";

/// Where font fallback state is remembered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityScope {
    /// One state shared by every template
    #[default]
    Process,
    /// One state per template name
    Template,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub storage: StorageConfig,
    pub rendering: RenderingConfig,
    pub export: ExportConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding uploaded templates
    pub upload_dir: PathBuf,
    /// Recognised template file extensions, without the dot
    pub extensions: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            extensions: vec!["jrxml".to_string(), "tmpl".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderingConfig {
    pub font_dirs: Vec<PathBuf>,
    pub system_font_dirs: Vec<PathBuf>,
    pub default_font: String,
    pub ignore_missing_fonts: bool,
    pub headless: bool,
    pub capability_scope: CapabilityScope,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            font_dirs: Vec::new(),
            system_font_dirs: FontCatalog::default_system_font_dirs(),
            default_font: "Helvetica".to_string(),
            ignore_missing_fonts: false,
            headless: false,
            capability_scope: CapabilityScope::default(),
        }
    }
}

impl RenderingConfig {
    /// Capabilities a fill starts with
    pub fn capabilities(&self) -> RenderingCapabilities {
        RenderingCapabilities {
            ignore_missing_fonts: self.ignore_missing_fonts,
            headless: self.headless,
        }
    }

    pub fn font_catalog(&self) -> FontCatalog {
        FontCatalog::new(self.default_font.clone())
            .with_font_dirs(self.font_dirs.clone())
            .with_system_font_dirs(self.system_font_dirs.clone())
    }
}

/// PDF document metadata
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub title: String,
    pub author: String,
    pub compress: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: "Report".to_string(),
            author: "Report Service".to_string(),
            compress: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_mb: 10,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level or filter directive, e.g. `info` or `report=debug`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ReportConfig {
    /// Load the configuration
    ///
    /// A missing file is not an error; the defaults and environment apply.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: Self = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text, without environment overrides
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.extensions.is_empty() {
            return Err(ReportError::Config(
                "storage.extensions must not be empty".to_string(),
            ));
        }
        if self
            .storage
            .extensions
            .iter()
            .any(|ext| ext.trim().is_empty() || ext.contains('.'))
        {
            return Err(ReportError::Config(
                "storage.extensions entries must be bare extensions like \"jrxml\"".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(ReportError::Config("server.port must not be 0".to_string()));
        }
        if self.server.max_upload_mb == 0 {
            return Err(ReportError::Config(
                "server.max_upload_mb must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("storage.extensions")
        .with_list_parse_key("rendering.font_dirs")
        .with_list_parse_key("rendering.system_font_dirs")
}

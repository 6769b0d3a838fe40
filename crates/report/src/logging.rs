//! Logging setup for the binaries
//!
//! `RUST_LOG` takes precedence over the configured level.
//!
//! # Example
//!
//! ```no_run
//! use report::config::LoggingConfig;
//! use report::logging::init_logging;
//!
//! init_logging(&LoggingConfig::default()).expect("Failed to initialize logging");
//! ```

use crate::config::LoggingConfig;
use crate::{ReportError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Install the global subscriber
///
/// Fails when the level is not a valid filter or a subscriber is already
/// installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(&config.level)?,
    };

    let layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .map_err(|e| ReportError::Config(format!("failed to initialise logging: {e}")))?;

    tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    Ok(())
}

/// Filter for a bare level or a full directive string
fn build_filter(level: &str) -> Result<EnvFilter> {
    let level = level.trim();
    let directive = match level.to_ascii_lowercase().as_str() {
        lvl @ ("trace" | "debug" | "info" | "warn" | "error") => {
            format!("{lvl},tower_http=info,lopdf=warn")
        }
        _ => level.to_string(),
    };
    EnvFilter::try_new(&directive)
        .map_err(|e| ReportError::Config(format!("invalid log level '{level}': {e}")))
}

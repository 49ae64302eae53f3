//! Logging configuration.

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::TelemetryError;

/// The `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level filter (trace, debug, info, warn/warning, error)
    pub level: String,

    /// Leave `/healthcheck` requests out of the access log
    pub healthchecks: bool,

    /// JSON lines on stdout; `false` selects the human-readable formatter
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            healthchecks: false,
            json: true,
        }
    }
}

impl LoggingConfig {
    /// Parsed level. Case-insensitive; empty means `info`.
    pub fn level(&self) -> Result<Level, TelemetryError> {
        parse_level(&self.level)
    }
}

pub fn parse_level(level: &str) -> Result<Level, TelemetryError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "" | "info" => Ok(Level::INFO),
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(TelemetryError::Config(format!(
            "invalid log level: {}",
            other
        ))),
    }
}

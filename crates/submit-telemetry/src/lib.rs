//! # Submit Telemetry
//!
//! Logging and metrics for the transaction submit API.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use submit_telemetry::{init_logging, register_metrics, LoggingConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LoggingConfig::default())?;
//!     register_metrics()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable   | Default | Description                          |
//! |------------|---------|--------------------------------------|
//! | `RUST_LOG` | unset   | Overrides the configured level filter |

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod config;
mod logging;
pub mod metrics;

pub use config::{parse_level, LoggingConfig};
pub use logging::init_logging;
pub use metrics::{
    gather_text, register_metrics, text_content_type, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION, HTTP_SLOW_REQUESTS, TX_SUBMIT_COUNT, TX_SUBMIT_FAIL_COUNT,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

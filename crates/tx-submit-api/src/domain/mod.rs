//! Domain types for the submit API.
//!
//! Configuration, request outcomes and the error types the HTTP layer
//! renders. Nothing here performs I/O except [`config::Config::load`].

pub mod config;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use config::{ApiConfig, Config, ConfigError, MetricsConfig, NodeConfig};
pub use error::{ApiError, ApiResult, GatewayError};
pub use types::{HasTxOutcome, NodeTarget, SubmissionOutcome};

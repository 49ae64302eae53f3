//! Gateway error types.
//!
//! Request failures never surface as Rust errors: the orchestrators fold them
//! into an outcome and the HTTP layer renders that outcome as an [`ApiError`].
//! [`GatewayError`] covers startup only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::fmt;

use crate::domain::config::ConfigError;

/// HTTP error response. The body is a bare JSON string, which is what
/// existing clients of this API parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 404
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 415
    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, message)
    }

    /// 500
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// The node did not answer in time.
    pub fn gateway_timeout() -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, "timed out waiting for node")
    }

    /// Transport failure towards the node. The cause is logged, not returned.
    pub fn node_unreachable() -> Self {
        Self::internal("failure communicating with node")
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.message)).into_response()
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Service-level errors (startup, binding)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Node unreachable during the startup check
    #[error("node check failed: {0}")]
    NodeCheck(String),

    /// Logging or metrics setup failed
    #[error("telemetry error: {0}")]
    Telemetry(#[from] submit_telemetry::TelemetryError),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

//! HTTP middleware.
//!
//! Layer order on the API router, outermost first:
//! panic recovery → CORS → access log → HTTP metrics → body limit → handler.

pub mod access_log;
pub mod cors;
pub mod metrics;

#[cfg(test)]
pub(crate) mod testing;

pub use access_log::{AccessLogLayer, HEALTHCHECK_PATH};
pub use cors::create_cors_layer;
pub use metrics::HttpMetricsLayer;

//! CORS for browser clients.
//!
//! Every origin is allowed. The htmx request headers are allowed alongside
//! `Content-Type` so pages can post transactions directly.

use axum::http::{header, HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};

const HTMX_HEADERS: [&str; 4] = ["hx-current-url", "hx-request", "hx-target", "hx-trigger"];

/// Create the CORS layer shared by the API and metrics listeners
pub fn create_cors_layer() -> CorsLayer {
    let mut headers: Vec<HeaderName> = HTMX_HEADERS
        .into_iter()
        .map(HeaderName::from_static)
        .collect();
    headers.push(header::CONTENT_TYPE);

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(headers)
}

//! Prometheus metrics.
//!
//! `tx_submit_count` and `tx_submit_fail_count` keep their historical names
//! and gauge type so existing dashboards keep working.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // SUBMISSION METRICS
    // =========================================================================

    /// Transactions accepted by the node
    pub static ref TX_SUBMIT_COUNT: Gauge = Gauge::new(
        "tx_submit_count",
        "transactions submitted"
    ).expect("metric creation failed");

    /// Submissions that did not end in acceptance
    pub static ref TX_SUBMIT_FAIL_COUNT: Gauge = Gauge::new(
        "tx_submit_fail_count",
        "transactions failed"
    ).expect("metric creation failed");

    // =========================================================================
    // HTTP METRICS
    // =========================================================================

    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("http_requests_total", "HTTP requests by method, path and status"),
        &["method", "path", "status"]
    ).expect("metric creation failed");

    pub static ref HTTP_REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency"
        ).buckets(exponential_buckets(0.001, 2.0, 16).expect("valid buckets")),
        &["method", "path"]
    ).expect("metric creation failed");

    /// Requests slower than the configured threshold
    pub static ref HTTP_SLOW_REQUESTS: CounterVec = CounterVec::new(
        Opts::new("http_slow_requests_total", "HTTP requests over the slow threshold"),
        &["method", "path"]
    ).expect("metric creation failed");
}

/// Registers every metric with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(TX_SUBMIT_COUNT.clone()),
        Box::new(TX_SUBMIT_FAIL_COUNT.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_SLOW_REQUESTS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Renders all registered metrics in the text exposition format.
pub fn gather_text() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Content type of [`gather_text`] output.
pub fn text_content_type() -> String {
    TextEncoder::new().format_type().to_string()
}

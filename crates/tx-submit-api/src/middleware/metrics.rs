//! Prometheus HTTP metrics.
//!
//! Requests are labelled by matched route (`/api/hastx/:tx_hash`) rather
//! than raw path so transaction hashes do not explode label cardinality.
//! Healthcheck probes are not instrumented.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    response::Response,
};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use submit_telemetry::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION, HTTP_SLOW_REQUESTS};
use tower::{Layer, Service};
use tracing::warn;

use crate::middleware::access_log::HEALTHCHECK_PATH;

/// Label used for requests that matched no route
const UNMATCHED: &str = "unmatched";

/// HTTP metrics layer
#[derive(Debug, Clone, Copy)]
pub struct HttpMetricsLayer {
    slow_threshold: Duration,
}

impl HttpMetricsLayer {
    pub fn new(slow_threshold: Duration) -> Self {
        Self { slow_threshold }
    }
}

impl<S> Layer<S> for HttpMetricsLayer {
    type Service = HttpMetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpMetricsService {
            inner,
            slow_threshold: self.slow_threshold,
        }
    }
}

#[derive(Clone)]
pub struct HttpMetricsService<S> {
    inner: S,
    slow_threshold: Duration,
}

impl<S> Service<Request<Body>> for HttpMetricsService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // the readied service handles this request; the clone waits for the next poll_ready
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        if req.uri().path() == HEALTHCHECK_PATH {
            return Box::pin(async move { inner.call(req).await });
        }

        let slow_threshold = self.slow_threshold;
        let method = req.method().to_string();
        let path = route_label(&req);
        let start = Instant::now();

        Box::pin(async move {
            let result = inner.call(req).await;
            if let Ok(response) = &result {
                let elapsed = start.elapsed();
                record(
                    &method,
                    &path,
                    response.status().as_u16(),
                    elapsed,
                    slow_threshold,
                );
            }
            result
        })
    }
}

fn route_label<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED.to_string())
}

fn record(method: &str, path: &str, status: u16, elapsed: Duration, slow_threshold: Duration) {
    let status = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method, path])
        .observe(elapsed.as_secs_f64());

    if elapsed > slow_threshold {
        HTTP_SLOW_REQUESTS.with_label_values(&[method, path]).inc();
        warn!(
            method = method,
            path = path,
            latency = ?elapsed,
            threshold = ?slow_threshold,
            "Slow request"
        );
    }
}

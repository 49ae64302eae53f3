//! One structured log line per HTTP request.
//!
//! Fields: `status`, `method`, `path`, `query`, `ip`, `user_agent`,
//! `latency`, `size`. Healthcheck probes can be left out so load balancer
//! polling does not drown the log.

use axum::{
    body::{Body, HttpBody},
    extract::ConnectInfo,
    http::{header, HeaderMap, Request},
    response::Response,
};
use std::net::SocketAddr;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::info;

pub const HEALTHCHECK_PATH: &str = "/healthcheck";

/// Access log layer
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLogLayer {
    skip_healthchecks: bool,
}

impl AccessLogLayer {
    /// With `skip_healthchecks` set, requests to `/healthcheck` are not logged.
    pub fn new(skip_healthchecks: bool) -> Self {
        Self { skip_healthchecks }
    }
}

impl<S> Layer<S> for AccessLogLayer {
    type Service = AccessLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessLogService {
            inner,
            skip_healthchecks: self.skip_healthchecks,
        }
    }
}

#[derive(Clone)]
pub struct AccessLogService<S> {
    inner: S,
    skip_healthchecks: bool,
}

impl<S> Service<Request<Body>> for AccessLogService<S>
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

        if self.skip_healthchecks && req.uri().path() == HEALTHCHECK_PATH {
            return Box::pin(async move { inner.call(req).await });
        }

        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().unwrap_or_default().to_string();
        let ip = client_ip(&req);
        let user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let start = Instant::now();

        Box::pin(async move {
            let result = inner.call(req).await;
            if let Ok(response) = &result {
                info!(
                    r#type = "access",
                    status = response.status().as_u16(),
                    method = %method,
                    path = %path,
                    query = %query,
                    ip = %ip,
                    user_agent = %user_agent,
                    latency = ?start.elapsed(),
                    size = response_size(response),
                    "request completed"
                );
            }
            result
        })
    }
}

/// Client address: the first `X-Forwarded-For` hop, then `X-Real-IP`, then
/// the peer address. Empty when none is known.
pub(crate) fn client_ip<B>(req: &Request<B>) -> String {
    if let Some(ip) = forwarded_ip(req.headers()) {
        return ip;
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_default()
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header_value("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return Some(first.to_string());
    }
    header_value("x-real-ip").map(str::to_string)
}

/// Response body size in bytes, or 0 when it is not known up front.
fn response_size(response: &Response) -> u64 {
    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .or_else(|| response.body().size_hint().exact())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::testing::ReadyGuard;
    use axum::{http::StatusCode, routing::get, Router};
    use std::net::{IpAddr, Ipv4Addr};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_call_uses_readied_service() {
        for (skip, path) in [(false, "/"), (true, HEALTHCHECK_PATH)] {
            let response = AccessLogLayer::new(skip)
                .layer(ReadyGuard::default())
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", path);
        }
    }

    fn request(headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::get("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_forwarded_for_first_hop() {
        let req = request(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(client_ip(&req), "203.0.113.7");
    }

    #[test]
    fn test_real_ip_fallback() {
        let req = request(&[("x-real-ip", " 198.51.100.2 ")]);
        assert_eq!(client_ip(&req), "198.51.100.2");
    }

    #[test]
    fn test_peer_address_fallback() {
        let mut req = request(&[("x-forwarded-for", "")]);
        req.extensions_mut().insert(ConnectInfo(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
            40000,
        )));
        assert_eq!(client_ip(&req), "192.0.2.1");
    }

    #[test]
    fn test_unknown_client() {
        assert_eq!(client_ip(&request(&[])), "");
    }

    #[test]
    fn test_response_size() {
        let sized = Response::new(Body::from("abcd"));
        assert_eq!(response_size(&sized), 4);

        let mut declared = Response::new(Body::empty());
        declared
            .headers_mut()
            .insert(header::CONTENT_LENGTH, "12".parse().unwrap());
        assert_eq!(response_size(&declared), 12);
    }

    #[tokio::test]
    async fn test_passes_responses_through() {
        for skip in [false, true] {
            let app = Router::new()
                .route(HEALTHCHECK_PATH, get(|| async { "up" }))
                .route("/teapot", get(|| async { StatusCode::IM_A_TEAPOT }))
                .layer(AccessLogLayer::new(skip));

            let health = app
                .clone()
                .oneshot(Request::get(HEALTHCHECK_PATH).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(health.status(), StatusCode::OK);

            let teapot = app
                .oneshot(Request::get("/teapot?x=1").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(teapot.status(), StatusCode::IM_A_TEAPOT);
        }
    }
}

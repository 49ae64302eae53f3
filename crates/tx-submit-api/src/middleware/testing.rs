//! Inner service for middleware tests.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::future::{ready, Ready};
use std::task::{Context, Poll};
use tower::Service;

/// Answers 200 only when called on the handle that was polled ready,
/// 503 otherwise.
#[derive(Debug, Default)]
pub(crate) struct ReadyGuard {
    readied: bool,
}

impl Clone for ReadyGuard {
    // readiness is not shared between handles
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl Service<Request<Body>> for ReadyGuard {
    type Response = Response;
    type Error = Infallible;
    type Future = Ready<Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        self.readied = true;
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: Request<Body>) -> Self::Future {
        let status = if std::mem::take(&mut self.readied) {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        ready(Ok(status.into_response()))
    }
}

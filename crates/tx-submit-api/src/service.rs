//! Submit API service: HTTP routes, listeners and shutdown.
//!
//! Two listeners run side by side. The API listener serves
//! `POST /api/submit/tx`, `GET /api/hastx/:tx_hash` and `GET /healthcheck`;
//! the metrics listener serves the Prometheus registry at `GET /`.

use crate::adapters::LedgerEraClassifier;
use crate::domain::config::Config;
use crate::domain::error::{ApiError, GatewayError};
use crate::domain::types::{HasTxOutcome, NodeTarget, SubmissionOutcome};
use crate::middleware::{create_cors_layer, AccessLogLayer, HttpMetricsLayer, HEALTHCHECK_PATH};
use crate::orchestrator::{HasTxOrchestrator, SubmitOrchestrator};
use crate::ports::SessionFactory;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::any::Any;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use submit_telemetry::{gather_text, text_content_type, TX_SUBMIT_COUNT, TX_SUBMIT_FAIL_COUNT};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, info, warn};

/// Media type of serialized transactions and rejection reasons
pub const CBOR: &str = "application/cbor";

pub const SUBMIT_TX_PATH: &str = "/api/submit/tx";
pub const HAS_TX_PATH: &str = "/api/hastx/:tx_hash";

/// Submit API service
pub struct SubmitApiService {
    config: Config,
    state: AppState,
}

impl SubmitApiService {
    /// Create the service. Node sessions come from `sessions`, one per
    /// request.
    pub fn new(config: Config, sessions: Arc<dyn SessionFactory>) -> Result<Self, GatewayError> {
        config.validate()?;
        let timeout = config.node.timeout()?;
        let target = config.node.target();

        let state = AppState {
            submit: SubmitOrchestrator::new(
                Arc::new(LedgerEraClassifier),
                Arc::clone(&sessions),
                target.clone(),
                timeout,
            )?,
            has_tx: HasTxOrchestrator::new(sessions, target, timeout)?,
        };

        Ok(Self { config, state })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Router for the API listener
    pub fn api_router(&self) -> Router {
        let routes = Router::new()
            .route(SUBMIT_TX_PATH, post(handle_submit_tx))
            .route(HAS_TX_PATH, get(handle_has_tx))
            .route(HEALTHCHECK_PATH, get(handle_healthcheck));

        with_layers(routes, &self.config).with_state(self.state.clone())
    }

    /// Router for the metrics listener
    pub fn metrics_router(&self) -> Router {
        Router::new()
            .route("/", get(handle_metrics))
            .layer(create_cors_layer())
    }

    /// Serve both listeners until `shutdown` resolves or a server stops.
    pub async fn run<F>(self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send,
    {
        let api_addr = self.config.api.bind_address();
        let metrics_addr = self.config.metrics.bind_address();
        let api_listener = bind(&api_addr).await?;
        let metrics_listener = bind(&metrics_addr).await?;

        if self.config.logging.healthchecks {
            info!("Disabling access logs for {}", HEALTHCHECK_PATH);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut api_handle = serve(api_listener, self.api_router(), stop_rx.clone());
        let mut metrics_handle = serve(metrics_listener, self.metrics_router(), stop_rx);

        info!(
            api = %api_addr,
            metrics = %metrics_addr,
            node = %self.state.submit.target(),
            "Submit API started"
        );

        let result = tokio::select! {
            () = shutdown => {
                info!("Received shutdown signal");
                Ok(())
            }
            result = &mut api_handle => server_exit("API", result),
            result = &mut metrics_handle => server_exit("metrics", result),
        };

        let _ = stop_tx.send(true);
        for handle in [api_handle, metrics_handle] {
            if !handle.is_finished() {
                let _ = handle.await;
            }
        }

        info!("Submit API stopped");
        result
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    submit: SubmitOrchestrator,
    has_tx: HasTxOrchestrator,
}

/// Outermost first: panic recovery, CORS, access log, HTTP metrics, body limit.
fn with_layers<S>(router: Router<S>, config: &Config) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let middleware = ServiceBuilder::new()
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(create_cors_layer())
        .layer(AccessLogLayer::new(config.logging.healthchecks))
        .layer(HttpMetricsLayer::new(config.metrics.slow_request_threshold()))
        .layer(DefaultBodyLimit::max(config.api.max_request_size));

    router.layer(middleware)
}

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
    ApiError::internal("internal server error").into_response()
}

async fn handle_submit_tx(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    if !has_media_type(&headers, header::CONTENT_TYPE, CBOR) {
        warn!("invalid request body, should be application/cbor");
        TX_SUBMIT_FAIL_COUNT.inc();
        return ApiError::unsupported_media_type("invalid request body, should be application/cbor")
            .into_response();
    }

    let tx = match body {
        Ok(tx) => tx,
        Err(rejection) => {
            TX_SUBMIT_FAIL_COUNT.inc();
            return body_error(&rejection).into_response();
        }
    };

    let outcome = state.submit.submit(&tx).await;
    if outcome.is_accepted() {
        TX_SUBMIT_COUNT.inc();
    } else {
        TX_SUBMIT_FAIL_COUNT.inc();
    }

    submission_response(outcome, has_media_type(&headers, header::ACCEPT, CBOR))
}

fn body_error(rejection: &BytesRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!(error = %rejection.body_text(), "request body too large");
        ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
    } else {
        error!(error = %rejection.body_text(), "failed to read request body");
        ApiError::internal("failed to read request body")
    }
}

fn submission_response(outcome: SubmissionOutcome, wants_cbor: bool) -> Response {
    match outcome {
        SubmissionOutcome::Accepted { tx_id } => {
            (StatusCode::ACCEPTED, Json(tx_id.to_string())).into_response()
        }
        SubmissionOutcome::Rejected {
            reason_cbor,
            reason,
        } => {
            if wants_cbor {
                (
                    StatusCode::BAD_REQUEST,
                    [(header::CONTENT_TYPE, CBOR)],
                    reason_cbor,
                )
                    .into_response()
            } else {
                ApiError::bad_request(reason).into_response()
            }
        }
        SubmissionOutcome::ClassificationFailure { reason }
        | SubmissionOutcome::ValidationFailure { reason } => {
            ApiError::bad_request(reason).into_response()
        }
        SubmissionOutcome::TransportFailure { .. } => ApiError::node_unreachable().into_response(),
        SubmissionOutcome::Timeout => ApiError::gateway_timeout().into_response(),
    }
}

async fn handle_has_tx(
    State(state): State<AppState>,
    Path(tx_hash): Path<String>,
) -> Result<Json<&'static str>, ApiError> {
    match state.has_tx.has_tx(&tx_hash).await {
        HasTxOutcome::Found => Ok(Json("transaction found in mempool")),
        HasTxOutcome::NotFound => Err(ApiError::not_found("transaction not found in mempool")),
        HasTxOutcome::ValidationFailure { reason } => Err(ApiError::bad_request(format!(
            "invalid transaction hash: {}",
            reason
        ))),
        HasTxOutcome::TransportFailure { .. } => Err(ApiError::node_unreachable()),
        HasTxOutcome::Timeout => Err(ApiError::gateway_timeout()),
    }
}

async fn handle_healthcheck() -> impl IntoResponse {
    Json(serde_json::json!({ "failed": false }))
}

async fn handle_metrics() -> Result<impl IntoResponse, ApiError> {
    let body = gather_text().map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, text_content_type())], body))
}

/// Whether the header's media type, parameters aside, is `expected`.
fn has_media_type(headers: &HeaderMap, name: HeaderName, expected: &str) -> bool {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

async fn bind(addr: &str) -> Result<TcpListener, GatewayError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| GatewayError::Bind(format!("{}: {}", addr, e)))
}

fn serve(
    listener: TcpListener,
    router: Router,
    stop: watch::Receiver<bool>,
) -> JoinHandle<io::Result<()>> {
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(stopped(stop))
        .await
    })
}

async fn stopped(mut stop: watch::Receiver<bool>) {
    while !*stop.borrow() {
        if stop.changed().await.is_err() {
            break;
        }
    }
}

fn server_exit(
    name: &str,
    result: Result<io::Result<()>, tokio::task::JoinError>,
) -> Result<(), GatewayError> {
    let message = match result {
        Ok(Ok(())) => format!("{} server stopped unexpectedly", name),
        Ok(Err(e)) => format!("{} server error: {}", name, e),
        Err(e) => format!("{} server task failed: {}", name, e),
    };
    error!(error = %message, "Server exited");
    Err(GatewayError::Internal(message))
}

/// Completes on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Dials the node once and hangs up. A UNIX socket path must exist first.
pub async fn check_node(
    sessions: &dyn SessionFactory,
    target: &NodeTarget,
    timeout: Duration,
) -> Result<(), GatewayError> {
    if let NodeTarget::Unix(path) = target {
        match tokio::fs::metadata(path).await {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(GatewayError::NodeCheck(format!(
                    "node socket path does not exist: {}",
                    path.display()
                )));
            }
            Err(e) => {
                return Err(GatewayError::NodeCheck(format!(
                    "unknown error checking if node socket path exists: {}",
                    e
                )));
            }
        }
    }

    let mut session = sessions.create();
    let dialed = tokio::time::timeout(timeout, session.dial(target)).await;
    session.close();

    match dialed {
        Ok(Ok(())) => {
            info!(node = %target, "Node reachable");
            Ok(())
        }
        Ok(Err(e)) => Err(GatewayError::NodeCheck(e.to_string())),
        Err(_) => Err(GatewayError::NodeCheck(format!(
            "timed out connecting to {} socket {}",
            target.transport(),
            target
        ))),
    }
}

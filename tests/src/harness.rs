//! Shared fixtures for the end-to-end tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use node_client::testing::FakeNode;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use tx_submit_api::{Config, NodeClientSessions, SubmitApiService};

/// A fake node and the task accepting its connections. The task is aborted
/// on drop.
pub struct RunningNode {
    pub node: FakeNode,
    task: JoinHandle<()>,
}

impl Drop for RunningNode {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Serves `node` on a UNIX socket at `path`.
#[cfg(unix)]
pub fn listen_unix(node: FakeNode, path: &Path) -> RunningNode {
    let task = node.listen_unix(path).expect("bind fake node socket");
    RunningNode { node, task }
}

/// Serves `node` on an ephemeral loopback TCP port.
pub async fn listen_tcp(node: FakeNode) -> (RunningNode, u16) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake node port");
    let port = listener.local_addr().expect("local address").port();
    let serving = node.clone();
    let task = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let node = serving.clone();
            tokio::spawn(async move {
                let _ = node.serve(stream).await;
            });
        }
    });
    (RunningNode { node, task }, port)
}

/// Config pointing at a UNIX socket with a short node timeout.
pub fn unix_config(socket: PathBuf, timeout_secs: i64) -> Config {
    let mut config = Config::default();
    config.node.socket_path = Some(socket);
    config.node.timeout = timeout_secs;
    config
}

/// API router backed by real node client sessions.
pub fn api_router(config: Config) -> Router {
    let magic = config.node.network_magic().expect("known network");
    let sessions = Arc::new(NodeClientSessions::new(magic));
    SubmitApiService::new(config, sessions)
        .expect("valid config")
        .api_router()
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Reply {
    /// Body decoded as a JSON string.
    pub fn text(&self) -> String {
        serde_json::from_slice(&self.body).expect("JSON string body")
    }
}

pub async fn send(router: Router, request: Request<Body>) -> Reply {
    let response = router.oneshot(request).await.expect("infallible router");
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("buffer body");
    Reply {
        status,
        headers,
        body,
    }
}

pub fn submit_request(tx: Vec<u8>) -> Request<Body> {
    Request::post("/api/submit/tx")
        .header("content-type", "application/cbor")
        .body(Body::from(tx))
        .expect("valid request")
}

pub fn has_tx_request(tx_hash: &str) -> Request<Body> {
    Request::get(format!("/api/hastx/{}", tx_hash))
        .body(Body::empty())
        .expect("valid request")
}

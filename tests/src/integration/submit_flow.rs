//! # Submission Flow
//!
//! `POST /api/submit/tx` through the full stack:
//!
//! ```text
//! HTTP request → router → SubmitOrchestrator → NodeClient ──UNIX──→ FakeNode
//! ```

use ledger_era::fixtures::{detected_era, transaction};
use ledger_era::{Era, TxId};
use node_client::testing::{FakeNode, SubmitBehavior};
use tx_submit_api::service::CBOR;

use crate::harness::{api_router, listen_unix, send, submit_request, unix_config};

const REASON: [u8; 3] = [0x82, 0x02, 0x80];

#[tokio::test]
async fn test_babbage_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("node.socket");
    let running = listen_unix(FakeNode::accepting(), &socket);
    let fixture = transaction(Era::Babbage);

    let reply = send(
        api_router(unix_config(socket, 5)),
        submit_request(fixture.bytes.clone()),
    )
    .await;

    assert_eq!(reply.status, 202);
    assert_eq!(reply.text(), TxId::from_body(&fixture.body).to_string());
    assert_eq!(
        running.node.submitted(),
        vec![(Era::Babbage.index(), fixture.bytes)]
    );
    assert_eq!(running.node.connections(), 1);
    assert!(submit_telemetry::TX_SUBMIT_COUNT.get() >= 1.0);
}

#[tokio::test]
async fn test_every_era_reaches_node_with_its_tag() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("node.socket");
    let running = listen_unix(FakeNode::accepting(), &socket);
    let router = api_router(unix_config(socket, 5));

    for era in Era::ALL {
        let reply = send(router.clone(), submit_request(transaction(era).bytes)).await;
        assert_eq!(reply.status, 202, "{}", era);
    }

    let tags: Vec<u16> = running.node.submitted().iter().map(|(e, _)| *e).collect();
    let expected: Vec<u16> = Era::ALL
        .iter()
        .map(|era| detected_era(*era).index())
        .collect();
    assert_eq!(tags, expected);
    assert_eq!(running.node.connections(), Era::ALL.len());
}

#[tokio::test]
async fn test_rejection_reason_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("node.socket");
    let _running = listen_unix(
        FakeNode::accepting().with_submit(SubmitBehavior::Reject(REASON.to_vec())),
        &socket,
    );

    let reply = send(
        api_router(unix_config(socket, 5)),
        submit_request(transaction(Era::Conway).bytes),
    )
    .await;

    assert_eq!(reply.status, 400);
    assert_eq!(
        reply.text(),
        format!("transaction rejected: CBOR: {}", hex::encode(REASON))
    );
}

#[tokio::test]
async fn test_rejection_reason_as_cbor() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("node.socket");
    let _running = listen_unix(
        FakeNode::accepting().with_submit(SubmitBehavior::Reject(REASON.to_vec())),
        &socket,
    );
    let mut request = submit_request(transaction(Era::Conway).bytes);
    request
        .headers_mut()
        .insert("accept", CBOR.parse().unwrap());

    let reply = send(api_router(unix_config(socket, 5)), request).await;

    assert_eq!(reply.status, 400);
    assert_eq!(reply.headers["content-type"], CBOR);
    assert_eq!(&reply.body[..], &REASON[..]);
}

#[tokio::test]
async fn test_unparseable_never_connects() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("node.socket");
    let running = listen_unix(FakeNode::accepting(), &socket);

    let reply = send(
        api_router(unix_config(socket, 5)),
        submit_request(vec![0x83, 0x01, 0x02, 0x03]),
    )
    .await;

    assert_eq!(reply.status, 400);
    assert!(reply
        .text()
        .starts_with("could not parse transaction to determine type"));
    assert_eq!(running.node.connections(), 0);
}

#[tokio::test]
async fn test_node_disconnect_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("node.socket");
    let _running = listen_unix(
        FakeNode::accepting().with_submit(SubmitBehavior::Disconnect),
        &socket,
    );

    let reply = send(
        api_router(unix_config(socket, 5)),
        submit_request(transaction(Era::Babbage).bytes),
    )
    .await;

    assert_eq!(reply.status, 500);
    assert_eq!(reply.text(), "failure communicating with node");
}

#[tokio::test]
async fn test_refused_handshake_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("node.socket");
    let running = listen_unix(FakeNode::accepting().refusing_handshake(), &socket);

    let reply = send(
        api_router(unix_config(socket, 5)),
        submit_request(transaction(Era::Babbage).bytes),
    )
    .await;

    assert_eq!(reply.status, 500);
    assert!(running.node.submitted().is_empty());
}

#[tokio::test]
async fn test_missing_socket_is_server_error() {
    let dir = tempfile::tempdir().unwrap();

    let reply = send(
        api_router(unix_config(dir.path().join("absent.socket"), 5)),
        submit_request(transaction(Era::Babbage).bytes),
    )
    .await;

    assert_eq!(reply.status, 500);
    assert_eq!(reply.text(), "failure communicating with node");
}

#[tokio::test]
async fn test_silent_node_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("node.socket");
    let running = listen_unix(
        FakeNode::accepting().with_submit(SubmitBehavior::Hang),
        &socket,
    );

    let reply = send(
        api_router(unix_config(socket, 1)),
        submit_request(transaction(Era::Babbage).bytes),
    )
    .await;

    assert_eq!(reply.status, 504);
    assert_eq!(running.node.submitted().len(), 1);
}

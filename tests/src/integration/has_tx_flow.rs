//! # Mempool Query Flow
//!
//! `GET /api/hastx/:tx_hash` against the local tx monitor of a fake node.

use ledger_era::TxId;
use node_client::testing::FakeNode;

use crate::harness::{api_router, has_tx_request, listen_unix, send, unix_config};

const PRESENT: [u8; 32] = [0x5a; 32];

#[tokio::test]
async fn test_found_and_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("node.socket");
    let running = listen_unix(FakeNode::accepting().with_mempool(vec![PRESENT]), &socket);
    let router = api_router(unix_config(socket, 5));

    let found = send(router.clone(), has_tx_request(&TxId::new(PRESENT).to_string())).await;
    assert_eq!(found.status, 200);
    assert_eq!(found.text(), "transaction found in mempool");

    let missing = send(router, has_tx_request(&TxId::new([0x01; 32]).to_string())).await;
    assert_eq!(missing.status, 404);
    assert_eq!(missing.text(), "transaction not found in mempool");

    assert_eq!(running.node.connections(), 2);
}

#[tokio::test]
async fn test_uppercase_hash_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("node.socket");
    let _running = listen_unix(FakeNode::accepting().with_mempool(vec![PRESENT]), &socket);

    let reply = send(
        api_router(unix_config(socket, 5)),
        has_tx_request(&TxId::new(PRESENT).to_string().to_uppercase()),
    )
    .await;

    assert_eq!(reply.status, 200);
}

#[tokio::test]
async fn test_malformed_hash_never_connects() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("node.socket");
    let running = listen_unix(FakeNode::accepting(), &socket);

    let reply = send(api_router(unix_config(socket, 5)), has_tx_request("abcd")).await;

    assert_eq!(reply.status, 400);
    assert!(reply.text().starts_with("invalid transaction hash: "));
    assert_eq!(running.node.connections(), 0);
}

#[tokio::test]
async fn test_unreachable_node() {
    let dir = tempfile::tempdir().unwrap();

    let reply = send(
        api_router(unix_config(dir.path().join("absent.socket"), 5)),
        has_tx_request(&TxId::new(PRESENT).to_string()),
    )
    .await;

    assert_eq!(reply.status, 500);
    assert_eq!(reply.text(), "failure communicating with node");
}

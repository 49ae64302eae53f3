//! # Startup and Transport Selection
//!
//! The startup node check and the TCP transport, both against a fake node.

use std::time::Duration;

use ledger_era::fixtures::transaction;
use ledger_era::Era;
use node_client::testing::FakeNode;
use tx_submit_api::{check_node, Config, GatewayError, NodeClientSessions, NodeTarget};

use crate::harness::{api_router, listen_tcp, send, submit_request};

const MAINNET_MAGIC: u32 = 764_824_073;

#[tokio::test]
async fn test_check_node_over_tcp() {
    let (running, port) = listen_tcp(FakeNode::accepting()).await;
    let target = NodeTarget::Tcp {
        host: "127.0.0.1".into(),
        port,
    };

    check_node(
        &NodeClientSessions::new(MAINNET_MAGIC),
        &target,
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    assert_eq!(running.node.connections(), 1);
}

#[tokio::test]
async fn test_check_node_refused_handshake() {
    let (_running, port) = listen_tcp(FakeNode::accepting().refusing_handshake()).await;
    let target = NodeTarget::Tcp {
        host: "127.0.0.1".into(),
        port,
    };

    let result = check_node(
        &NodeClientSessions::new(MAINNET_MAGIC),
        &target,
        Duration::from_secs(5),
    )
    .await;

    assert!(matches!(result, Err(GatewayError::NodeCheck(_))));
}

#[cfg(unix)]
#[tokio::test]
async fn test_check_node_missing_socket() {
    let dir = tempfile::tempdir().unwrap();
    let target = NodeTarget::Unix(dir.path().join("node.socket"));

    let result = check_node(
        &NodeClientSessions::new(MAINNET_MAGIC),
        &target,
        Duration::from_secs(5),
    )
    .await;

    match result {
        Err(GatewayError::NodeCheck(message)) => {
            assert!(message.starts_with("node socket path does not exist"), "{}", message)
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_submit_over_tcp() {
    let (running, port) = listen_tcp(FakeNode::accepting()).await;
    let mut config = Config::default();
    config.node.address = Some("127.0.0.1".into());
    config.node.port = port;
    config.node.timeout = 5;

    let reply = send(
        api_router(config),
        submit_request(transaction(Era::Alonzo).bytes),
    )
    .await;

    assert_eq!(reply.status, 202);
    assert_eq!(running.node.submitted().len(), 1);
}

#[tokio::test]
async fn test_socket_path_wins_over_tcp() {
    let (running, port) = listen_tcp(FakeNode::accepting()).await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.node.address = Some("127.0.0.1".into());
    config.node.port = port;
    config.node.socket_path = Some(dir.path().join("absent.socket"));
    config.node.timeout = 5;

    let reply = send(
        api_router(config),
        submit_request(transaction(Era::Alonzo).bytes),
    )
    .await;

    assert_eq!(reply.status, 500);
    assert_eq!(running.node.connections(), 0);
}

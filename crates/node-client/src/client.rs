//! A multiplexed connection to a node.
//!
//! ```text
//!               ┌────────────┐  (protocol, message)   ┌──────────────┐
//!  submit_tx ──►│ NodeClient │───── mpsc ────────────►│ writer task  │──► bearer
//!  has_tx    ◄──│            │◄──── mpsc per protocol ┌──────────────┐
//!               └────────────┘                        │ demux task   │◄── bearer
//!                     ▲                               └──────┬───────┘
//!                     │ take_errors()                        │
//!                     └────────── error side channel ◄───────┘
//! ```
//!
//! Both I/O tasks publish their terminal error on the side channel and exit.
//! [`NodeClient::close`] aborts them, which drops every sender and so closes
//! the side channel for anyone still waiting on it.

use std::collections::HashMap;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::bearer::{self, NodeAddress};
use crate::error::ClientError;
use crate::mux::{self, Clock};
use crate::protocol::handshake::{MAX_VERSION, MIN_VERSION};
use crate::protocol::{
    protocol_name, violation, HandshakeMessage, Message, MessageBuffer, MonitorMessage,
    RefuseReason, SubmissionMessage, HANDSHAKE, LOCAL_TX_MONITOR, LOCAL_TX_SUBMISSION,
};

const OUTBOUND_CAPACITY: usize = 16;
const INBOUND_CAPACITY: usize = 16;
const ERROR_CAPACITY: usize = 4;

/// Node answer to a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitResult {
    Accepted,
    /// `reason` is the raw CBOR rejection reason.
    Rejected { reason: Vec<u8> },
}

/// One connection to a node, with its handshake completed.
#[derive(Debug)]
pub struct NodeClient {
    outbound: mpsc::Sender<(u16, Vec<u8>)>,
    handshake: mpsc::Receiver<Vec<u8>>,
    submission: mpsc::Receiver<Vec<u8>>,
    monitor: mpsc::Receiver<Vec<u8>>,
    errors: Option<mpsc::Receiver<ClientError>>,
    tasks: Vec<JoinHandle<()>>,
    version: u16,
    closed: bool,
}

impl NodeClient {
    /// Dials `address` and performs the handshake.
    pub async fn connect(address: &NodeAddress, network_magic: u64) -> Result<Self, ClientError> {
        let (reader, writer) = bearer::connect(address).await?;
        let client = Self::over(reader, writer, network_magic).await?;
        debug!(
            address = %address,
            version = client.version,
            "Node connection established"
        );
        Ok(client)
    }

    /// Runs the client over an already-open bearer.
    pub async fn over<R, W>(reader: R, writer: W, network_magic: u64) -> Result<Self, ClientError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let mut client = Self::spawn(reader, writer);
        client.version = client.handshake(network_magic).await?;
        Ok(client)
    }

    fn spawn<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let (error_tx, error_rx) = mpsc::channel(ERROR_CAPACITY);
        let (handshake_tx, handshake_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (submission_tx, submission_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (monitor_tx, monitor_rx) = mpsc::channel(INBOUND_CAPACITY);

        let routes = HashMap::from([
            (HANDSHAKE, handshake_tx),
            (LOCAL_TX_SUBMISSION, submission_tx),
            (LOCAL_TX_MONITOR, monitor_tx),
        ]);

        let writer_task = tokio::spawn(write_loop(writer, outbound_rx, error_tx.clone()));
        let demux_task = tokio::spawn(demux_loop(reader, routes, error_tx));

        Self {
            outbound: outbound_tx,
            handshake: handshake_rx,
            submission: submission_rx,
            monitor: monitor_rx,
            errors: Some(error_rx),
            tasks: vec![writer_task, demux_task],
            version: 0,
            closed: false,
        }
    }

    /// Negotiated node-to-client version.
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Takes the asynchronous error side channel. Returns `None` after the
    /// first call.
    pub fn take_errors(&mut self) -> Option<mpsc::Receiver<ClientError>> {
        self.errors.take()
    }

    /// Submits a transaction tagged with its hard-fork era index.
    pub async fn submit_tx(&mut self, era: u16, tx: &[u8]) -> Result<SubmitResult, ClientError> {
        self.send(&SubmissionMessage::SubmitTx {
            era,
            tx: tx.to_vec(),
        })
        .await?;

        match recv::<SubmissionMessage>(&mut self.submission).await? {
            SubmissionMessage::AcceptTx => Ok(SubmitResult::Accepted),
            SubmissionMessage::RejectTx { reason } => Ok(SubmitResult::Rejected { reason }),
            other => Err(violation(
                LOCAL_TX_SUBMISSION,
                format!("unexpected reply {:?}", other),
            )),
        }
    }

    /// Asks whether the mempool holds `tx_id`.
    pub async fn has_tx(&mut self, era: u16, tx_id: [u8; 32]) -> Result<bool, ClientError> {
        self.send(&MonitorMessage::Acquire).await?;
        match recv::<MonitorMessage>(&mut self.monitor).await? {
            MonitorMessage::Acquired { slot } => trace!(slot, "Mempool snapshot acquired"),
            other => {
                return Err(violation(
                    LOCAL_TX_MONITOR,
                    format!("expected MsgAcquired, got {:?}", other),
                ))
            }
        }

        self.send(&MonitorMessage::HasTx { era, tx_id }).await?;
        let found = match recv::<MonitorMessage>(&mut self.monitor).await? {
            MonitorMessage::ReplyHasTx(found) => found,
            other => {
                return Err(violation(
                    LOCAL_TX_MONITOR,
                    format!("expected MsgReplyHasTx, got {:?}", other),
                ))
            }
        };

        self.send(&MonitorMessage::Release).await?;
        Ok(found)
    }

    /// Tears the connection down. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for task in self.tasks.drain(..) {
            task.abort();
        }
        trace!("Node connection closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    async fn handshake(&mut self, network_magic: u64) -> Result<u16, ClientError> {
        self.send(&HandshakeMessage::propose(network_magic)).await?;

        let reply = match recv::<HandshakeMessage>(&mut self.handshake).await {
            Err(ClientError::ConnectionClosed) => {
                return Err(self.pending_error().unwrap_or(ClientError::ConnectionClosed))
            }
            other => other?,
        };

        match reply {
            HandshakeMessage::Accept { version, .. }
                if (MIN_VERSION..=MAX_VERSION).contains(&version) =>
            {
                Ok(version)
            }
            HandshakeMessage::Accept { version, .. } => {
                Err(ClientError::VersionMismatch(version.to_string()))
            }
            HandshakeMessage::Refuse(RefuseReason::VersionMismatch(versions)) => {
                Err(ClientError::VersionMismatch(format!("{:?}", versions)))
            }
            HandshakeMessage::Refuse(reason) => Err(ClientError::Handshake(reason.to_string())),
            HandshakeMessage::QueryReply(_) => Err(ClientError::Handshake(
                "node answered with a version query reply".into(),
            )),
            HandshakeMessage::Propose(_) => {
                Err(violation(HANDSHAKE, "node sent a version proposal"))
            }
        }
    }

    async fn send<M: Message>(&self, message: &M) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::Closed);
        }
        let payload = message.encode()?;
        self.outbound
            .send((M::PROTOCOL, payload))
            .await
            .map_err(|_| ClientError::ConnectionClosed)
    }

    fn pending_error(&mut self) -> Option<ClientError> {
        self.errors.as_mut().and_then(|rx| rx.try_recv().ok())
    }
}

impl Drop for NodeClient {
    fn drop(&mut self) {
        self.close();
    }
}

async fn recv<M: Message>(inbound: &mut mpsc::Receiver<Vec<u8>>) -> Result<M, ClientError> {
    let bytes = inbound.recv().await.ok_or(ClientError::ConnectionClosed)?;
    M::decode(&bytes)
}

fn publish(errors: &mpsc::Sender<ClientError>, error: ClientError) {
    warn!(error = %error, "Node connection failed");
    if errors.try_send(error).is_err() {
        debug!("Error side channel full or closed");
    }
}

async fn write_loop<W>(
    mut writer: W,
    mut outbound: mpsc::Receiver<(u16, Vec<u8>)>,
    errors: mpsc::Sender<ClientError>,
) where
    W: AsyncWrite + Unpin,
{
    let clock = Clock::start();
    while let Some((protocol, payload)) = outbound.recv().await {
        trace!(
            protocol = protocol_name(protocol),
            len = payload.len(),
            "Sending message"
        );
        if let Err(e) = mux::write_message(&mut writer, &clock, protocol, false, &payload).await {
            publish(&errors, e);
            return;
        }
    }
}

async fn demux_loop<R>(
    reader: R,
    routes: HashMap<u16, mpsc::Sender<Vec<u8>>>,
    errors: mpsc::Sender<ClientError>,
) where
    R: AsyncRead + Unpin,
{
    if let Err(e) = demux(reader, &routes).await {
        publish(&errors, e);
    }
}

async fn demux<R>(
    mut reader: R,
    routes: &HashMap<u16, mpsc::Sender<Vec<u8>>>,
) -> Result<(), ClientError>
where
    R: AsyncRead + Unpin,
{
    let mut buffers: HashMap<u16, MessageBuffer> = HashMap::new();
    loop {
        let (header, payload) = mux::read_segment(&mut reader).await?;
        let route = routes.get(&header.protocol).ok_or_else(|| {
            violation(
                header.protocol,
                format!("segment for unexpected protocol {}", header.protocol),
            )
        })?;

        let buffer = buffers.entry(header.protocol).or_default();
        buffer.push(&payload);
        while let Some(message) = buffer.next_message()? {
            trace!(
                protocol = protocol_name(header.protocol),
                len = message.len(),
                "Received message"
            );
            if route.send(message).await.is_err() {
                // client side gone
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeNode, SubmitBehavior};
    use std::time::Duration;

    async fn connected(node: FakeNode) -> Result<NodeClient, ClientError> {
        let (client_io, node_io) = tokio::io::duplex(64 * 1024);
        tokio::spawn(async move {
            let _ = node.serve(node_io).await;
        });
        let (reader, writer) = tokio::io::split(client_io);
        NodeClient::over(reader, writer, 764824073).await
    }

    #[tokio::test]
    async fn test_handshake_picks_highest_version() {
        let client = connected(FakeNode::accepting()).await.unwrap();
        assert_eq!(client.version(), MAX_VERSION);
    }

    #[tokio::test]
    async fn test_handshake_refused() {
        let result = connected(FakeNode::accepting().refusing_handshake()).await;
        assert!(matches!(result, Err(ClientError::VersionMismatch(_))));
    }

    #[tokio::test]
    async fn test_submit_accepted() {
        let node = FakeNode::accepting();
        let mut client = connected(node.clone()).await.unwrap();

        let result = client.submit_tx(5, &[0x84, 0xa0]).await.unwrap();

        assert_eq!(result, SubmitResult::Accepted);
        assert_eq!(node.submitted(), vec![(5, vec![0x84, 0xa0])]);
    }

    #[tokio::test]
    async fn test_submit_rejected_keeps_reason_bytes() {
        let reason = vec![0x82, 0x01, 0x02];
        let node = FakeNode::accepting().with_submit(SubmitBehavior::Reject(reason.clone()));
        let mut client = connected(node).await.unwrap();

        let result = client.submit_tx(6, &[0x01]).await.unwrap();

        assert_eq!(result, SubmitResult::Rejected { reason });
    }

    #[tokio::test]
    async fn test_disconnect_surfaces_on_side_channel() {
        let node = FakeNode::accepting().with_submit(SubmitBehavior::Disconnect);
        let mut client = connected(node).await.unwrap();
        let mut errors = client.take_errors().unwrap();

        let result = client.submit_tx(6, &[0x01]).await;

        assert!(matches!(result, Err(ClientError::ConnectionClosed)));
        let side = tokio::time::timeout(Duration::from_secs(1), errors.recv())
            .await
            .unwrap();
        assert!(matches!(side, Some(ClientError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_has_tx() {
        let present = [7u8; 32];
        let node = FakeNode::accepting().with_mempool(vec![present]);
        let mut client = connected(node).await.unwrap();

        assert!(client.has_tx(6, present).await.unwrap());
        assert!(!client.has_tx(6, [8u8; 32]).await.unwrap());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_closes_side_channel() {
        let mut client = connected(FakeNode::accepting()).await.unwrap();
        let mut errors = client.take_errors().unwrap();

        client.close();
        client.close();

        assert!(client.is_closed());
        assert!(matches!(
            client.submit_tx(6, &[0x01]).await,
            Err(ClientError::Closed)
        ));
        let next = tokio::time::timeout(Duration::from_secs(1), errors.recv())
            .await
            .unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn test_take_errors_once() {
        let mut client = connected(FakeNode::accepting()).await.unwrap();
        assert!(client.take_errors().is_some());
        assert!(client.take_errors().is_none());
    }
}

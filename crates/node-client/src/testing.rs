//! In-process fake node speaking the responder side of the node-to-client
//! mini-protocols. Used by this crate's tests and by downstream test suites.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;

use crate::error::ClientError;
use crate::mux::{self, Clock};
use crate::protocol::{
    violation, HandshakeMessage, Message, MessageBuffer, MonitorMessage, RefuseReason,
    SubmissionMessage, HANDSHAKE, LOCAL_TX_MONITOR, LOCAL_TX_SUBMISSION,
};

/// How the fake node answers `MsgSubmitTx`.
#[derive(Debug, Clone)]
pub enum SubmitBehavior {
    Accept,
    /// Reject with the given raw CBOR reason.
    Reject(Vec<u8>),
    /// Never answer.
    Hang,
    /// Drop the connection without answering.
    Disconnect,
}

/// A scripted node. Clones share the recorded state.
#[derive(Debug, Clone)]
pub struct FakeNode {
    submit: SubmitBehavior,
    refuse_handshake: bool,
    mempool: Vec<[u8; 32]>,
    submitted: Arc<Mutex<Vec<(u16, Vec<u8>)>>>,
    connections: Arc<AtomicUsize>,
}

impl FakeNode {
    /// A node that completes the handshake and accepts every transaction.
    pub fn accepting() -> Self {
        Self {
            submit: SubmitBehavior::Accept,
            refuse_handshake: false,
            mempool: Vec::new(),
            submitted: Arc::new(Mutex::new(Vec::new())),
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_submit(mut self, behavior: SubmitBehavior) -> Self {
        self.submit = behavior;
        self
    }

    pub fn refusing_handshake(mut self) -> Self {
        self.refuse_handshake = true;
        self
    }

    pub fn with_mempool(mut self, tx_ids: Vec<[u8; 32]>) -> Self {
        self.mempool = tx_ids;
        self
    }

    /// `(era, tx bytes)` of every `MsgSubmitTx` received.
    pub fn submitted(&self) -> Vec<(u16, Vec<u8>)> {
        self.submitted.lock().clone()
    }

    /// Number of connections served so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Serves one connection until the peer hangs up.
    pub async fn serve<S>(&self, mut stream: S) -> Result<(), ClientError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.connections.fetch_add(1, Ordering::SeqCst);
        let clock = Clock::start();
        let mut buffers: HashMap<u16, MessageBuffer> = HashMap::new();

        loop {
            let (header, payload) = match mux::read_segment(&mut stream).await {
                Ok(segment) => segment,
                Err(ClientError::ConnectionClosed) => return Ok(()),
                Err(e) => return Err(e),
            };
            let buffer = buffers.entry(header.protocol).or_default();
            buffer.push(&payload);

            while let Some(message) = buffer.next_message()? {
                let reply = match header.protocol {
                    HANDSHAKE => self.on_handshake(&message)?,
                    LOCAL_TX_SUBMISSION => match self.on_submission(&message)? {
                        Some(Reply::Close) => return Ok(()),
                        Some(Reply::Send(bytes)) => Some(bytes),
                        None => None,
                    },
                    LOCAL_TX_MONITOR => self.on_monitor(&message)?,
                    other => return Err(violation(other, "fake node: unsupported protocol")),
                };
                if let Some(bytes) = reply {
                    mux::write_message(&mut stream, &clock, header.protocol, true, &bytes).await?;
                }
            }
        }
    }

    /// Accepts connections on a UNIX socket until the returned task is aborted.
    #[cfg(unix)]
    pub fn listen_unix(&self, path: &std::path::Path) -> std::io::Result<JoinHandle<()>> {
        let listener = tokio::net::UnixListener::bind(path)?;
        let node = self.clone();
        Ok(tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let node = node.clone();
                tokio::spawn(async move {
                    let _ = node.serve(stream).await;
                });
            }
        }))
    }

    fn on_handshake(&self, message: &[u8]) -> Result<Option<Vec<u8>>, ClientError> {
        let HandshakeMessage::Propose(table) = HandshakeMessage::decode(message)? else {
            return Err(violation(HANDSHAKE, "fake node expects a proposal"));
        };
        let reply = match table.iter().next_back() {
            Some((version, data)) if !self.refuse_handshake => HandshakeMessage::Accept {
                version: *version,
                data: *data,
            },
            _ => HandshakeMessage::Refuse(RefuseReason::VersionMismatch(Vec::new())),
        };
        reply.encode().map(Some)
    }

    fn on_submission(&self, message: &[u8]) -> Result<Option<Reply>, ClientError> {
        match SubmissionMessage::decode(message)? {
            SubmissionMessage::SubmitTx { era, tx } => {
                self.submitted.lock().push((era, tx));
                match &self.submit {
                    SubmitBehavior::Accept => {
                        Ok(Some(Reply::Send(SubmissionMessage::AcceptTx.encode()?)))
                    }
                    SubmitBehavior::Reject(reason) => Ok(Some(Reply::Send(
                        SubmissionMessage::RejectTx {
                            reason: reason.clone(),
                        }
                        .encode()?,
                    ))),
                    SubmitBehavior::Hang => Ok(None),
                    SubmitBehavior::Disconnect => Ok(Some(Reply::Close)),
                }
            }
            _ => Ok(None),
        }
    }

    fn on_monitor(&self, message: &[u8]) -> Result<Option<Vec<u8>>, ClientError> {
        let reply = match MonitorMessage::decode(message)? {
            MonitorMessage::Acquire => MonitorMessage::Acquired { slot: 1 },
            MonitorMessage::HasTx { tx_id, .. } => {
                MonitorMessage::ReplyHasTx(self.mempool.contains(&tx_id))
            }
            _ => return Ok(None),
        };
        reply.encode().map(Some)
    }
}

enum Reply {
    Send(Vec<u8>),
    Close,
}

//! Outbound ports: what the orchestrators need from the outside world.
//!
//! ```text
//!   SubmitOrchestrator ──► EraClassifier      (local, synchronous)
//!          │
//!          └─────────────► SessionFactory ──► NodeSession
//!                                               ├─ dial
//!                                               ├─ submit_tx / has_tx
//!                                               ├─ take_errors (side channel)
//!                                               └─ close
//! ```

use async_trait::async_trait;
use futures::stream::BoxStream;
use ledger_era::{ClassifiedTx, Era, EraError, TxId};

use crate::domain::types::NodeTarget;

/// Failures of a node session, either as a call result or on the side
/// channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The connection could not be opened or the handshake failed.
    #[error("failure connecting to node: {0}")]
    Dial(String),

    /// The node hung up.
    #[error("connection closed by node")]
    Closed,

    /// Any other transport or protocol failure.
    #[error("{0}")]
    Transport(String),
}

/// The node's answer to a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitResponse {
    Accepted,
    /// `reason_cbor` is the raw CBOR rejection reason.
    Rejected { reason_cbor: Vec<u8> },
}

/// Asynchronous session failures, independent of any call.
pub type ErrorStream = BoxStream<'static, SessionError>;

/// Decides the era of serialized transaction bytes.
pub trait EraClassifier: Send + Sync {
    fn classify(&self, tx: &[u8]) -> Result<ClassifiedTx, EraError>;
}

/// One connection to the node, scoped to a single request.
///
/// Implementations must tolerate `close` being called on a session that was
/// never dialed, or whose dial failed.
#[async_trait]
pub trait NodeSession: Send {
    /// Opens the connection and completes the handshake.
    async fn dial(&mut self, target: &NodeTarget) -> Result<(), SessionError>;

    /// Takes the side channel. `None` before a successful dial and after the
    /// first call.
    fn take_errors(&mut self) -> Option<ErrorStream>;

    async fn submit_tx(&mut self, era: Era, tx: &[u8]) -> Result<SubmitResponse, SessionError>;

    async fn has_tx(&mut self, tx_id: &TxId) -> Result<bool, SessionError>;

    /// Tears the connection down. Idempotent.
    fn close(&mut self);
}

/// Makes unconnected sessions. Must not perform I/O.
pub trait SessionFactory: Send + Sync {
    fn create(&self) -> Box<dyn NodeSession>;
}

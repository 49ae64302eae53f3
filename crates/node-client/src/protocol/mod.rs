//! Mini-protocol messages and message framing.
//!
//! | Id | Mini-protocol        | Used for                     |
//! |----|----------------------|------------------------------|
//! | 0  | Handshake            | version and magic agreement  |
//! | 6  | LocalTxSubmission    | submitting a transaction     |
//! | 9  | LocalTxMonitor       | mempool membership queries   |

pub mod handshake;
pub mod monitor;
pub mod submission;

use minicbor::Decoder;

use crate::error::ClientError;

pub use handshake::{HandshakeMessage, RefuseReason, VersionData};
pub use monitor::MonitorMessage;
pub use submission::SubmissionMessage;

pub const HANDSHAKE: u16 = 0;
pub const LOCAL_TX_SUBMISSION: u16 = 6;
pub const LOCAL_TX_MONITOR: u16 = 9;

/// Human-readable name of a mini-protocol id.
pub fn protocol_name(id: u16) -> &'static str {
    match id {
        HANDSHAKE => "handshake",
        LOCAL_TX_SUBMISSION => "local-tx-submission",
        LOCAL_TX_MONITOR => "local-tx-monitor",
        _ => "unknown",
    }
}

/// A mini-protocol message with a CBOR wire form.
pub trait Message: Sized {
    /// Mini-protocol id the message travels on.
    const PROTOCOL: u16;

    fn encode(&self) -> Result<Vec<u8>, ClientError>;

    fn decode(bytes: &[u8]) -> Result<Self, ClientError>;
}

pub(crate) fn violation(protocol: u16, message: impl Into<String>) -> ClientError {
    ClientError::Protocol {
        protocol: protocol_name(protocol),
        message: message.into(),
    }
}

/// Reads the `[tag, ...]` prefix shared by every message.
pub(crate) fn message_tag(d: &mut Decoder<'_>) -> Result<(Option<u64>, u64), ClientError> {
    let len = d.array()?;
    let tag = d.u64()?;
    Ok((len, tag))
}

/// Reassembles whole CBOR messages from segment payloads of one protocol.
#[derive(Debug, Default)]
pub struct MessageBuffer {
    buf: Vec<u8>,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, payload: &[u8]) {
        self.buf.extend_from_slice(payload);
    }

    /// Pops the next complete message, or `None` if more bytes are needed.
    pub fn next_message(&mut self) -> Result<Option<Vec<u8>>, ClientError> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let mut d = Decoder::new(&self.buf);
        match d.skip() {
            Ok(()) => {
                let end = d.position();
                let rest = self.buf.split_off(end);
                Ok(Some(std::mem::replace(&mut self.buf, rest)))
            }
            Err(e) if e.is_end_of_input() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

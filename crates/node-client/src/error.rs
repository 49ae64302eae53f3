//! Node client errors.

use std::io;

/// Errors produced by a node connection.
///
/// `Clone` so the same failure can be returned from a pending call and
/// published on the error side channel.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("connection closed by node")]
    ConnectionClosed,

    #[error("handshake refused: {0}")]
    Handshake(String),

    #[error("no common protocol version (node offered {0})")]
    VersionMismatch(String),

    #[error("CBOR codec error: {0}")]
    Codec(String),

    #[error("protocol violation on {protocol}: {message}")]
    Protocol {
        protocol: &'static str,
        message: String,
    },

    #[error("mux payload of {0} bytes exceeds segment limit")]
    PayloadTooLarge(usize),

    #[error("connection already closed")]
    Closed,
}

impl From<io::Error> for ClientError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::BrokenPipe => ClientError::ConnectionClosed,
            _ => ClientError::Io(e.to_string()),
        }
    }
}

impl From<minicbor::decode::Error> for ClientError {
    fn from(e: minicbor::decode::Error) -> Self {
        ClientError::Codec(e.to_string())
    }
}

impl<W> From<minicbor::encode::Error<W>> for ClientError
where
    W: std::fmt::Display,
{
    fn from(e: minicbor::encode::Error<W>) -> Self {
        ClientError::Codec(e.to_string())
    }
}

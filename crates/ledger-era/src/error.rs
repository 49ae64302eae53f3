//! Classification errors.

use crate::era::Era;

/// Why a byte string could not be classified as a transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EraError {
    /// The input is empty.
    #[error("empty transaction")]
    Empty,

    /// CBOR decoding failed.
    #[error("malformed CBOR: {0}")]
    Cbor(String),

    /// The envelope is not a definite-length array of 3 or 4 elements.
    #[error("transaction envelope must be a 3 or 4 element array, got {0}")]
    Envelope(String),

    /// Bytes remain after the transaction envelope.
    #[error("{0} trailing bytes after transaction")]
    TrailingBytes(usize),

    /// A body or witness field is structurally invalid.
    #[error("invalid transaction field: {0}")]
    Field(String),

    /// The structure is valid CBOR but no era codec accepts it.
    #[error("no known era accepts transaction ({})", describe_attempts(.0))]
    NoMatchingEra(Vec<(Era, String)>),
}

fn describe_attempts(attempts: &[(Era, String)]) -> String {
    attempts
        .iter()
        .map(|(era, reason)| format!("{}: {}", era, reason))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<minicbor::decode::Error> for EraError {
    fn from(e: minicbor::decode::Error) -> Self {
        EraError::Cbor(e.to_string())
    }
}

//! Transaction identifiers.
//!
//! A transaction id is the Blake2b-256 digest of the transaction body exactly
//! as it was serialized by the submitter. The body is never re-encoded, so the
//! id does not depend on which era codec recognised the envelope.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use std::fmt;
use std::str::FromStr;

type Blake2b256 = Blake2b<U32>;

/// Length of a transaction id in bytes.
pub const TX_ID_LEN: usize = 32;

/// A 32-byte transaction id (body hash).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxId([u8; TX_ID_LEN]);

impl TxId {
    pub const fn new(bytes: [u8; TX_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Hashes raw transaction body bytes.
    pub fn from_body(body: &[u8]) -> Self {
        let digest = Blake2b256::digest(body);
        let mut bytes = [0u8; TX_ID_LEN];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; TX_ID_LEN] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", self.to_hex())
    }
}

/// Error parsing a hex transaction id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TxIdParseError {
    #[error("transaction hash must be {expected} hex characters, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("transaction hash is not valid hex: {0}")]
    Hex(String),
}

impl FromStr for TxId {
    type Err = TxIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != TX_ID_LEN * 2 {
            return Err(TxIdParseError::Length {
                expected: TX_ID_LEN * 2,
                actual: s.len(),
            });
        }
        let mut bytes = [0u8; TX_ID_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| TxIdParseError::Hex(e.to_string()))?;
        Ok(Self(bytes))
    }
}

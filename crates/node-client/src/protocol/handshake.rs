//! Handshake mini-protocol (node-to-client).
//!
//! ```text
//! MsgProposeVersions  [0, { version => params }]
//! MsgAcceptVersion    [1, version, params]
//! MsgRefuse           [2, reason]
//! MsgQueryReply       [3, { version => params }]
//! ```
//!
//! Node-to-client versions travel with bit 15 set. Versions before 15 carry
//! the bare network magic as params, later ones `[magic, query]`.

use std::collections::BTreeMap;
use std::fmt;

use minicbor::data::Type;
use minicbor::{Decoder, Encoder};

use super::{message_tag, violation, Message, HANDSHAKE};
use crate::error::ClientError;

/// Oldest node-to-client version proposed.
pub const MIN_VERSION: u16 = 9;

/// Newest node-to-client version proposed.
pub const MAX_VERSION: u16 = 16;

const N2C_VERSION_BIT: u64 = 0x8000;

/// First version whose params include the `query` flag.
const QUERY_FLAG_VERSION: u16 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionData {
    pub network_magic: u64,
    pub query: Option<bool>,
}

impl VersionData {
    pub fn for_version(version: u16, network_magic: u64) -> Self {
        Self {
            network_magic,
            query: (version >= QUERY_FLAG_VERSION).then_some(false),
        }
    }
}

/// Why the node refused our proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefuseReason {
    VersionMismatch(Vec<u16>),
    DecodeError { version: u16, message: String },
    Refused { version: u16, message: String },
}

impl fmt::Display for RefuseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefuseReason::VersionMismatch(versions) => {
                write!(f, "version mismatch, node supports {:?}", versions)
            }
            RefuseReason::DecodeError { version, message } => {
                write!(f, "decode error for version {}: {}", version, message)
            }
            RefuseReason::Refused { version, message } => {
                write!(f, "version {} refused: {}", version, message)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeMessage {
    Propose(BTreeMap<u16, VersionData>),
    Accept { version: u16, data: VersionData },
    Refuse(RefuseReason),
    QueryReply(BTreeMap<u16, VersionData>),
}

impl HandshakeMessage {
    /// Proposal of every supported version for `network_magic`.
    pub fn propose(network_magic: u64) -> Self {
        HandshakeMessage::Propose(
            (MIN_VERSION..=MAX_VERSION)
                .map(|v| (v, VersionData::for_version(v, network_magic)))
                .collect(),
        )
    }
}

impl Message for HandshakeMessage {
    const PROTOCOL: u16 = HANDSHAKE;

    fn encode(&self) -> Result<Vec<u8>, ClientError> {
        let mut e = Encoder::new(Vec::new());
        match self {
            HandshakeMessage::Propose(table) => {
                e.array(2)?.u64(0)?;
                encode_table(&mut e, table)?;
            }
            HandshakeMessage::Accept { version, data } => {
                e.array(3)?.u64(1)?.u64(wire_version(*version))?;
                encode_params(&mut e, data)?;
            }
            HandshakeMessage::Refuse(reason) => {
                e.array(2)?.u64(2)?;
                match reason {
                    RefuseReason::VersionMismatch(versions) => {
                        e.array(2)?.u64(0)?.array(versions.len() as u64)?;
                        for v in versions {
                            e.u64(wire_version(*v))?;
                        }
                    }
                    RefuseReason::DecodeError { version, message } => {
                        e.array(3)?.u64(1)?.u64(wire_version(*version))?.str(message)?;
                    }
                    RefuseReason::Refused { version, message } => {
                        e.array(3)?.u64(2)?.u64(wire_version(*version))?.str(message)?;
                    }
                }
            }
            HandshakeMessage::QueryReply(table) => {
                e.array(2)?.u64(3)?;
                encode_table(&mut e, table)?;
            }
        }
        Ok(e.into_writer())
    }

    fn decode(bytes: &[u8]) -> Result<Self, ClientError> {
        let mut d = Decoder::new(bytes);
        let (_, tag) = message_tag(&mut d)?;
        match tag {
            0 => Ok(HandshakeMessage::Propose(decode_table(&mut d)?)),
            1 => {
                let version = logical_version(d.u64()?);
                let data = decode_params(&mut d)?;
                Ok(HandshakeMessage::Accept { version, data })
            }
            2 => Ok(HandshakeMessage::Refuse(decode_refuse(&mut d)?)),
            3 => Ok(HandshakeMessage::QueryReply(decode_table(&mut d)?)),
            other => Err(violation(HANDSHAKE, format!("unknown message tag {}", other))),
        }
    }
}

fn wire_version(version: u16) -> u64 {
    u64::from(version) | N2C_VERSION_BIT
}

fn logical_version(wire: u64) -> u16 {
    (wire & 0x7fff) as u16
}

fn encode_table(
    e: &mut Encoder<Vec<u8>>,
    table: &BTreeMap<u16, VersionData>,
) -> Result<(), ClientError> {
    e.map(table.len() as u64)?;
    for (version, data) in table {
        e.u64(wire_version(*version))?;
        encode_params(e, data)?;
    }
    Ok(())
}

fn encode_params(e: &mut Encoder<Vec<u8>>, data: &VersionData) -> Result<(), ClientError> {
    match data.query {
        Some(query) => {
            e.array(2)?.u64(data.network_magic)?.bool(query)?;
        }
        None => {
            e.u64(data.network_magic)?;
        }
    }
    Ok(())
}

fn decode_table(d: &mut Decoder<'_>) -> Result<BTreeMap<u16, VersionData>, ClientError> {
    let len = d
        .map()?
        .ok_or_else(|| violation(HANDSHAKE, "indefinite version table"))?;
    let mut table = BTreeMap::new();
    for _ in 0..len {
        let version = logical_version(d.u64()?);
        table.insert(version, decode_params(d)?);
    }
    Ok(table)
}

fn decode_params(d: &mut Decoder<'_>) -> Result<VersionData, ClientError> {
    match d.datatype()? {
        Type::Array => {
            d.array()?;
            let network_magic = d.u64()?;
            let query = d.bool()?;
            Ok(VersionData {
                network_magic,
                query: Some(query),
            })
        }
        _ => Ok(VersionData {
            network_magic: d.u64()?,
            query: None,
        }),
    }
}

fn decode_refuse(d: &mut Decoder<'_>) -> Result<RefuseReason, ClientError> {
    let (_, tag) = message_tag(d)?;
    match tag {
        0 => {
            let len = d.array()?.unwrap_or_default();
            let mut versions = Vec::with_capacity(len as usize);
            for _ in 0..len {
                versions.push(logical_version(d.u64()?));
            }
            Ok(RefuseReason::VersionMismatch(versions))
        }
        1 => Ok(RefuseReason::DecodeError {
            version: logical_version(d.u64()?),
            message: d.str()?.to_string(),
        }),
        2 => Ok(RefuseReason::Refused {
            version: logical_version(d.u64()?),
            message: d.str()?.to_string(),
        }),
        other => Err(violation(HANDSHAKE, format!("unknown refuse reason {}", other))),
    }
}

//! Ouroboros multiplexer segments.
//!
//! # Wire format
//!
//! ```text
//! ┌──────────────────┬───┬────────────────┬──────────────────┬─────────────┐
//! │ 4 bytes (BE)     │ 1 │ 15 bits        │ 2 bytes (BE)     │ payload     │
//! │ timestamp (µs)   │ M │ protocol id    │ payload length   │ ≤ 12288 B   │
//! └──────────────────┴───┴────────────────┴──────────────────┴─────────────┘
//! ```
//!
//! `M` is set on segments sent by the responder side of a mini-protocol.
//! Messages larger than one segment are split; the receiver reassembles them
//! per protocol (see [`crate::protocol::MessageBuffer`]).

use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ClientError;

/// Segment header length.
pub const HEADER_LEN: usize = 8;

/// Largest payload carried by a single segment.
pub const MAX_SEGMENT_PAYLOAD: usize = 12_288;

const RESPONDER_BIT: u16 = 0x8000;

/// Decoded segment header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    pub timestamp: u32,
    pub protocol: u16,
    pub responder: bool,
    pub length: u16,
}

impl SegmentHeader {
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut id = self.protocol & !RESPONDER_BIT;
        if self.responder {
            id |= RESPONDER_BIT;
        }
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.timestamp.to_be_bytes());
        out[4..6].copy_from_slice(&id.to_be_bytes());
        out[6..8].copy_from_slice(&self.length.to_be_bytes());
        out
    }

    pub fn decode(bytes: [u8; HEADER_LEN]) -> Self {
        let id = u16::from_be_bytes([bytes[4], bytes[5]]);
        Self {
            timestamp: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            protocol: id & !RESPONDER_BIT,
            responder: id & RESPONDER_BIT != 0,
            length: u16::from_be_bytes([bytes[6], bytes[7]]),
        }
    }
}

/// Segment timestamps: low 32 bits of microseconds since the bearer opened.
#[derive(Debug, Clone, Copy)]
pub struct Clock(Instant);

impl Clock {
    pub fn start() -> Self {
        Self(Instant::now())
    }

    fn now(&self) -> u32 {
        self.0.elapsed().as_micros() as u32
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::start()
    }
}

/// Writes one mini-protocol message, splitting it into as many segments as needed.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    clock: &Clock,
    protocol: u16,
    responder: bool,
    payload: &[u8],
) -> Result<(), ClientError> {
    for chunk in payload.chunks(MAX_SEGMENT_PAYLOAD) {
        let header = SegmentHeader {
            timestamp: clock.now(),
            protocol,
            responder,
            length: u16::try_from(chunk.len())
                .map_err(|_| ClientError::PayloadTooLarge(chunk.len()))?,
        };
        writer.write_all(&header.encode()).await?;
        writer.write_all(chunk).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Reads one segment.
pub async fn read_segment<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<(SegmentHeader, Vec<u8>), ClientError> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;
    let header = SegmentHeader::decode(header);

    let len = header.length as usize;
    if len > MAX_SEGMENT_PAYLOAD {
        return Err(ClientError::PayloadTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok((header, payload))
}

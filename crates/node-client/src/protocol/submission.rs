//! Local tx submission mini-protocol.
//!
//! ```text
//! MsgSubmitTx  [0, [era, #6.24(bytes tx)]]
//! MsgAcceptTx  [1]
//! MsgRejectTx  [2, reason]
//! MsgDone      [3]
//! ```

use minicbor::data::{Tag, Type};
use minicbor::{Decoder, Encoder};

use super::{message_tag, violation, Message, LOCAL_TX_SUBMISSION};
use crate::error::ClientError;

/// CBOR tag for embedded CBOR data items.
const TAG_ENCODED_CBOR: u64 = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionMessage {
    SubmitTx { era: u16, tx: Vec<u8> },
    AcceptTx,
    /// `reason` is the raw CBOR of the node's rejection reason.
    RejectTx { reason: Vec<u8> },
    Done,
}

impl Message for SubmissionMessage {
    const PROTOCOL: u16 = LOCAL_TX_SUBMISSION;

    fn encode(&self) -> Result<Vec<u8>, ClientError> {
        let mut e = Encoder::new(Vec::new());
        match self {
            SubmissionMessage::SubmitTx { era, tx } => {
                e.array(2)?.u64(0)?;
                e.array(2)?
                    .u16(*era)?
                    .tag(Tag::new(TAG_ENCODED_CBOR))?
                    .bytes(tx)?;
            }
            SubmissionMessage::AcceptTx => {
                e.array(1)?.u64(1)?;
            }
            SubmissionMessage::RejectTx { reason } => {
                e.array(2)?.u64(2)?;
                e.writer_mut().extend_from_slice(reason);
            }
            SubmissionMessage::Done => {
                e.array(1)?.u64(3)?;
            }
        }
        Ok(e.into_writer())
    }

    fn decode(bytes: &[u8]) -> Result<Self, ClientError> {
        let mut d = Decoder::new(bytes);
        let (_, tag) = message_tag(&mut d)?;
        match tag {
            0 => {
                d.array()?;
                let era = d.u16()?;
                if d.datatype()? == Type::Tag {
                    let tag = d.tag()?;
                    if tag.as_u64() != TAG_ENCODED_CBOR {
                        return Err(violation(
                            LOCAL_TX_SUBMISSION,
                            format!("unexpected tag {} on transaction", tag.as_u64()),
                        ));
                    }
                }
                let tx = d.bytes()?.to_vec();
                Ok(SubmissionMessage::SubmitTx { era, tx })
            }
            1 => Ok(SubmissionMessage::AcceptTx),
            2 => {
                let start = d.position();
                d.skip()?;
                Ok(SubmissionMessage::RejectTx {
                    reason: bytes[start..d.position()].to_vec(),
                })
            }
            3 => Ok(SubmissionMessage::Done),
            other => Err(violation(
                LOCAL_TX_SUBMISSION,
                format!("unknown message tag {}", other),
            )),
        }
    }
}

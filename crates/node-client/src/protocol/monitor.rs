//! Local tx monitor mini-protocol, restricted to mempool membership queries.
//!
//! ```text
//! MsgDone        [0]
//! MsgAcquire     [1]
//! MsgAcquired    [2, slot]
//! MsgRelease     [3]
//! MsgHasTx       [7, [era, txid]]
//! MsgReplyHasTx  [8, bool]
//! ```

use minicbor::{Decoder, Encoder};

use super::{message_tag, violation, Message, LOCAL_TX_MONITOR};
use crate::error::ClientError;

pub const TX_ID_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorMessage {
    Done,
    Acquire,
    Acquired { slot: u64 },
    Release,
    HasTx { era: u16, tx_id: [u8; TX_ID_LEN] },
    ReplyHasTx(bool),
}

impl Message for MonitorMessage {
    const PROTOCOL: u16 = LOCAL_TX_MONITOR;

    fn encode(&self) -> Result<Vec<u8>, ClientError> {
        let mut e = Encoder::new(Vec::new());
        match self {
            MonitorMessage::Done => {
                e.array(1)?.u64(0)?;
            }
            MonitorMessage::Acquire => {
                e.array(1)?.u64(1)?;
            }
            MonitorMessage::Acquired { slot } => {
                e.array(2)?.u64(2)?.u64(*slot)?;
            }
            MonitorMessage::Release => {
                e.array(1)?.u64(3)?;
            }
            MonitorMessage::HasTx { era, tx_id } => {
                e.array(2)?.u64(7)?.array(2)?.u16(*era)?.bytes(tx_id)?;
            }
            MonitorMessage::ReplyHasTx(found) => {
                e.array(2)?.u64(8)?.bool(*found)?;
            }
        }
        Ok(e.into_writer())
    }

    fn decode(bytes: &[u8]) -> Result<Self, ClientError> {
        let mut d = Decoder::new(bytes);
        let (_, tag) = message_tag(&mut d)?;
        match tag {
            0 => Ok(MonitorMessage::Done),
            1 => Ok(MonitorMessage::Acquire),
            2 => Ok(MonitorMessage::Acquired { slot: d.u64()? }),
            3 => Ok(MonitorMessage::Release),
            7 => {
                d.array()?;
                let era = d.u16()?;
                let raw = d.bytes()?;
                let tx_id = <[u8; TX_ID_LEN]>::try_from(raw).map_err(|_| {
                    violation(
                        LOCAL_TX_MONITOR,
                        format!("tx id of {} bytes", raw.len()),
                    )
                })?;
                Ok(MonitorMessage::HasTx { era, tx_id })
            }
            8 => Ok(MonitorMessage::ReplyHasTx(d.bool()?)),
            other => Err(violation(
                LOCAL_TX_MONITOR,
                format!("unsupported message tag {}", other),
            )),
        }
    }
}

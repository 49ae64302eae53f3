//! Minimal, structurally valid transactions for each era.
//!
//! Each fixture carries the features of its era. Classification runs newest
//! first, so a fixture keeps its own tag only when every newer era rejects it:
//!
//! | Era     | Features                                          | Detected as |
//! |---------|---------------------------------------------------|-------------|
//! | Shelley | plain `[addr, coin]` outputs, TTL                 | Mary        |
//! | Allegra | validity interval start (key 8), no TTL           | Mary        |
//! | Mary    | multi-asset output value                          | Mary        |
//! | Alonzo  | datum hash output, update naming parameter 12 (d) | Alonzo      |
//! | Babbage | map-encoded output, update naming parameter 17    | Babbage     |
//! | Conway  | inputs wrapped in tag 258                         | Conway      |

use std::convert::Infallible;

use minicbor::data::Tag;
use minicbor::encode::Error;
use minicbor::Encoder;

use crate::era::Era;

const ADDRESS: [u8; 29] = [0x61; 29];
const INPUT_TX: [u8; 32] = [0x11; 32];
const POLICY: [u8; 28] = [0x22; 28];
const DATUM_HASH: [u8; 32] = [0x33; 32];
const VKEY: [u8; 32] = [0x44; 32];
const SIGNATURE: [u8; 64] = [0x55; 64];
const GENESIS_KEY: [u8; 28] = [0x66; 28];

/// Serialized transaction plus its body bytes.
#[derive(Debug, Clone)]
pub struct FixtureTx {
    pub bytes: Vec<u8>,
    pub body: Vec<u8>,
}

/// Canonical fixture for `era`.
pub fn transaction(era: Era) -> FixtureTx {
    build(era, None, false).expect("encoding into a Vec is infallible")
}

/// Era that `classify` assigns to the fixture for `era`.
pub fn detected_era(era: Era) -> Era {
    match era {
        Era::Shelley | Era::Allegra => Era::Mary,
        other => other,
    }
}

/// The fixture for `era` with an extra body field `key => 0`.
pub fn with_body_key(era: Era, key: u64) -> Vec<u8> {
    build(era, Some(key), false)
        .expect("encoding into a Vec is infallible")
        .bytes
}

/// An Allegra transaction whose body uses an indefinite-length map.
pub fn indefinite_body_transaction() -> FixtureTx {
    build(Era::Allegra, None, true).expect("encoding into a Vec is infallible")
}

fn build(era: Era, extra_key: Option<u64>, indefinite: bool) -> Result<FixtureTx, Error<Infallible>> {
    let body = body(era, extra_key, indefinite)?;

    let four = matches!(era, Era::Alonzo | Era::Babbage | Era::Conway);
    let mut e = Encoder::new(Vec::new());
    e.array(if four { 4 } else { 3 })?;
    e.writer_mut().extend_from_slice(&body);

    // witnesses: {0: [[vkey, signature]]}
    e.map(1)?.u64(0)?.array(1)?.array(2)?.bytes(&VKEY)?.bytes(&SIGNATURE)?;
    if four {
        e.bool(true)?;
    }
    e.null()?;

    Ok(FixtureTx {
        bytes: e.into_writer(),
        body,
    })
}

fn body(era: Era, extra_key: Option<u64>, indefinite: bool) -> Result<Vec<u8>, Error<Infallible>> {
    let has_ttl = era != Era::Allegra;
    let update_param = match era {
        Era::Alonzo => Some(12),
        Era::Babbage => Some(17),
        _ => None,
    };
    let fields = 4 + u64::from(update_param.is_some()) + u64::from(extra_key.is_some());

    let mut e = Encoder::new(Vec::new());
    if indefinite {
        e.begin_map()?;
    } else {
        e.map(fields)?;
    }

    e.u64(0)?;
    if era == Era::Conway {
        e.tag(Tag::new(258))?;
    }
    e.array(1)?.array(2)?.bytes(&INPUT_TX)?.u64(0)?;

    e.u64(1)?.array(1)?;
    match era {
        Era::Shelley | Era::Allegra => {
            e.array(2)?.bytes(&ADDRESS)?.u64(1_000_000)?;
        }
        Era::Mary => {
            e.array(2)?.bytes(&ADDRESS)?;
            e.array(2)?.u64(1_500_000)?;
            e.map(1)?.bytes(&POLICY)?.map(1)?.bytes(b"token")?.u64(1)?;
        }
        Era::Alonzo => {
            e.array(3)?
                .bytes(&ADDRESS)?
                .u64(2_000_000)?
                .bytes(&DATUM_HASH)?;
        }
        Era::Babbage | Era::Conway => {
            e.map(2)?.u64(0)?.bytes(&ADDRESS)?.u64(1)?.u64(2_000_000)?;
        }
    }

    e.u64(2)?.u64(170_000)?;
    if has_ttl {
        e.u64(3)?.u64(50_000_000)?;
    } else {
        e.u64(8)?.u64(40_000_000)?;
    }

    if let Some(param) = update_param {
        // [{genesis_key => {param => value}}, epoch]
        e.u64(6)?.array(2)?;
        e.map(1)?.bytes(&GENESIS_KEY)?.map(1)?.u64(param)?;
        if param == 12 {
            e.tag(Tag::new(30))?.array(2)?.u64(0)?.u64(1)?;
        } else {
            e.u64(4_310)?;
        }
        e.u64(290)?;
    }

    if let Some(key) = extra_key {
        e.u64(key)?.u64(0)?;
    }

    if indefinite {
        e.end()?;
    }
    Ok(e.into_writer())
}

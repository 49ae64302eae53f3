//! Era classification by structural inspection.
//!
//! The envelope is decoded once into a [`TxShape`]: the arity of the
//! transaction array, the set of body keys, the output encodings in use and
//! the witness keys present. Each era codec is then a predicate over that
//! shape. Eras are tried in [`Era::DETECTION_ORDER`], newest first, and the
//! first one that accepts wins, so detection is deterministic and linear in
//! the number of eras. Later eras read most earlier bodies, so only features
//! an era dropped (the update field, retired protocol parameters) keep a
//! transaction on an older tag.
//!
//! ```text
//! [ body, witnesses, aux ]              Shelley, Allegra, Mary
//! [ body, witnesses, is_valid, aux ]    Alonzo, Babbage, Conway
//! ```

use std::collections::BTreeSet;

use minicbor::data::Type;
use minicbor::Decoder;

use crate::era::Era;
use crate::error::EraError;
use crate::tx_id::TxId;

/// CBOR tag marking a set (Conway onwards).
const TAG_SET: u64 = 258;

/// Body keys whose value may be a tagged set.
const SET_KEYS: [u64; 4] = [0, 13, 14, 18];

/// A transaction whose era has been determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedTx {
    pub era: Era,
    pub tx_id: TxId,
}

/// Structural summary of a transaction envelope.
#[derive(Debug, Default, Clone)]
pub(crate) struct TxShape {
    arity: u64,
    body_keys: BTreeSet<u64>,
    witness_keys: BTreeSet<u64>,
    /// At least one output carries a multi-asset value.
    multi_asset: bool,
    /// At least one legacy array output carries a datum hash.
    datum_hash_output: bool,
    /// At least one output uses the post-Alonzo map encoding.
    map_output: bool,
    /// At least one set-valued body field is wrapped in tag 258.
    tagged_set: bool,
    /// Protocol parameters named by an update proposal (body key 6).
    update_params: BTreeSet<u64>,
}

/// Determines the era of `bytes` and computes its transaction id.
pub fn classify(bytes: &[u8]) -> Result<ClassifiedTx, EraError> {
    let (shape, body) = inspect(bytes)?;

    let mut attempts = Vec::with_capacity(Era::DETECTION_ORDER.len());
    for era in Era::DETECTION_ORDER {
        match accepts(era, &shape) {
            Ok(()) => {
                return Ok(ClassifiedTx {
                    era,
                    tx_id: TxId::from_body(body),
                })
            }
            Err(reason) => attempts.push((era, reason)),
        }
    }

    Err(EraError::NoMatchingEra(attempts))
}

/// Returns the raw bytes of the body element without classifying.
pub fn body_bytes(bytes: &[u8]) -> Result<&[u8], EraError> {
    inspect(bytes).map(|(_, body)| body)
}

fn inspect(bytes: &[u8]) -> Result<(TxShape, &[u8]), EraError> {
    if bytes.is_empty() {
        return Err(EraError::Empty);
    }

    let mut d = Decoder::new(bytes);
    let arity = match d.datatype()? {
        Type::Array => d.array()?.unwrap_or_default(),
        other => return Err(EraError::Envelope(format!("{:?}", other))),
    };
    if arity != 3 && arity != 4 {
        return Err(EraError::Envelope(format!("array of {}", arity)));
    }

    let mut shape = TxShape {
        arity,
        ..TxShape::default()
    };

    let body_start = d.position();
    inspect_body(&mut d, &mut shape)?;
    let body_end = d.position();

    inspect_witnesses(&mut d, &mut shape)?;

    if arity == 4 {
        if d.datatype()? != Type::Bool {
            return Err(EraError::Field("is_valid flag must be a bool".into()));
        }
        d.bool()?;
    }

    // auxiliary data (or null)
    d.skip()?;

    let rest = bytes.len() - d.position();
    if rest != 0 {
        return Err(EraError::TrailingBytes(rest));
    }

    Ok((shape, &bytes[body_start..body_end]))
}

fn inspect_body(d: &mut Decoder<'_>, shape: &mut TxShape) -> Result<(), EraError> {
    let len = match d.datatype()? {
        Type::Map | Type::MapIndef => d.map()?,
        other => return Err(EraError::Field(format!("body must be a map, got {:?}", other))),
    };

    for_each(d, len, |d| {
        let key = unsigned(d, "body key")?;
        if !shape.body_keys.insert(key) {
            return Err(EraError::Field(format!("duplicate body key {}", key)));
        }
        if SET_KEYS.contains(&key) && d.datatype()? == Type::Tag {
            if d.tag()?.as_u64() != TAG_SET {
                return Err(EraError::Field(format!("unexpected tag on body key {}", key)));
            }
            shape.tagged_set = true;
        }
        match key {
            1 => inspect_outputs(d, shape),
            6 => inspect_update(d, shape),
            2 | 3 | 8 => unsigned(d, "body integer field").map(|_| ()),
            _ => d.skip().map_err(EraError::from),
        }
    })
}

fn inspect_outputs(d: &mut Decoder<'_>, shape: &mut TxShape) -> Result<(), EraError> {
    let len = match d.datatype()? {
        Type::Array | Type::ArrayIndef => d.array()?,
        other => {
            return Err(EraError::Field(format!(
                "outputs must be an array, got {:?}",
                other
            )))
        }
    };

    for_each(d, len, |d| match d.datatype()? {
        Type::Array | Type::ArrayIndef => {
            let mut fields = 0u64;
            let len = d.array()?;
            for_each(d, len, |d| {
                fields += 1;
                match fields {
                    2 => inspect_value(d, shape),
                    3 => {
                        shape.datum_hash_output = true;
                        d.skip().map_err(EraError::from)
                    }
                    _ => d.skip().map_err(EraError::from),
                }
            })?;
            if !(2..=3).contains(&fields) {
                return Err(EraError::Field(format!("output with {} fields", fields)));
            }
            Ok(())
        }
        Type::Map | Type::MapIndef => {
            shape.map_output = true;
            let len = d.map()?;
            for_each(d, len, |d| {
                let key = unsigned(d, "output key")?;
                if key == 1 {
                    inspect_value(d, shape)
                } else {
                    d.skip().map_err(EraError::from)
                }
            })
        }
        other => Err(EraError::Field(format!("output must be array or map, got {:?}", other))),
    })
}

/// `[ { genesis_hash => { param => value } }, epoch ]`
fn inspect_update(d: &mut Decoder<'_>, shape: &mut TxShape) -> Result<(), EraError> {
    if d.datatype()? != Type::Array || d.array()? != Some(2) {
        return Err(EraError::Field("update must be [proposals, epoch]".into()));
    }

    let proposals = match d.datatype()? {
        Type::Map | Type::MapIndef => d.map()?,
        other => {
            return Err(EraError::Field(format!(
                "update proposals must be a map, got {:?}",
                other
            )))
        }
    };
    for_each(d, proposals, |d| {
        // genesis key hash
        d.skip()?;
        let params = match d.datatype()? {
            Type::Map | Type::MapIndef => d.map()?,
            other => {
                return Err(EraError::Field(format!(
                    "parameter update must be a map, got {:?}",
                    other
                )))
            }
        };
        for_each(d, params, |d| {
            let key = unsigned(d, "protocol parameter")?;
            shape.update_params.insert(key);
            d.skip().map_err(EraError::from)
        })
    })?;

    unsigned(d, "update epoch").map(|_| ())
}

fn inspect_value(d: &mut Decoder<'_>, shape: &mut TxShape) -> Result<(), EraError> {
    match d.datatype()? {
        Type::U8 | Type::U16 | Type::U32 | Type::U64 => {
            d.u64()?;
            Ok(())
        }
        Type::Array => {
            // [coin, multiasset]
            if d.array()? != Some(2) {
                return Err(EraError::Field("multi-asset value must be [coin, assets]".into()));
            }
            unsigned(d, "value coin")?;
            match d.datatype()? {
                Type::Map | Type::MapIndef => d.skip()?,
                other => {
                    return Err(EraError::Field(format!(
                        "multi-asset bundle must be a map, got {:?}",
                        other
                    )))
                }
            }
            shape.multi_asset = true;
            Ok(())
        }
        other => Err(EraError::Field(format!("invalid output value {:?}", other))),
    }
}

fn inspect_witnesses(d: &mut Decoder<'_>, shape: &mut TxShape) -> Result<(), EraError> {
    let len = match d.datatype()? {
        Type::Map | Type::MapIndef => d.map()?,
        other => {
            return Err(EraError::Field(format!(
                "witness set must be a map, got {:?}",
                other
            )))
        }
    };
    for_each(d, len, |d| {
        let key = unsigned(d, "witness key")?;
        shape.witness_keys.insert(key);
        d.skip().map_err(EraError::from)
    })
}

/// Era codec predicates. `Err` carries the first violated rule.
fn accepts(era: Era, shape: &TxShape) -> Result<(), String> {
    let expected_arity = if era.has_validity_flag() { 4 } else { 3 };
    if shape.arity != expected_arity {
        return Err(format!("expected {} elements", expected_arity));
    }

    let allowed_body: &[u64] = match era {
        Era::Shelley => &[0, 1, 2, 3, 4, 5, 6, 7],
        Era::Allegra => &[0, 1, 2, 3, 4, 5, 6, 7, 8],
        Era::Mary => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
        Era::Alonzo => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 11, 13, 14, 15],
        Era::Babbage => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 11, 13, 14, 15, 16, 17, 18],
        Era::Conway => &[
            0, 1, 2, 3, 4, 5, 7, 8, 9, 11, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22,
        ],
    };
    if let Some(key) = shape.body_keys.iter().find(|k| !allowed_body.contains(k)) {
        return Err(format!("body key {} not allowed", key));
    }

    let required: &[u64] = match era {
        Era::Shelley => &[0, 1, 2, 3],
        _ => &[0, 1, 2],
    };
    if let Some(key) = required.iter().find(|k| !shape.body_keys.contains(k)) {
        return Err(format!("missing body key {}", key));
    }

    let max_witness_key = match era {
        Era::Shelley | Era::Allegra | Era::Mary => 2,
        Era::Alonzo => 5,
        Era::Babbage => 6,
        Era::Conway => 7,
    };
    if let Some(key) = shape.witness_keys.iter().find(|k| **k > max_witness_key) {
        return Err(format!("witness key {} not allowed", key));
    }

    // Alonzo retired min_utxo_value (15); Babbage retired d (12) and extra_entropy (13).
    let param_allowed = |param: u64| match era {
        Era::Shelley | Era::Allegra | Era::Mary => param <= 15,
        Era::Alonzo => param <= 24 && param != 15,
        Era::Babbage | Era::Conway => param <= 24 && !matches!(param, 12 | 13 | 15),
    };
    if let Some(param) = shape.update_params.iter().find(|p| !param_allowed(**p)) {
        return Err(format!("protocol parameter {} not allowed", param));
    }

    if shape.multi_asset && era < Era::Mary {
        return Err("multi-asset values not supported".into());
    }
    if shape.datum_hash_output && era < Era::Alonzo {
        return Err("datum hashes not supported".into());
    }
    if shape.map_output && era < Era::Babbage {
        return Err("map-encoded outputs not supported".into());
    }
    if shape.tagged_set && era < Era::Conway {
        return Err("tagged sets not supported".into());
    }

    Ok(())
}

fn unsigned(d: &mut Decoder<'_>, what: &str) -> Result<u64, EraError> {
    match d.datatype()? {
        Type::U8 | Type::U16 | Type::U32 | Type::U64 => Ok(d.u64()?),
        other => Err(EraError::Field(format!("{} must be unsigned, got {:?}", what, other))),
    }
}

/// Visits the items of a definite or indefinite container.
fn for_each<'b, F>(d: &mut Decoder<'b>, len: Option<u64>, mut item: F) -> Result<(), EraError>
where
    F: FnMut(&mut Decoder<'b>) -> Result<(), EraError>,
{
    match len {
        Some(n) => {
            for _ in 0..n {
                item(d)?;
            }
        }
        None => {
            while d.datatype()? != Type::Break {
                item(d)?;
            }
            // break marker is a single byte
            d.set_position(d.position() + 1);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use minicbor::encode::Error;
    use minicbor::Encoder;
    use std::convert::Infallible;

    /// `[ {0: inputs, 1: [output], 2: fee}, {}, true, null ]`
    fn minimal_four_element(map_output: bool) -> Result<Vec<u8>, Error<Infallible>> {
        let mut e = Encoder::new(Vec::new());
        e.array(4)?.map(3)?;
        e.u64(0)?.array(1)?.array(2)?.bytes(&[0x11; 32])?.u64(0)?;
        e.u64(1)?.array(1)?;
        if map_output {
            e.map(2)?.u64(0)?.bytes(&[0x61; 29])?.u64(1)?.u64(2_000_000)?;
        } else {
            e.array(2)?.bytes(&[0x61; 29])?.u64(2_000_000)?;
        }
        e.u64(2)?.u64(170_000)?;
        e.map(0)?.bool(true)?.null()?;
        Ok(e.into_writer())
    }

    fn shape_of(era: Era) -> TxShape {
        inspect(&fixtures::transaction(era).bytes).unwrap().0
    }

    #[test]
    fn test_classifies_every_era() {
        for era in Era::ALL {
            let fixture = fixtures::transaction(era);
            let classified = classify(&fixture.bytes).unwrap();
            assert_eq!(classified.era, fixtures::detected_era(era), "fixture for {}", era);
        }
    }

    #[test]
    fn test_distinct_fixtures_keep_their_era() {
        for era in [Era::Conway, Era::Babbage, Era::Alonzo, Era::Mary] {
            let fixture = fixtures::transaction(era);
            assert_eq!(classify(&fixture.bytes).unwrap().era, era);
        }
    }

    #[test]
    fn test_tx_id_is_body_hash() {
        for era in Era::ALL {
            let fixture = fixtures::transaction(era);
            let classified = classify(&fixture.bytes).unwrap();
            assert_eq!(classified.tx_id, TxId::from_body(&fixture.body));
        }
    }

    #[test]
    fn test_body_bytes_are_exact_slice() {
        let fixture = fixtures::transaction(Era::Babbage);
        assert_eq!(body_bytes(&fixture.bytes).unwrap(), fixture.body.as_slice());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(classify(&[]), Err(EraError::Empty));
    }

    #[test]
    fn test_not_an_array() {
        // CBOR unsigned 5
        assert!(matches!(classify(&[0x05]), Err(EraError::Envelope(_))));
    }

    #[test]
    fn test_wrong_arity() {
        // [1, 2]
        assert!(matches!(
            classify(&[0x82, 0x01, 0x02]),
            Err(EraError::Envelope(_))
        ));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = fixtures::transaction(Era::Shelley).bytes;
        bytes.push(0x00);
        assert_eq!(classify(&bytes), Err(EraError::TrailingBytes(1)));
    }

    #[test]
    fn test_truncated_input() {
        let bytes = fixtures::transaction(Era::Mary).bytes;
        assert!(matches!(
            classify(&bytes[..bytes.len() - 3]),
            Err(EraError::Cbor(_))
        ));
    }

    #[test]
    fn test_unknown_body_key_matches_no_era() {
        let bytes = fixtures::with_body_key(Era::Shelley, 30);
        match classify(&bytes).unwrap_err() {
            EraError::NoMatchingEra(attempts) => {
                let eras: Vec<Era> = attempts.iter().map(|(era, _)| *era).collect();
                assert_eq!(eras, Era::DETECTION_ORDER.to_vec());
            }
            other => panic!("expected NoMatchingEra, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_four_element_tx_is_conway() {
        for map_output in [true, false] {
            let bytes = minimal_four_element(map_output).unwrap();
            assert_eq!(classify(&bytes).unwrap().era, Era::Conway, "map output: {}", map_output);
        }
    }

    #[test]
    fn test_plain_three_element_tx_is_mary() {
        let fixture = fixtures::transaction(Era::Shelley);
        assert_eq!(classify(&fixture.bytes).unwrap().era, Era::Mary);
    }

    #[test]
    fn test_update_field_rejected_in_conway() {
        let reason = accepts(Era::Conway, &shape_of(Era::Babbage)).unwrap_err();
        assert!(reason.contains("body key 6"), "{}", reason);
    }

    #[test]
    fn test_retired_parameter_rejected_in_babbage() {
        let shape = shape_of(Era::Alonzo);
        assert!(shape.update_params.contains(&12));
        let reason = accepts(Era::Babbage, &shape).unwrap_err();
        assert_eq!(reason, "protocol parameter 12 not allowed");
        assert_eq!(accepts(Era::Alonzo, &shape), Ok(()));
    }

    #[test]
    fn test_malformed_update_is_field_error() {
        // `6 => 0` instead of `[proposals, epoch]`
        let bytes = fixtures::with_body_key(Era::Mary, 6);
        assert!(matches!(classify(&bytes), Err(EraError::Field(_))));
    }

    #[test]
    fn test_indefinite_body_map() {
        let fixture = fixtures::indefinite_body_transaction();
        let classified = classify(&fixture.bytes).unwrap();
        assert_eq!(classified.era, Era::Mary);
        assert_eq!(classified.tx_id, TxId::from_body(&fixture.body));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn classify_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = classify(&bytes);
        }

        #[test]
        fn appended_garbage_is_rejected(era_idx in 0usize..6, tail in proptest::collection::vec(any::<u8>(), 1..16)) {
            let era = Era::ALL[era_idx];
            let mut bytes = crate::fixtures::transaction(era).bytes;
            bytes.extend_from_slice(&tail);
            prop_assert!(classify(&bytes).is_err());
        }
    }
}

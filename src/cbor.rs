//! This module implements conversions from [`ciborium::Value`].
//!
//! Matching requires converting data to a generic type [`Value`]. This
//! module also contains the convenience entry points that take raw or
//! hex-encoded CBOR.

use crate::ast::Schema;
use crate::datum::ReadableDatum;
use crate::matcher::match_datum;
use crate::parser::parse_cddl;
use crate::util::{DatumError, DatumResult};
use crate::value::Value;
use ciborium::value::{Integer, Value as CBOR_Value};
use std::convert::TryFrom;
use tracing::trace;

/// Tag number for a positive bignum.
const TAG_BIGNUM_POS: u64 = 2;
/// Tag number for a negative bignum.
const TAG_BIGNUM_NEG: u64 = 3;

// CDDL and CBOR were designed to work with one another, so it's not
// surprising that they map almost perfectly.
impl TryFrom<&CBOR_Value> for Value {
    type Error = DatumError;

    fn try_from(value: &CBOR_Value) -> DatumResult<Value> {
        let result = match value {
            CBOR_Value::Null => Value::Null,
            CBOR_Value::Bool(b) => Value::Bool(*b),
            CBOR_Value::Integer(i) => Value::Integer(i128::from(*i)),
            CBOR_Value::Float(f) => Value::Float(*f),
            CBOR_Value::Bytes(b) => Value::Bytes(b.clone()),
            CBOR_Value::Text(t) => Value::Text(t.clone()),
            CBOR_Value::Array(a) => {
                let array = a.iter().map(Value::try_from).collect::<DatumResult<_>>()?;
                Value::Array(array)
            }
            CBOR_Value::Map(m) => {
                let map = m
                    .iter()
                    .map(|(k, v)| Ok((Value::try_from(k)?, Value::try_from(v)?)))
                    .collect::<DatumResult<_>>()?;
                Value::Map(map)
            }
            CBOR_Value::Tag(tag, inner) => {
                let inner = Value::try_from(inner.as_ref())?;
                match bignum_to_integer(*tag, &inner) {
                    Some(i) => Value::Integer(i),
                    None => Value::Tag(*tag, Box::new(inner)),
                }
            }
            _ => {
                return Err(DatumError::CborDecode(
                    "unsupported CBOR data item".to_string(),
                ))
            }
        };
        Ok(result)
    }
}

// A variant that consumes the CBOR Value.
impl TryFrom<CBOR_Value> for Value {
    type Error = DatumError;

    fn try_from(value: CBOR_Value) -> DatumResult<Value> {
        Value::try_from(&value)
    }
}

// Bignums that fit in an i128 are just integers.
fn bignum_to_integer(tag: u64, inner: &Value) -> Option<i128> {
    let bytes = match inner {
        Value::Bytes(b) => b,
        _ => return None,
    };
    if tag != TAG_BIGNUM_POS && tag != TAG_BIGNUM_NEG {
        return None;
    }
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let digits = &bytes[first..];
    if digits.len() > 16 {
        return None;
    }
    let magnitude = digits
        .iter()
        .fold(0u128, |acc, b| (acc << 8) | u128::from(*b));
    let magnitude = i128::try_from(magnitude).ok()?;
    if tag == TAG_BIGNUM_POS {
        Some(magnitude)
    } else {
        Some(-1 - magnitude)
    }
}

impl From<&Value> for CBOR_Value {
    fn from(value: &Value) -> CBOR_Value {
        match value {
            Value::Null => CBOR_Value::Null,
            Value::Bool(b) => CBOR_Value::Bool(*b),
            Value::Integer(i) => match Integer::try_from(*i) {
                Ok(small) => CBOR_Value::Integer(small),
                Err(_) => integer_to_bignum(*i),
            },
            Value::Float(f) => CBOR_Value::Float(*f),
            Value::Bytes(b) => CBOR_Value::Bytes(b.clone()),
            Value::Text(t) => CBOR_Value::Text(t.clone()),
            Value::Array(a) => CBOR_Value::Array(a.iter().map(CBOR_Value::from).collect()),
            Value::Map(m) => CBOR_Value::Map(
                m.iter()
                    .map(|(k, v)| (CBOR_Value::from(k), CBOR_Value::from(v)))
                    .collect(),
            ),
            Value::Tag(tag, inner) => {
                CBOR_Value::Tag(*tag, Box::new(CBOR_Value::from(inner.as_ref())))
            }
        }
    }
}

fn integer_to_bignum(i: i128) -> CBOR_Value {
    // For negative n, the encoded magnitude is -1 - n, which is !n.
    let (tag, magnitude) = if i >= 0 {
        (TAG_BIGNUM_POS, i as u128)
    } else {
        (TAG_BIGNUM_NEG, (!i) as u128)
    };
    let bytes = magnitude.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    CBOR_Value::Tag(tag, Box::new(CBOR_Value::Bytes(bytes[first..].to_vec())))
}

/// Decode exactly one CBOR data item.
///
/// Truncated input, or bytes left over after the first item, are errors.
pub fn decode_cbor(bytes: &[u8]) -> DatumResult<Value> {
    let mut reader = bytes;
    let cbor_value: CBOR_Value = ciborium::de::from_reader(&mut reader).map_err(|e| {
        let msg = format!("{:?}", e);
        DatumError::CborDecode(msg)
    })?;
    if !reader.is_empty() {
        let msg = format!("{} trailing bytes", reader.len());
        return Err(DatumError::CborDecode(msg));
    }
    trace!(len = bytes.len(), "decoded cbor");
    Value::try_from(cbor_value)
}

/// Decode a hex string (either case) holding exactly one CBOR data item.
pub fn decode_cbor_hex(hex_str: &str) -> DatumResult<Value> {
    let bytes = hex::decode(hex_str).map_err(|_| DatumError::NotAHexString)?;
    decode_cbor(&bytes)
}

/// Encode a value as CBOR.
///
/// Integers are written in their shortest form; integers that don't fit in
/// 64 bits become bignums.
pub fn encode_cbor(value: &Value) -> DatumResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&CBOR_Value::from(value), &mut bytes)
        .map_err(|e| DatumError::CborEncode(format!("{:?}", e)))?;
    Ok(bytes)
}

/// Match raw CBOR bytes against a schema.
pub fn match_cbor_bytes(schema: &Schema, cbor: &[u8]) -> DatumResult<ReadableDatum> {
    let value = decode_cbor(cbor)?;
    match_datum(schema, &value)
}

/// Match hex-encoded CBOR against a schema.
pub fn match_cbor_hex(schema: &Schema, cbor_hex: &str) -> DatumResult<ReadableDatum> {
    let value = decode_cbor_hex(cbor_hex)?;
    match_datum(schema, &value)
}

/// Match hex-encoded CBOR against a CDDL document.
///
/// The hex string is checked before the CDDL text is parsed.
pub fn match_cddl_cbor_hex(cddl: &str, cbor_hex: &str) -> DatumResult<ReadableDatum> {
    let value = decode_cbor_hex(cbor_hex)?;
    let schema = parse_cddl(cddl)?;
    match_datum(&schema, &value)
}

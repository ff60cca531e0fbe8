//! This module defines the result tree produced by matching.
//!
//! A [`ReadableDatum`] is a typed value: `{type, value}`. The value is a
//! primitive, another datum, a list of named fields (for fixed-shape
//! arrays), or a plain sequence (for repeated arrays and table entries).
//!
//! The tree serializes to plain JSON-like data:
//! ```text
//! {"type": "Foo", "value": [{"name": "amount", "type": "int", "value": 100}]}
//! ```

use serde::Serialize;

/// The largest integer magnitude that survives a round trip through an f64.
pub const MAX_SAFE_INTEGER: i128 = (1 << 53) - 1;

/// A matched value, labelled with the name of the type it matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadableDatum {
    /// A rule name, a prelude type name, or `"Table"`.
    #[serde(rename = "type")]
    pub type_name: String,
    #[allow(missing_docs)]
    pub value: DatumValue,
}

/// The payload of a [`ReadableDatum`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DatumValue {
    /// An integer within the safe range.
    Number(i64),
    /// A number with a fractional part, or outside the safe integer range.
    Float(f64),
    /// Text: hex-encoded bytes, or an integer outside the safe range.
    Text(String),
    /// A nested typed value.
    Datum(Box<ReadableDatum>),
    /// Named fields of a fixed-shape array, in order.
    Struct(Vec<NamedDatum>),
    /// Items of a repeated array, or `[key, value]` pairs of a table.
    Sequence(Vec<DatumValue>),
}

/// One field of a [`DatumValue::Struct`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedDatum {
    /// The field name from the schema.
    pub name: String,
    /// The type the field matched.
    #[serde(rename = "type")]
    pub type_name: String,
    #[allow(missing_docs)]
    pub value: DatumValue,
}

impl ReadableDatum {
    /// Create a new datum.
    pub fn new<S: Into<String>>(type_name: S, value: DatumValue) -> ReadableDatum {
        ReadableDatum {
            type_name: type_name.into(),
            value,
        }
    }

    /// Attach a field name.
    pub fn named<S: Into<String>>(self, name: S) -> NamedDatum {
        NamedDatum {
            name: name.into(),
            type_name: self.type_name,
            value: self.value,
        }
    }

    /// Render as a JSON value.
    #[cfg(feature = "serde_json")]
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("type".into(), self.type_name.clone().into());
        map.insert("value".into(), self.value.to_json());
        map.into()
    }
}

impl DatumValue {
    /// An integer, as a number if it's in the safe range and as decimal text otherwise.
    pub fn from_integer(i: i128) -> DatumValue {
        match i64::try_from(i) {
            Ok(n) if (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&i) => DatumValue::Number(n),
            _ => DatumValue::Text(i.to_string()),
        }
    }

    /// A float, as a number if it holds a safe integer exactly.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_float(f: f64) -> DatumValue {
        if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER as f64 {
            DatumValue::Number(f as i64)
        } else {
            DatumValue::Float(f)
        }
    }

    /// Render as a JSON value.
    #[cfg(feature = "serde_json")]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            DatumValue::Number(n) => (*n).into(),
            // NaN and infinities have no JSON form and become null.
            DatumValue::Float(f) => (*f).into(),
            DatumValue::Text(t) => t.clone().into(),
            DatumValue::Datum(d) => d.to_json(),
            DatumValue::Struct(fields) => fields.iter().map(NamedDatum::to_json).collect(),
            DatumValue::Sequence(items) => items.iter().map(DatumValue::to_json).collect(),
        }
    }
}

impl From<ReadableDatum> for DatumValue {
    fn from(datum: ReadableDatum) -> DatumValue {
        DatumValue::Datum(Box::new(datum))
    }
}

impl NamedDatum {
    /// Render as a JSON value.
    #[cfg(feature = "serde_json")]
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("name".into(), self.name.clone().into());
        map.insert("type".into(), self.type_name.clone().into());
        map.insert("value".into(), self.value.to_json());
        map.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_integers() {
        assert_eq!(DatumValue::from_integer(-5), DatumValue::Number(-5));
        assert_eq!(
            DatumValue::from_integer(MAX_SAFE_INTEGER),
            DatumValue::Number(9007199254740991)
        );
        assert_eq!(
            DatumValue::from_integer(MAX_SAFE_INTEGER + 1),
            DatumValue::Text("9007199254740992".into())
        );
        assert_eq!(
            DatumValue::from_integer(-(1 << 64)),
            DatumValue::Text("-18446744073709551616".into())
        );
    }

    #[test]
    fn floats() {
        assert_eq!(DatumValue::from_float(1.0), DatumValue::Number(1));
        assert_eq!(DatumValue::from_float(-0.0), DatumValue::Number(0));
        assert_eq!(DatumValue::from_float(1.5), DatumValue::Float(1.5));
        assert_eq!(DatumValue::from_float(1e300), DatumValue::Float(1e300));
        assert!(matches!(DatumValue::from_float(f64::NAN), DatumValue::Float(f) if f.is_nan()));
    }

    #[cfg(feature = "serde_json")]
    #[test]
    fn json_shape() {
        let datum = ReadableDatum::new(
            "Foo",
            DatumValue::Struct(vec![
                ReadableDatum::new("int", DatumValue::Number(100)).named("amount"),
                ReadableDatum::new("bytes", DatumValue::Text("cafe".into())).named("label"),
            ]),
        );
        let expected = serde_json::json!({
            "type": "Foo",
            "value": [
                {"name": "amount", "type": "int", "value": 100},
                {"name": "label", "type": "bytes", "value": "cafe"},
            ]
        });
        assert_eq!(datum.to_json(), expected);
        // The serde derive produces the same shape.
        assert_eq!(serde_json::to_value(&datum).unwrap(), expected);
    }
}

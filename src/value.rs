//! This module declares a generic Value enum for use with matching.

use strum_macros::IntoStaticStr;

/// `Value` represents all the kinds of decoded data we can match.
///
/// To match a new type of data, write a conversion into `Value` for that
/// type.  See the [`cbor`] module for an example.
///
/// Unlike a typical map type, [`Value::Map`] keeps its entries in the order
/// they were decoded; table results are built in that order.
///
/// [`cbor`]: crate::cbor
///
#[derive(Debug, Clone, PartialEq, IntoStaticStr)]
#[allow(missing_docs)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i128),
    Float(f64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Tag(u64, Box<Value>),
}

impl Value {
    /// The runtime kind of this value, used in mismatch messages.
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Value {
        Value::Integer(i.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Value {
        Value::Bytes(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(Value::Null.kind(), "Null");
        assert_eq!(Value::from(7).kind(), "Integer");
        assert_eq!(Value::from(vec![1u8]).kind(), "Bytes");
        assert_eq!(Value::Tag(24, Box::new(Value::from("x"))).kind(), "Tag");
        assert_eq!(Value::Map(vec![]).kind(), "Map");
    }
}

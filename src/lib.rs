//! `cddl-datum` is a library for decoding CBOR data into a readable,
//! typed tree, using a CDDL document to name every part of the data.
//!
//! CDDL is a text document described by [RFC8610] that describes data
//! structures. Given a schema and a [CBOR] value, this library finds the
//! path through the schema that the value takes, and returns a
//! [`ReadableDatum`]: a tree of `{type, value}` nodes that can be shown to
//! a person or rendered as JSON.
//!
//! # Implementation Details
//!
//! - CDDL text is parsed into an AST ([`ast`]) whose shape mirrors the JSON
//!   tree produced by other CDDL tools; such a tree can also be loaded
//!   directly with [`Schema::from_json`](crate::ast::Schema::from_json).
//!
//! - Matching is performed by first translating the incoming data into a
//!   generic [`Value`], so the matcher itself doesn't know about CBOR.
//!
//! - Matching code uses a [`LookupContext`](crate::context::LookupContext)
//!   object to perform all rule lookups.
//!
//! - Schemas can be checked ahead of time with [`validate_schema`]; a
//!   schema that passes will only fail to match because of the data.
//!
//! # Examples
//!
//! Decoding a hex-encoded CBOR array against a schema:
//!
//! ```
//! use cddl_datum::match_cddl_cbor_hex;
//!
//! let cddl = "Foo = [amount: int, label: bytes]";
//! // [100, h'cafe']
//! let datum = match_cddl_cbor_hex(cddl, "82186442cafe").unwrap();
//! assert_eq!(datum.type_name, "Foo");
//! # #[cfg(feature = "serde_json")]
//! assert_eq!(
//!     datum.to_json(),
//!     serde_json::json!({
//!         "type": "Foo",
//!         "value": [
//!             {"name": "amount", "type": "int", "value": 100},
//!             {"name": "label", "type": "bytes", "value": "cafe"},
//!         ]
//!     })
//! );
//! ```
//!
//! If the data doesn't have the expected structure, the error describes
//! the path to the failure:
//! ```
//! use cddl_datum::{flatten_message, match_cddl_cbor_hex};
//!
//! let cddl = "Foo = #6.5(int)";
//! let err = match_cddl_cbor_hex(cddl, "c707").unwrap_err();
//! assert_eq!(
//!     flatten_message(&err),
//!     "When parsing TypeRule \"Foo\":\n  \
//!      CDDL expects TaggedData with tag = 5, but CBOR is Tag with tag = 7"
//! );
//! ```
//!
//! Supported prelude types:
//! - `int`, `bytes`, `any`
//!
//! `any` matches anything; its value is the re-encoded CBOR, as hex.
//!
//! Supported CDDL features:
//! - Rule lookups by name
//! - Type choices (using `/`) made of named types
//! - Arrays of one repeated entry (`[* Foo]`), with occurrence bounds
//! - Fixed-shape arrays with named fields (`[a: Foo, b: Bar]`)
//! - Tables (`{* Key => Value}`)
//! - Tagged data (`#6.N(Foo)`)
//!
//! Everything else parses, but is rejected by [`validate_schema`] and by
//! the matcher. Range and control operators are ignored.
//!
//! [RFC8610]: https://tools.ietf.org/html/rfc8610
//! [CBOR]: https://cbor.io/

#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![warn(clippy::cast_possible_truncation)]

pub mod ast;
pub mod cbor;
pub mod context;
pub mod datum;
pub mod matcher;
pub mod parser;
pub mod util;
pub mod validate;
pub mod value;

#[doc(inline)]
pub use ast::Schema;
#[doc(inline)]
pub use cbor::{
    decode_cbor, decode_cbor_hex, encode_cbor, match_cbor_bytes, match_cbor_hex, match_cddl_cbor_hex,
};
#[doc(inline)]
pub use datum::{DatumValue, NamedDatum, ReadableDatum};
#[doc(inline)]
pub use matcher::{detect, match_datum, match_datum_with, Detected};
#[doc(inline)]
pub use parser::parse_cddl;
#[doc(inline)]
pub use util::{flatten_message, DatumError, DatumResult, ValidateResult};
#[doc(inline)]
pub use validate::{validate_cddl, validate_schema};
#[doc(inline)]
pub use value::Value;

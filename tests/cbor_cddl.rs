#![cfg(feature = "serde_json")]

use cddl_datum::util::{OccurrenceBound, Structure};
use cddl_datum::{
    detect, flatten_message, match_cbor_bytes, match_cddl_cbor_hex, parse_cddl, validate_cddl,
    validate_schema, DatumError, DatumResult, ReadableDatum,
};
use serde_json::json;

#[rustfmt::skip] // allow arbitrary indents for readability
pub mod cbor {
    pub const BOOL_FALSE:   &[u8] = b"\xF4";
    pub const NULL:         &[u8] = b"\xF6";

    pub const INT_7:        &[u8] = b"\x07";
    pub const INT_100:      &[u8] = b"\x18\x64";
    pub const NINT_1000:    &[u8] = b"\x39\x03\xe7";  // -1000
    pub const INT_2_53:     &[u8] = b"\x1b\x00\x20\x00\x00\x00\x00\x00\x00";  // 2^53
    pub const BIGNUM_2_64:  &[u8] = b"\xc2\x49\x01\x00\x00\x00\x00\x00\x00\x00\x00";  // 2^64
    pub const FLOAT_1_0:    &[u8] = b"\xf9\x3c\x00";
    pub const FLOAT_1_5:    &[u8] = b"\xf9\x3e\x00";

    pub const BYTES_CAFE:   &[u8] = b"\x42\xca\xfe";

    pub const ARRAY_EMPTY:  &[u8] = b"\x80";              // []
    pub const ARRAY_123:    &[u8] = b"\x83\x01\x02\x03";  // [1,2,3]
    pub const ARRAY_1_23:   &[u8] = b"\x82\x01\x82\x02\x03";  // [1, [2, 3]]
    pub const ARRAY_100_CAFE: &[u8] = b"\x82\x18\x64\x42\xca\xfe";  // [100, h'cafe']
    pub const ARRAY_CAFE:   &[u8] = b"\x81\x42\xca\xfe";  // [h'cafe']

    pub const MAP_AA_BB:    &[u8] = b"\xa2\x02\x41\xbb\x01\x41\xaa";  // {2: h'bb', 1: h'aa'}

    pub const TAG_5_7:      &[u8] = b"\xc5\x07";  // 5(7)
    pub const TAG_7_7:      &[u8] = b"\xc7\x07";  // 7(7)
}

fn match_bytes(cddl: &str, bytes: &[u8]) -> DatumResult<ReadableDatum> {
    let schema = parse_cddl(cddl).unwrap();
    match_cbor_bytes(&schema, bytes)
}

fn match_json(cddl: &str, bytes: &[u8]) -> serde_json::Value {
    match_bytes(cddl, bytes).unwrap().to_json()
}

#[test]
fn prelude_int() {
    let cddl = "Foo = int";
    assert_eq!(
        match_json(cddl, cbor::INT_100),
        json!({"type": "Foo", "value": {"type": "int", "value": 100}})
    );
    assert_eq!(
        match_json(cddl, cbor::NINT_1000),
        json!({"type": "Foo", "value": {"type": "int", "value": -1000}})
    );
    // Beyond 2^53 - 1, integers become decimal strings.
    assert_eq!(
        match_json(cddl, cbor::INT_2_53),
        json!({"type": "Foo", "value": {"type": "int", "value": "9007199254740992"}})
    );
    assert_eq!(
        match_json(cddl, cbor::BIGNUM_2_64),
        json!({"type": "Foo", "value": {"type": "int", "value": "18446744073709551616"}})
    );

    // Floats are numbers too; integral ones print like integers.
    assert_eq!(
        match_json(cddl, cbor::FLOAT_1_0),
        json!({"type": "Foo", "value": {"type": "int", "value": 1}})
    );
    assert_eq!(
        match_json(cddl, cbor::FLOAT_1_5),
        json!({"type": "Foo", "value": {"type": "int", "value": 1.5}})
    );
    assert_eq!(
        match_cddl_cbor_hex(cddl, "f93c00").unwrap().to_json(),
        json!({"type": "Foo", "value": {"type": "int", "value": 1}})
    );
    let err = match_bytes(cddl, cbor::NULL).unwrap_err();
    assert_eq!(err.root_cause().to_string(), "CDDL expects number, but cbor is Null");
}

#[test]
fn prelude_bytes_and_any() {
    assert_eq!(
        match_json("Foo = bytes", cbor::BYTES_CAFE),
        json!({"type": "Foo", "value": {"type": "bytes", "value": "cafe"}})
    );
    let err = match_bytes("Foo = bytes", cbor::INT_7).unwrap_err();
    assert_eq!(err.root_cause(), &DatumError::NotABuffer { actual: "Integer" });

    assert_eq!(
        match_json("Foo = [* any]", cbor::ARRAY_123),
        json!({"type": "Foo", "value": [
            {"type": "any", "value": "01"},
            {"type": "any", "value": "02"},
            {"type": "any", "value": "03"},
        ]})
    );
    assert_eq!(
        match_json("Foo = any", cbor::MAP_AA_BB),
        json!({"type": "Foo", "value": {"type": "any", "value": "a20241bb0141aa"}})
    );
}

#[test]
fn first_match_wins() {
    let cddl = "Bar = A / B\nA = int\nB = bytes";
    // The result is named after the alternative, not after Bar.
    assert_eq!(
        match_json(cddl, cbor::INT_100),
        json!({"type": "A", "value": {"type": "int", "value": 100}})
    );
    assert_eq!(
        match_json(cddl, cbor::BYTES_CAFE),
        json!({"type": "B", "value": {"type": "bytes", "value": "cafe"}})
    );
    // Both alternatives accept anything; the first one is used.
    let cddl = "Bar = A / B\nA = any\nB = any";
    assert_eq!(match_bytes(cddl, cbor::INT_7).unwrap().type_name, "A");
}

#[test]
fn fixed_shape_struct() {
    let cddl = "Foo = [amount: int, label: bytes]";
    assert_eq!(
        match_json(cddl, cbor::ARRAY_100_CAFE),
        json!({"type": "Foo", "value": [
            {"name": "amount", "type": "int", "value": 100},
            {"name": "label", "type": "bytes", "value": "cafe"},
        ]})
    );

    let err = match_bytes(cddl, cbor::ARRAY_123).unwrap_err();
    assert_eq!(
        err.root_cause(),
        &DatumError::ArrayLengthMismatch {
            expected: 2,
            actual: 3
        }
    );

    let err = match_bytes(cddl, cbor::BYTES_CAFE).unwrap_err();
    assert_eq!(err.root_cause(), &DatumError::NotAnArray { actual: "Bytes" });
}

#[test]
fn struct_field_errors() {
    let cddl = "Foo = [amount: int, label: bytes]";
    let err = match_bytes(cddl, b"\x82\x41\x00\x42\xca\xfe").unwrap_err();
    let expected = concat!(
        "When parsing TypeRule \"Foo\":\n",
        "  When parsing ValueMemberKey \"amount\":\n",
        "    When parsing its only type choice Typename:\n",
        "      CDDL expects number, but cbor is Bytes",
    );
    assert_eq!(flatten_message(&err), expected);

    let err = match_bytes("Foo = [int, bytes]", cbor::ARRAY_100_CAFE).unwrap_err();
    let expected = concat!(
        "When parsing TypeRule \"Foo\":\n",
        "  Error parsing ValueMemberKey on index 0, while Array has 2 items\n",
        "    Missing memberKey",
    );
    assert_eq!(flatten_message(&err), expected);
}

#[test]
fn singleton_array() {
    let cddl = "Foo = [Bar]\nBar = bytes";
    assert_eq!(
        match_json(cddl, cbor::ARRAY_CAFE),
        json!({"type": "Foo", "value":
            {"type": "Bar", "value": {"type": "bytes", "value": "cafe"}}
        })
    );
}

#[test]
fn empty_array() {
    assert_eq!(
        match_json("Foo = []", cbor::ARRAY_EMPTY),
        json!({"type": "Foo", "value": []})
    );
    assert_eq!(
        match_json("Foo = [* int]", cbor::ARRAY_EMPTY),
        json!({"type": "Foo", "value": []})
    );
}

#[test]
fn repeated_array_bounds() {
    let cddl = "Foo = [2*4 int]";
    let err = match_bytes(cddl, cbor::ARRAY_EMPTY).unwrap_err();
    assert_eq!(
        err.root_cause(),
        &DatumError::OccurrenceViolation {
            structure: Structure::Array,
            actual: 0,
            bound: OccurrenceBound::Lower(2),
        }
    );
    assert_eq!(
        err.root_cause().to_string(),
        "array length 0 is less than lower bound 2 defined by Occurrence"
    );
    match_bytes(cddl, cbor::ARRAY_123).unwrap();

    let err = match_bytes("Foo = [+ int]", cbor::ARRAY_EMPTY).unwrap_err();
    assert_eq!(
        err.root_cause().to_string(),
        "array length 0 is less than OneOrMore defined by Occurrence"
    );
    let err = match_bytes("Foo = [*2 int]", cbor::ARRAY_123).unwrap_err();
    assert_eq!(
        err.root_cause().to_string(),
        "array length 3 is more than upper bound 2 defined by Occurrence"
    );
}

#[test]
fn repeated_array_items() {
    let err = match_bytes("Foo = [* bytes]", cbor::ARRAY_123).unwrap_err();
    let expected = concat!(
        "When parsing TypeRule \"Foo\":\n",
        "  When parsing array item 0:\n",
        "    When parsing its only type choice Typename:\n",
        "      CDDL expects Buffer, but cbor is Integer",
    );
    assert_eq!(flatten_message(&err), expected);

    let err = match_bytes("Foo = [* int, * bytes]", cbor::ARRAY_123).unwrap_err();
    assert_eq!(
        err.root_cause(),
        &DatumError::OnlyOneRepeatedEntrySupported {
            structure: Structure::Array,
            count: 2,
            rule: None,
        }
    );
}

#[test]
fn tables() {
    let cddl = "Foo = {* int => bytes}";
    // Rows keep the order of the encoded map.
    assert_eq!(
        match_json(cddl, cbor::MAP_AA_BB),
        json!({"type": "Foo", "value": {"type": "Table", "value": [
            [{"type": "int", "value": 2}, {"type": "bytes", "value": "bb"}],
            [{"type": "int", "value": 1}, {"type": "bytes", "value": "aa"}],
        ]}})
    );

    let err = match_bytes("Foo = {? int => bytes}", cbor::MAP_AA_BB).unwrap_err();
    assert_eq!(
        err.root_cause().to_string(),
        "table size 2 is more than Optional defined by Occurrence"
    );
    let err = match_bytes(cddl, cbor::ARRAY_EMPTY).unwrap_err();
    assert_eq!(err.root_cause(), &DatumError::NotAMap { actual: "Array" });
}

#[test]
fn tagged_data() {
    assert_eq!(
        match_json("Foo = #6.7(int)", cbor::TAG_7_7),
        json!({"type": "Foo", "value": {"type": "int", "value": 7}})
    );
    // No tag number: any tag is accepted.
    match_bytes("Foo = #6(int)", cbor::TAG_5_7).unwrap();

    let err = match_bytes("Foo = #6.5(int)", cbor::TAG_7_7).unwrap_err();
    assert_eq!(
        err.root_cause(),
        &DatumError::TagMismatch {
            expected: 5,
            actual: 7
        }
    );
    let err = match_bytes("Foo = #6.5(int)", cbor::INT_7).unwrap_err();
    assert_eq!(err.root_cause(), &DatumError::NotATag { actual: "Integer" });
    let err = match_bytes("Foo = #6.5(int / bytes)", cbor::TAG_5_7).unwrap_err();
    assert_eq!(
        err.root_cause(),
        &DatumError::MultipleTaggedChoicesUnsupported {
            count: 2,
            rule: None
        }
    );
}

#[test]
fn aggregate_message_shape() {
    let cddl = "Bar = A / B / C\nA = int\nB = bytes\nC = [* int]";
    let err = match_bytes(cddl, cbor::BOOL_FALSE).unwrap_err();
    let expected = concat!(
        "When parsing TypeRule \"Bar\":\n",
        "  Failed to parse cbor with any of the 3 type choices\n",
        "    When parsing TypeRule \"A\":\n",
        "      CDDL expects number, but cbor is Bool\n",
        "    When parsing TypeRule \"B\":\n",
        "      CDDL expects Buffer, but cbor is Bool\n",
        "    When parsing TypeRule \"C\":\n",
        "      CDDL expects Array, but cbor is Bool",
    );
    assert_eq!(flatten_message(&err), expected);
}

#[test]
fn nested_array_rejected() {
    let cddl = "Foo = [a: int, b: [* int]]";
    let err = match_bytes(cddl, cbor::ARRAY_1_23).unwrap_err();
    assert_eq!(err.root_cause(), &DatumError::NestedArraysUnsupported);

    let schema = parse_cddl(cddl).unwrap();
    let err = validate_schema(&schema).unwrap_err();
    assert_eq!(err.root_cause(), &DatumError::NestedArraysUnsupported);

    // Wrapping the inner array in a named type is fine.
    let cddl = "Foo = [a: int, b: Ints]\nInts = [* int]";
    assert_eq!(
        match_json(cddl, cbor::ARRAY_1_23),
        json!({"type": "Foo", "value": [
            {"name": "a", "type": "int", "value": 1},
            {"name": "b", "type": "Ints", "value": [
                {"type": "int", "value": 2},
                {"type": "int", "value": 3},
            ]},
        ]})
    );
}

#[test]
fn inline_entry_types() {
    // Array items, struct fields, and table values must name their type.
    let cases = [
        ("Foo = [* [* int]]", "81820102", "Array"),
        ("Foo = {* int => [* int]}", "a1018102", "Array"),
        ("Foo = [a: int, b: #6.5(int)]", "8201c502", "TaggedData"),
        ("Foo = [* #6.5(int)]", "81c502", "TaggedData"),
        ("Foo = [a: int, b: {* int => int}]", "8201a10102", "Map"),
    ];
    for (cddl, hex, kind) in cases {
        let expected = DatumError::UnsupportedInMultiChoice { kind };
        let err = validate_cddl(cddl).unwrap_err();
        assert_eq!(err.root_cause(), &expected, "validate {}", cddl);
        let err = match_cddl_cbor_hex(cddl, hex).unwrap_err();
        assert_eq!(err.root_cause(), &expected, "match {}", cddl);
    }

    let hoisted = [
        ("Foo = [* Ints]\nInts = [* int]", "81820102"),
        ("Foo = {* int => Ints}\nInts = [* int]", "a1018102"),
        ("Foo = [a: int, b: Tagged]\nTagged = #6.5(int)", "8201c502"),
        ("Foo = [* Tagged]\nTagged = #6.5(int)", "81c502"),
        ("Foo = [a: int, b: Ints]\nInts = {* int => int}", "8201a10102"),
    ];
    for (cddl, hex) in hoisted {
        validate_cddl(cddl).unwrap();
        match_cddl_cbor_hex(cddl, hex).unwrap();
    }
}

#[test]
fn unsupported_choices() {
    let err = match_bytes("Foo = int / [* int]", cbor::ARRAY_123).unwrap_err();
    match err.root_cause() {
        DatumError::Aggregated { causes, .. } => {
            assert_eq!(causes[1], DatumError::UnsupportedInMultiChoice { kind: "Array" });
        }
        other => panic!("unexpected {:?}", other),
    }
    let err = match_bytes("Foo = 7", cbor::INT_7).unwrap_err();
    assert_eq!(err.root_cause(), &DatumError::UnsupportedType2 { kind: "UintValue" });
}

#[test]
fn rule_lookup() {
    let err = match_bytes("Foo = Bar", cbor::INT_7).unwrap_err();
    assert_eq!(
        err.root_cause(),
        &DatumError::RuleNotFound {
            name: "Bar".into(),
            in_rule: None
        }
    );
    let err = match_bytes("Foo = Bar\nBar = (a: int)", cbor::INT_7).unwrap_err();
    assert_eq!(err.root_cause(), &DatumError::NotATypeRule { name: "Bar".into() });
}

#[test]
fn deterministic() {
    let cddl = "Bar = A / B / C\nA = int\nB = bytes\nC = [* int]";
    let ok1 = match_bytes(cddl, cbor::ARRAY_123);
    let ok2 = match_bytes(cddl, cbor::ARRAY_123);
    assert_eq!(ok1, ok2);
    let err1 = match_bytes(cddl, cbor::NULL);
    let err2 = match_bytes(cddl, cbor::NULL);
    assert!(err1.is_err());
    assert_eq!(err1, err2);
}

#[test]
fn hex_input() {
    let datum = match_cddl_cbor_hex("Foo = int", "1864").unwrap();
    assert_eq!(datum.to_json(), json!({"type": "Foo", "value": {"type": "int", "value": 100}}));
    assert_eq!(
        match_cddl_cbor_hex("Foo = int", "zz"),
        Err(DatumError::NotAHexString)
    );
    assert_eq!(
        match_cddl_cbor_hex("Foo = int", "186"),
        Err(DatumError::NotAHexString)
    );
    // The hex is checked first, so bad CDDL is only reported for good hex.
    assert_eq!(
        match_cddl_cbor_hex("Foo = [", "zz"),
        Err(DatumError::NotAHexString)
    );
    assert!(matches!(
        match_cddl_cbor_hex("Foo = [", "07"),
        Err(DatumError::Parse(_))
    ));
}

#[test]
fn detect_schema() {
    let structs = parse_cddl("Payment = [amount: int, label: bytes]").unwrap();
    let lists = parse_cddl("Amounts = [* int]").unwrap();
    let tables = parse_cddl("Labels = {* int => bytes}").unwrap();
    let candidates = [("payment", &structs), ("amounts", &lists), ("labels", &tables)];

    let value = cddl_datum::decode_cbor(cbor::ARRAY_100_CAFE).unwrap();
    let found = detect(&candidates, &value);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "payment");
    assert_eq!(found[0].datum.type_name, "Payment");

    let value = cddl_datum::decode_cbor(cbor::ARRAY_123).unwrap();
    let found = detect(&candidates, &value);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "amounts");

    let value = cddl_datum::decode_cbor(cbor::NULL).unwrap();
    assert!(detect(&candidates, &value).is_empty());
}

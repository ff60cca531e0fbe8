use cddl_datum::{flatten_message, parse_cddl, validate_cddl, DatumError};

// It would be unfriendly to not support Send + Sync + Unpin.
// Error types should also support Error, Display, and Debug.
fn has_traits1<T: Sized + Send + Sync + Unpin>(_: &T) {}
fn has_traits2<T: std::error::Error + std::fmt::Display + std::fmt::Debug>(_: &T) {}

#[test]
fn parse_error_traits() {
    let bad_cddl = "!";
    let err = parse_cddl(bad_cddl).unwrap_err();

    has_traits1(&err);
    has_traits2(&err);

    assert_eq!(format!("{}", err), "Unparseable(!)");
    assert_eq!(
        format!("{:?}", err),
        r#"ParseError { kind: Unparseable, ctx: "!" }"#
    );
}

#[test]
fn datum_error_traits() {
    use std::error::Error;

    let err = validate_cddl("!").unwrap_err();

    has_traits1(&err);
    has_traits2(&err);

    assert_eq!(err.to_string(), "CDDL parsing error: Unparseable(!)");
    // The parse error is available as the source.
    assert_eq!(err.source().unwrap().to_string(), "Unparseable(!)");
}

#[test]
fn wrapped_source_chain() {
    use std::error::Error;

    let err = DatumError::NestedArraysUnsupported
        .wrap("When parsing ValueMemberKey \"b\":")
        .wrap("When parsing TypeRule \"Foo\":");
    let mut messages = vec![err.to_string()];
    let mut source = err.source();
    while let Some(e) = source {
        messages.push(e.to_string());
        source = e.source();
    }
    assert_eq!(
        messages,
        vec![
            "When parsing TypeRule \"Foo\":",
            "When parsing ValueMemberKey \"b\":",
            "Nested arrays are not supported. Wrap the inner array to a new type.",
        ]
    );
}

#[test]
fn flatten_nested_aggregates() {
    let inner = DatumError::choices_failed(vec![
        DatumError::NotATag { actual: "Null" },
        DatumError::NotAMap { actual: "Null" },
    ])
    .wrap("When parsing TypeRule \"Inner\":");
    let err = DatumError::choices_failed(vec![inner, DatumError::MissingRootRule]);
    let expected = concat!(
        "Failed to parse cbor with any of the 2 type choices\n",
        "  When parsing TypeRule \"Inner\":\n",
        "    Failed to parse cbor with any of the 2 type choices\n",
        "      CDDL expects TaggedData, but CBOR is not a Tag, but Null\n",
        "      CDDL expects Map, but CBOR is not a Map, but Null\n",
        "  Could not find root rule, there is no TypeRule in CDDL",
    );
    assert_eq!(flatten_message(&err), expected);
}

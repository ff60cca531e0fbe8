use cddl_datum::util::Structure;
use cddl_datum::{flatten_message, validate_cddl, DatumError};

#[test]
fn valid_documents() {
    let cddl = r#"
        ; A transaction and its parts.
        Transaction = [inputs: Inputs, outputs: Outputs, fee: int]
        Inputs = [* Input]
        Input = [txid: bytes, index: int]
        Outputs = [+ Output]
        Output = [address: bytes, amount: Amount]
        Amount = int / MultiAsset
        MultiAsset = {* bytes => Assets}
        Assets = {1* bytes => int}
        Metadata = #6.259(Labels)
        Labels = {* int => any}
    "#;
    validate_cddl(cddl).unwrap();
}

#[test]
fn undefined_reference() {
    let err = validate_cddl("Foo = [* Bar]").unwrap_err();
    assert_eq!(
        err,
        DatumError::RuleNotFound {
            name: "Bar".into(),
            in_rule: Some("Foo".into()),
        }
    );
    assert_eq!(err.to_string(), "Rule Foo refers to undefined type Bar.");

    // Every rule is checked, not just the ones reachable from the first.
    let err = validate_cddl("Foo = int\nUnused = [* Missing]").unwrap_err();
    assert_eq!(err.to_string(), "Rule Unused refers to undefined type Missing.");
}

#[test]
fn rule_kinds() {
    let err = validate_cddl("Foo = int\nBar = (a: int)").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Rule Bar is not a TypeRule. Only TypeRules are supported."
    );
    let err = validate_cddl("Foo<T> = [* T]").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Rule Foo has generic params, which are not supported."
    );
    let err = validate_cddl("Foo = Bar<int>\nBar = int").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Rule Foo refers to type Bar with generic args, which are not supported."
    );
}

#[test]
fn unsupported_type2() {
    let err = validate_cddl("Foo = \"text\"").unwrap_err();
    assert_eq!(err, DatumError::UnsupportedType2 { kind: "TextValue" });
    let err = validate_cddl("Foo = ~Bar\nBar = [* int]").unwrap_err();
    assert_eq!(err, DatumError::UnsupportedType2 { kind: "Unwrap" });
    let err = validate_cddl("Foo = int / #6.1(int)").unwrap_err();
    assert_eq!(
        err.to_string(),
        "CDDL Type2 TaggedData nested in multi-choice is not supported. Wrap it in a separate type."
    );
}

#[test]
fn group_entries() {
    let err = validate_cddl("Foo = [* (a: int)]").unwrap_err();
    assert_eq!(
        err,
        DatumError::OnlyValueMemberKeySupported {
            kind: "InlineGroup",
            rule: "Foo".into(),
        }
    );
    let err = validate_cddl("Foo = [int // bytes]").unwrap_err();
    assert_eq!(err, DatumError::OnlyOneGroupChoiceSupported { count: 2 });
    let err = validate_cddl("Foo = {* int => bytes, * bytes => int}").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Rule Foo has table with 2 group entries. Only 1 is supported."
    );
    assert!(matches!(
        err,
        DatumError::OnlyOneRepeatedEntrySupported {
            structure: Structure::Table,
            ..
        }
    ));
}

#[test]
fn struct_fields() {
    let err = validate_cddl("Foo = [a: int, \"b\": bytes]").unwrap_err();
    let expected = concat!(
        "Rule Foo has invalid ValueMemberKey on index 1, while Array has 2 items\n",
        "  Unsupported member key: Value, only Type1 is supported",
    );
    assert_eq!(flatten_message(&err), expected);

    let err = validate_cddl("Foo = [a: int, b: [bytes]]").unwrap_err();
    let expected = concat!(
        "Rule Foo has invalid ValueMemberKey \"b\":\n",
        "  Nested arrays are not supported. Wrap the inner array to a new type.",
    );
    assert_eq!(flatten_message(&err), expected);
}

#[test]
fn table_keys() {
    let err = validate_cddl("Foo = {* int ^ => bytes}").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Rule Foo contains table with cut, which is not supported."
    );
    let err = validate_cddl("Foo = {* a: bytes}").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Rule Foo contains table with member key Bareword. Only Type1 is supported."
    );
    let err = validate_cddl("Foo = {* Missing => bytes}").unwrap_err();
    assert_eq!(err.to_string(), "Rule Foo refers to undefined type Missing.");
}

#[test]
fn sockets() {
    let err = validate_cddl("Foo = [* $$bar]").unwrap_err();
    assert_eq!(
        err,
        DatumError::SocketPlugUnsupported {
            rule: "Foo".into(),
            name: "$$bar".into(),
        }
    );
}

//! This module defines error and result types.
//!
//! Every failure raised while matching or validating is a [`DatumError`].
//! Most variants are leaf failures carrying just enough context to build a
//! message. Two variants are composite: [`DatumError::Wrapped`] adds one
//! step of context on top of a cause, and [`DatumError::Aggregated`] collects
//! independent failures (one per type choice that was tried).
//!
//! [`flatten_message`] renders a whole chain as an indented, multi-line
//! string suitable for showing to a schema author.

use crate::parser::ParseError;
use std::error;
use std::fmt;
use std::result::Result;
use strum_macros::Display;

/// Indentation added for each level of nesting by [`flatten_message`].
const INDENT: usize = 2;

/// The shape of a repeated structure whose size is constrained by an occurrence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
pub enum Structure {
    /// A CBOR array matched against `[* entry]`.
    #[strum(serialize = "array")]
    Array,
    /// A CBOR map matched against `{* key => value}`.
    #[strum(serialize = "table")]
    Table,
}

impl Structure {
    /// The name of the quantity being counted.
    pub fn metric(self) -> &'static str {
        match self {
            Structure::Array => "length",
            Structure::Table => "size",
        }
    }
}

/// Which occurrence bound was violated.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OccurrenceBound {
    /// Fewer items than the `n*` lower bound.
    Lower(usize),
    /// More items than the `*m` upper bound.
    Upper(usize),
    /// Zero items where `+` requires at least one.
    OneOrMore,
    /// More than one item where `?` allows at most one.
    Optional,
}

impl fmt::Display for OccurrenceBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OccurrenceBound::Lower(n) => write!(f, "less than lower bound {}", n),
            OccurrenceBound::Upper(n) => write!(f, "more than upper bound {}", n),
            OccurrenceBound::OneOrMore => write!(f, "less than OneOrMore"),
            OccurrenceBound::Optional => write!(f, "more than Optional"),
        }
    }
}

/// All the ways decoding or schema validation can fail.
///
/// Variants that carry an optional `rule` are raised by both the matcher
/// (which leaves it empty) and the schema validator (which names the rule
/// being checked).
#[allow(missing_docs)]
#[non_exhaustive]
#[derive(Debug, PartialEq)]
pub enum DatumError {
    /// An error during CDDL parsing.
    Parse(ParseError),
    /// A schema tree that could not be loaded.
    AstError(String),
    /// Input that should be hex-encoded CBOR isn't.
    NotAHexString,
    /// Bytes that don't form exactly one CBOR data item.
    CborDecode(String),
    /// A value that can't be turned back into CBOR.
    CborEncode(String),

    MissingRootRule,
    RuleNotFound {
        name: String,
        in_rule: Option<String>,
    },
    NotATypeRule {
        name: String,
    },
    UnsupportedType2 {
        kind: &'static str,
    },
    UnsupportedInMultiChoice {
        kind: &'static str,
    },
    OnlyOneGroupChoiceSupported {
        count: usize,
    },
    UnsupportedMemberKey {
        kind: &'static str,
        rule: Option<String>,
    },
    MissingMemberKey,
    TableWithNoMemberKey {
        rule: Option<String>,
    },
    UnsupportedGroupEntry {
        kind: &'static str,
        rule: Option<String>,
    },
    OnlyValueMemberKeySupported {
        kind: &'static str,
        rule: String,
    },
    NotATag {
        actual: &'static str,
    },
    TagMismatch {
        expected: u64,
        actual: u64,
    },
    MultipleTaggedChoicesUnsupported {
        count: usize,
        rule: Option<String>,
    },
    NotAnArray {
        actual: &'static str,
    },
    ArrayLengthMismatch {
        expected: usize,
        actual: usize,
    },
    OnlyOneRepeatedEntrySupported {
        structure: Structure,
        count: usize,
        rule: Option<String>,
    },
    MissingOccurrence {
        structure: Structure,
    },
    OccurrenceViolation {
        structure: Structure,
        actual: usize,
        bound: OccurrenceBound,
    },
    NestedArraysUnsupported,
    NotANumber {
        actual: &'static str,
    },
    NotABuffer {
        actual: &'static str,
    },
    NotAMap {
        actual: &'static str,
    },
    StructWithUnnamedField {
        rule: String,
    },
    GroupRuleUnsupported {
        name: String,
    },
    GenericParamsUnsupported {
        name: String,
    },
    GenericArgsUnsupported {
        rule: String,
        name: String,
    },
    CutUnsupported {
        name: String,
    },
    SocketPlugUnsupported {
        rule: String,
        name: String,
    },
    /// Rule references nested deeper than [`MatchOptions::max_depth`].
    ///
    /// [`MatchOptions::max_depth`]: crate::context::MatchOptions::max_depth
    RecursionLimit {
        depth: u32,
    },

    /// One step of context on top of an inner failure.
    Wrapped {
        context: String,
        cause: Box<DatumError>,
    },
    /// Several independent failures, e.g. one per type choice.
    Aggregated {
        context: String,
        causes: Vec<DatumError>,
    },
}

impl DatumError {
    /// Add a line of context on top of this error.
    pub fn wrap<C: Into<String>>(self, context: C) -> DatumError {
        DatumError::Wrapped {
            context: context.into(),
            cause: Box::new(self),
        }
    }

    /// The failure of the single alternative of a type.
    pub fn only_choice_failed(kind: &str, cause: DatumError) -> DatumError {
        cause.wrap(format!("When parsing its only type choice {}:", kind))
    }

    /// Every alternative of a type failed; `causes` are in declared order.
    pub fn choices_failed(causes: Vec<DatumError>) -> DatumError {
        DatumError::Aggregated {
            context: format!(
                "Failed to parse cbor with any of the {} type choices",
                causes.len()
            ),
            causes,
        }
    }

    /// Follow `Wrapped` links down to the error that started the chain.
    ///
    /// An `Aggregated` error is its own root cause.
    pub fn root_cause(&self) -> &DatumError {
        let mut err = self;
        while let DatumError::Wrapped { cause, .. } = err {
            err = cause;
        }
        err
    }

    /// Returns true if trying another type choice can't help.
    pub(crate) fn is_fatal(&self) -> bool {
        matches!(self.root_cause(), DatumError::RecursionLimit { .. })
    }
}

impl fmt::Display for DatumError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use DatumError::*;
        match self {
            Parse(p) => write!(f, "CDDL parsing error: {}", p),
            AstError(msg) => write!(f, "Malformed CDDL AST: {}", msg),
            NotAHexString => write!(f, "CBOR is not a hex string"),
            CborDecode(msg) => write!(f, "CBOR decoding failed: {}", msg),
            CborEncode(msg) => write!(f, "CBOR encoding failed: {}", msg),
            MissingRootRule => write!(
                f,
                "Could not find root rule, there is no TypeRule in CDDL"
            ),
            RuleNotFound {
                name,
                in_rule: Some(rule),
            } => write!(f, "Rule {} refers to undefined type {}.", rule, name),
            RuleNotFound {
                name,
                in_rule: None,
            } => write!(f, "Rule not found: {}", name),
            NotATypeRule { name } => write!(
                f,
                "Typename {} refers to rule, which is not a TypeRule",
                name
            ),
            UnsupportedType2 { kind } => write!(f, "CDDL Type2 not supported: {}", kind),
            UnsupportedInMultiChoice { kind } => write!(
                f,
                "CDDL Type2 {} nested in multi-choice is not supported. Wrap it in a separate type.",
                kind
            ),
            OnlyOneGroupChoiceSupported { count } => write!(
                f,
                "CDDL contains {} group choices. Only 1 group choice is supported",
                count
            ),
            UnsupportedMemberKey {
                kind,
                rule: Some(rule),
            } => write!(
                f,
                "Rule {} contains table with member key {}. Only Type1 is supported.",
                rule, kind
            ),
            UnsupportedMemberKey { kind, rule: None } => write!(
                f,
                "Unsupported member key: {}, only Type1 is supported",
                kind
            ),
            MissingMemberKey => write!(f, "Missing memberKey"),
            TableWithNoMemberKey { rule: Some(rule) } => {
                write!(f, "Rule {} contains table with no member key.", rule)
            }
            TableWithNoMemberKey { rule: None } => write!(f, "CDDL table with no member key"),
            UnsupportedGroupEntry {
                kind,
                rule: Some(rule),
            } => write!(f, "Rule {} has unsupported groupEntry: {}", rule, kind),
            UnsupportedGroupEntry { kind, rule: None } => {
                write!(f, "Unsupported groupEntry: {}", kind)
            }
            OnlyValueMemberKeySupported { kind, rule } => write!(
                f,
                "Rule {} has unsupported groupEntry {}. Only ValueMemberKey is supported.",
                rule, kind
            ),
            NotATag { actual } => write!(
                f,
                "CDDL expects TaggedData, but CBOR is not a Tag, but {}",
                actual
            ),
            TagMismatch { expected, actual } => write!(
                f,
                "CDDL expects TaggedData with tag = {}, but CBOR is Tag with tag = {}",
                expected, actual
            ),
            MultipleTaggedChoicesUnsupported {
                count,
                rule: Some(rule),
            } => write!(
                f,
                "Rule {} has TaggedData with {} type choices, which are not supported.",
                rule, count
            ),
            MultipleTaggedChoicesUnsupported { count, rule: None } => write!(
                f,
                "CDDL TaggedData with {} type choices not supported",
                count
            ),
            NotAnArray { actual } => write!(f, "CDDL expects Array, but cbor is {}", actual),
            ArrayLengthMismatch { expected, actual } => write!(
                f,
                "CDDL expects Array with length {}, but cbor is an array with length {}",
                expected, actual
            ),
            OnlyOneRepeatedEntrySupported {
                structure,
                count,
                rule: Some(rule),
            } => write!(
                f,
                "Rule {} has {} with {} group entries. Only 1 is supported.",
                rule, structure, count
            ),
            OnlyOneRepeatedEntrySupported {
                structure,
                count,
                rule: None,
            } => write!(
                f,
                "CDDL {} has {} group entries, only 1 is supported",
                structure, count
            ),
            MissingOccurrence { structure } => {
                write!(f, "CDDL {} contains no occurrence symbol", structure)
            }
            OccurrenceViolation {
                structure,
                actual,
                bound,
            } => write!(
                f,
                "{} {} {} is {} defined by Occurrence",
                structure,
                structure.metric(),
                actual,
                bound
            ),
            NestedArraysUnsupported => write!(
                f,
                "Nested arrays are not supported. Wrap the inner array to a new type."
            ),
            NotANumber { actual } => {
                write!(f, "CDDL expects number, but cbor is {}", actual)
            }
            NotABuffer { actual } => write!(f, "CDDL expects Buffer, but cbor is {}", actual),
            NotAMap { actual } => write!(
                f,
                "CDDL expects Map, but CBOR is not a Map, but {}",
                actual
            ),
            StructWithUnnamedField { rule } => {
                write!(f, "Rule {} has a struct with unnamed field.", rule)
            }
            GroupRuleUnsupported { name } => write!(
                f,
                "Rule {} is not a TypeRule. Only TypeRules are supported.",
                name
            ),
            GenericParamsUnsupported { name } => write!(
                f,
                "Rule {} has generic params, which are not supported.",
                name
            ),
            GenericArgsUnsupported { rule, name } => write!(
                f,
                "Rule {} refers to type {} with generic args, which are not supported.",
                rule, name
            ),
            CutUnsupported { name } => write!(
                f,
                "Rule {} contains table with cut, which is not supported.",
                name
            ),
            SocketPlugUnsupported { rule, name } => write!(
                f,
                "Rule {} refers to socket {}, which is not supported.",
                rule, name
            ),
            RecursionLimit { depth } => {
                write!(f, "Rule references nested deeper than {} levels", depth)
            }
            Wrapped { context, .. } => write!(f, "{}", context),
            Aggregated { context, .. } => write!(f, "{}", context),
        }
    }
}

impl error::Error for DatumError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            DatumError::Parse(p) => Some(p),
            DatumError::Wrapped { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl From<ParseError> for DatumError {
    fn from(err: ParseError) -> Self {
        DatumError::Parse(err)
    }
}

/// Render an error chain as an indented, multi-line message.
///
/// Each `Wrapped` level indents its cause by two spaces. Each member of an
/// `Aggregated` error is rendered (recursively) as its own block, indented
/// under the aggregate's message.
///
/// ```
/// use cddl_datum::{flatten_message, DatumError};
///
/// let err = DatumError::MissingMemberKey.wrap("When parsing ValueMemberKey \"a\":");
/// assert_eq!(
///     flatten_message(&err),
///     "When parsing ValueMemberKey \"a\":\n  Missing memberKey"
/// );
/// ```
pub fn flatten_message(err: &DatumError) -> String {
    let mut out = String::new();
    write_indented(err, 0, &mut out);
    out
}

fn write_indented(err: &DatumError, indent: usize, out: &mut String) {
    out.push_str(&" ".repeat(indent));
    out.push_str(&err.to_string());
    match err {
        DatumError::Aggregated { causes, .. } => {
            for cause in causes {
                out.push('\n');
                write_indented(cause, indent + INDENT, out);
            }
        }
        DatumError::Wrapped { cause, .. } => {
            out.push('\n');
            write_indented(cause, indent + INDENT, out);
        }
        _ => {}
    }
}

/// Attach context to the error side of a result.
pub trait WrapErr<T> {
    /// Wrap an error with the context returned by `f`; `f` only runs on failure.
    fn wrap_with<C, F>(self, f: F) -> DatumResult<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> WrapErr<T> for DatumResult<T> {
    fn wrap_with<C, F>(self, f: F) -> DatumResult<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.wrap(f()))
    }
}

/// A result carrying a [`DatumError`].
pub type DatumResult<T> = Result<T, DatumError>;

/// A check that doesn't return anything.
pub type ValidateResult = DatumResult<()>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_aggregate() {
        let err = DatumError::choices_failed(vec![
            DatumError::NotANumber { actual: "Bytes" }.wrap("When parsing TypeRule \"A\":"),
            DatumError::NotABuffer { actual: "Integer" },
        ])
        .wrap("When parsing TypeRule \"Bar\":");

        let expected = concat!(
            "When parsing TypeRule \"Bar\":\n",
            "  Failed to parse cbor with any of the 2 type choices\n",
            "    When parsing TypeRule \"A\":\n",
            "      CDDL expects number, but cbor is Bytes\n",
            "    CDDL expects Buffer, but cbor is Integer",
        );
        assert_eq!(flatten_message(&err), expected);
    }

    #[test]
    fn flatten_leaf() {
        let err = DatumError::TagMismatch {
            expected: 5,
            actual: 7,
        };
        assert_eq!(
            flatten_message(&err),
            "CDDL expects TaggedData with tag = 5, but CBOR is Tag with tag = 7"
        );
    }

    #[test]
    fn root_cause_and_source() {
        use std::error::Error;

        let err = DatumError::only_choice_failed("Typename", DatumError::NestedArraysUnsupported)
            .wrap("When parsing TypeRule \"Foo\":");
        assert_eq!(err.root_cause(), &DatumError::NestedArraysUnsupported);
        let source = err.source().unwrap();
        assert_eq!(
            source.to_string(),
            "When parsing its only type choice Typename:"
        );
        assert!(!err.is_fatal());
        assert!(DatumError::RecursionLimit { depth: 3 }.wrap("x").is_fatal());
    }

    #[test]
    fn occurrence_message() {
        let err = DatumError::OccurrenceViolation {
            structure: Structure::Table,
            actual: 3,
            bound: OccurrenceBound::Optional,
        };
        assert_eq!(
            err.to_string(),
            "table size 3 is more than Optional defined by Occurrence"
        );
    }
}

//! Errors produced while parsing CDDL text.

use std::borrow::Cow;
use thiserror::Error;

/// What went wrong while parsing.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An integer literal or occurrence bound that doesn't fit in 64 bits.
    MalformedInteger,
    /// A float literal that Rust can't read.
    MalformedFloat,
    /// A `h'...'` byte string with an odd number of digits or a bad digit.
    MalformedHex,
    /// A text literal with a bad escape sequence.
    MalformedText,
    /// A `b64'...'` byte string that isn't valid base64.
    MalformedBase64,
    /// The text doesn't follow the CDDL grammar at this point.
    Unparseable,
}

/// A CDDL parse failure, with the text where it happened.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind:?}({ctx})")]
pub struct ParseError {
    #[allow(missing_docs)]
    pub kind: ErrorKind,
    /// The remaining input at the failure, or the literal that was rejected.
    pub ctx: String,
}

// The error type threaded through nom. Most of these are discarded while
// the parser backtracks, so the context stays borrowed until the end.
#[derive(Debug, PartialEq)]
pub(crate) struct CowParseError<'a> {
    pub kind: ErrorKind,
    pub ctx: Cow<'a, str>,
}

impl<'a> CowParseError<'a> {
    fn new<S: Into<Cow<'a, str>>>(kind: ErrorKind, ctx: S) -> Self {
        CowParseError {
            kind,
            ctx: ctx.into(),
        }
    }
}

/// A literal was recognized but its contents are invalid; don't backtrack.
pub(crate) fn malformed(kind: ErrorKind, ctx: &str) -> nom::Err<CowParseError<'_>> {
    nom::Err::Failure(CowParseError::new(kind, ctx))
}

impl From<CowParseError<'_>> for ParseError {
    fn from(err: CowParseError<'_>) -> Self {
        ParseError {
            kind: err.kind,
            ctx: err.ctx.into_owned(),
        }
    }
}

impl From<nom::Err<CowParseError<'_>>> for ParseError {
    fn from(e: nom::Err<CowParseError<'_>>) -> ParseError {
        match e {
            nom::Err::Error(inner) | nom::Err::Failure(inner) => inner.into(),
            nom::Err::Incomplete(_) => ParseError {
                kind: ErrorKind::Unparseable,
                ctx: "Incomplete".into(),
            },
        }
    }
}

impl<'a, I: Into<Cow<'a, str>>> nom::error::ParseError<I> for CowParseError<'a> {
    fn from_error_kind(input: I, _kind: nom::error::ErrorKind) -> Self {
        CowParseError::new(ErrorKind::Unparseable, input)
    }

    // The deepest failure points closest to the bad text.
    fn append(_input: I, _kind: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

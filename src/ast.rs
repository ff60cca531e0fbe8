//! This module defines the Abstract Syntax Tree.
//!
//! It contains a tree representation of CDDL rules, closely matching the
//! syntax used in the original CDDL text. The field and variant names
//! follow the JSON tree emitted by the reference CDDL toolchain, so a tree
//! produced elsewhere can be loaded with [`Schema::from_json`] and matched
//! without ever parsing CDDL text in this crate.
//!
//! Every union is an externally tagged enum: `{"Typename": {...}}`.
//! Source spans and comments are not represented; they are ignored when
//! deserializing.
//!

use crate::util::{DatumError, DatumResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::IntoStaticStr;

/// A complete CDDL document.
///
/// CDDL ABNF grammar:
/// ```text
/// cddl = S 1*(rule S)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// All rules, in document order.
    pub rules: Vec<Rule>,
}

impl Schema {
    /// Load a schema tree from its JSON form.
    #[cfg(feature = "serde_json")]
    pub fn from_json(json: &str) -> DatumResult<Schema> {
        serde_json::from_str(json).map_err(|e| DatumError::AstError(e.to_string()))
    }

    /// Load a schema tree from an already-parsed JSON value.
    #[cfg(feature = "serde_json")]
    pub fn from_json_value(json: serde_json::Value) -> DatumResult<Schema> {
        serde_json::from_value(json).map_err(|e| DatumError::AstError(e.to_string()))
    }

    /// The first type rule in document order, which is the entry point for matching.
    pub fn root_rule(&self) -> Option<&TypeRule> {
        self.rules.iter().find_map(Rule::as_type_rule)
    }
}

/// A single named definition.
///
/// CDDL ABNF grammar:
/// ```text
/// rule = typename [genericparm] S assignt S type
///      / groupname [genericparm] S assigng S grpent
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Rule {
    Type { rule: TypeRule },
    Group { rule: Box<GroupRule> },
}

impl Rule {
    /// The name this rule defines.
    pub fn name(&self) -> &str {
        match self {
            Rule::Type { rule } => &rule.name.ident,
            Rule::Group { rule } => &rule.name.ident,
        }
    }

    /// Returns the type rule, or `None` for a group rule.
    pub fn as_type_rule(&self) -> Option<&TypeRule> {
        match self {
            Rule::Type { rule } => Some(rule),
            Rule::Group { .. } => None,
        }
    }

    /// Generic parameters declared on this rule, if any.
    pub fn generic_params(&self) -> Option<&GenericParams> {
        match self {
            Rule::Type { rule } => rule.generic_params.as_ref(),
            Rule::Group { rule } => rule.generic_params.as_ref(),
        }
    }
}

/// A rule defining a type, e.g. `foo = int / bytes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct TypeRule {
    pub name: Identifier,
    #[serde(default)]
    pub generic_params: Option<GenericParams>,
    /// `true` if the rule was written with `/=`.
    #[serde(default)]
    pub is_type_choice_alternate: bool,
    pub value: Type,
}

/// A rule defining a group, e.g. `foo = (a: int)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct GroupRule {
    pub name: Identifier,
    #[serde(default)]
    pub generic_params: Option<GenericParams>,
    /// `true` if the rule was written with `//=`.
    #[serde(default, alias = "is_type_choice_alternate")]
    pub is_group_choice_alternate: bool,
    pub entry: GroupEntry,
}

/// Socket prefixes, `$` for types and `$$` for groups.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum SocketPlug {
    #[serde(rename = "TYPE")]
    Type,
    #[serde(rename = "GROUP")]
    Group,
}

/// A name, as it appears in a rule definition or reference.
///
/// A socket name like `$foo` is stored as `foo` with `socket` set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    /// The name, without any socket prefix.
    pub ident: String,
    /// The socket prefix, if any.
    #[serde(default)]
    pub socket: Option<SocketPlug>,
}

impl Identifier {
    /// Create a plain (non-socket) identifier.
    pub fn new<S: Into<String>>(ident: S) -> Identifier {
        Identifier {
            ident: ident.into(),
            socket: None,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.socket {
            Some(SocketPlug::Type) => write!(f, "${}", self.ident),
            Some(SocketPlug::Group) => write!(f, "$${}", self.ident),
            None => write!(f, "{}", self.ident),
        }
    }
}

/// Generic parameters, e.g. `<K, V>` in `message<K, V> = ...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct GenericParams {
    pub params: Vec<GenericParam>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct GenericParam {
    pub param: Identifier,
}

/// Generic arguments, e.g. `<tstr, int>` in `message<tstr, int>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct GenericArgs {
    pub args: Vec<GenericArg>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct GenericArg {
    pub arg: Box<Type1>,
}

/// A type, made of one or more choices.
///
/// CDDL ABNF grammar:
/// ```text
/// type = type1 *(S "/" S  type1)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Type {
    /// The alternatives, in declared order.
    pub type_choices: Vec<TypeChoice>,
}

impl Type {
    /// Returns the type2 of the only alternative, if there is exactly one.
    pub fn single_choice(&self) -> Option<&Type2> {
        match self.type_choices.as_slice() {
            [choice] => Some(&choice.type1.type2),
            _ => None,
        }
    }
}

/// One alternative of a [`Type`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct TypeChoice {
    pub type1: Type1,
}

/// A type with an optional range or control operator.
///
/// CDDL ABNF grammar:
/// ```text
/// type1 = type2 [S (rangeop / ctlop) S type2]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Type1 {
    pub type2: Type2,
    #[serde(default)]
    pub operator: Option<Operator>,
}

/// The right-hand part of a range or control expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Operator {
    pub operator: RangeCtlOp,
    pub type2: Type2,
}

/// A range (`..` or `...`) or a control operator (`.size`, `.cbor`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeCtlOp {
    /// `...` is exclusive, `..` is inclusive.
    RangeOp {
        #[allow(missing_docs)]
        is_inclusive: bool,
    },
    /// A control operator, stored without its leading dot.
    CtlOp {
        #[allow(missing_docs)]
        #[serde(default)]
        ctrl: String,
    },
}

/// Type2 is the main representation of a CDDL type.
///
/// CDDL ABNF grammar:
/// ```text
/// type2 = value
///       / typename [genericarg]
///       / "(" S type S ")"
///       / "{" S group S "}"
///       / "[" S group S "]"
///       / "~" S typename [genericarg]
///       / "&" S "(" S group S ")"
///       / "&" S groupname [genericarg]
///       / "#" "6" ["." uint] "(" S type S ")"
///       / "#" DIGIT ["." uint]                ; major/ai
///       / "#"                                 ; any
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr)]
#[allow(missing_docs)]
pub enum Type2 {
    IntValue {
        value: i64,
    },
    UintValue {
        value: u64,
    },
    FloatValue {
        value: f64,
    },
    TextValue {
        value: String,
    },
    #[serde(rename = "UTF8ByteString")]
    #[strum(serialize = "UTF8ByteString")]
    Utf8ByteString {
        value: Vec<u8>,
    },
    /// Holds the decoded bytes of an `h'..'` literal.
    B16ByteString {
        value: Vec<u8>,
    },
    /// Holds the decoded bytes of a `b64'..'` literal.
    B64ByteString {
        value: Vec<u8>,
    },
    Typename {
        ident: Identifier,
        #[serde(default)]
        generic_args: Option<GenericArgs>,
    },
    ParenthesizedType {
        pt: Type,
    },
    Map {
        group: Group,
    },
    Array {
        group: Group,
    },
    Unwrap {
        ident: Identifier,
        #[serde(default)]
        generic_args: Option<GenericArgs>,
    },
    ChoiceFromInlineGroup {
        group: Group,
    },
    ChoiceFromGroup {
        ident: Identifier,
        #[serde(default)]
        generic_args: Option<GenericArgs>,
    },
    TaggedData {
        #[serde(default)]
        tag: Option<u64>,
        t: Type,
    },
    DataMajorType {
        mt: u8,
        #[serde(default)]
        constraint: Option<u64>,
    },
    Any {},
    And {},
}

impl Type2 {
    /// The variant tag, e.g. `"TaggedData"`.
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// The error for a node that may not appear as one of several alternatives.
    ///
    /// Arrays, maps and tags get a hint to move them into their own rule.
    pub fn unsupported_in_choice(&self) -> DatumError {
        match self {
            Type2::TaggedData { .. } | Type2::Array { .. } | Type2::Map { .. } => {
                DatumError::UnsupportedInMultiChoice { kind: self.kind() }
            }
            _ => DatumError::UnsupportedType2 { kind: self.kind() },
        }
    }
}

/// A group contains a number of elements.
///
/// CDDL ABNF grammar:
/// ```text
/// group = grpchoice *(S "//" S grpchoice)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// The group choices; only one is supported by this crate.
    pub group_choices: Vec<GroupChoice>,
}

impl Group {
    /// Returns the entries of the group's only choice.
    ///
    /// Fails if the group has zero or several choices.
    pub fn single_choice(&self) -> DatumResult<Vec<&GroupEntry>> {
        match self.group_choices.as_slice() {
            [choice] => Ok(choice.entries().collect()),
            choices => Err(DatumError::OnlyOneGroupChoiceSupported {
                count: choices.len(),
            }),
        }
    }
}

/// One choice of a [`Group`].
///
/// CDDL ABNF grammar:
/// ```text
/// grpchoice = *(grpent optcom)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupChoice {
    /// Group entries, each paired with its trailing comma (if any).
    pub group_entries: Vec<(GroupEntry, OptionalComma)>,
}

impl GroupChoice {
    /// Iterate over the entries, dropping the commas.
    pub fn entries(&self) -> impl Iterator<Item = &GroupEntry> {
        self.group_entries.iter().map(|(entry, _)| entry)
    }
}

/// Whether a group entry was followed by a comma.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct OptionalComma {
    pub optional_comma: bool,
}

/// A group entry contains one element of a group.
///
/// CDDL ABNF grammar:
/// ```text
/// grpent = [occur S] [memberkey S] type
///        / [occur S] groupname [genericarg]  ; preempted by above
///        / [occur S] "(" S group S ")"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr)]
#[allow(missing_docs)]
pub enum GroupEntry {
    ValueMemberKey {
        ge: Box<ValueMemberKeyEntry>,
    },
    TypeGroupname {
        ge: TypeGroupnameEntry,
    },
    InlineGroup {
        #[serde(default)]
        occur: Option<Occurrence>,
        group: Group,
    },
}

impl GroupEntry {
    /// The occurrence indicator attached to this entry, if any.
    pub fn occurrence(&self) -> Option<&Occurrence> {
        match self {
            GroupEntry::ValueMemberKey { ge } => ge.occur.as_ref(),
            GroupEntry::TypeGroupname { ge } => ge.occur.as_ref(),
            GroupEntry::InlineGroup { occur, .. } => occur.as_ref(),
        }
    }

    /// The variant tag, e.g. `"ValueMemberKey"`.
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// Returns the entry if it is a `ValueMemberKey`.
    pub fn as_value_member_key(&self) -> Option<&ValueMemberKeyEntry> {
        match self {
            GroupEntry::ValueMemberKey { ge } => Some(ge),
            _ => None,
        }
    }
}

/// A typed group entry, optionally with a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ValueMemberKeyEntry {
    #[serde(default)]
    pub occur: Option<Occurrence>,
    #[serde(default)]
    pub member_key: Option<MemberKey>,
    pub entry_type: Type,
}

/// A reference to a group by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct TypeGroupnameEntry {
    #[serde(default)]
    pub occur: Option<Occurrence>,
    pub name: Identifier,
    #[serde(default)]
    pub generic_args: Option<GenericArgs>,
}

/// The "key" part of a key-value group member.
///
/// CDDL ABNF grammar:
/// ```text
/// memberkey = type1 S ["^" S] "=>"
///           / bareword S ":"
///           / value S ":"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr)]
pub enum MemberKey {
    /// Any type specified with the `=>` separator.
    Type1 {
        #[allow(missing_docs)]
        t1: Box<Type1>,
        /// `true` if cut semantics (`^`) are specified.
        #[serde(default)]
        is_cut: bool,
    },
    /// A bare name followed by `:`.
    Bareword {
        #[allow(missing_docs)]
        ident: Identifier,
    },
    /// A literal value followed by `:`.
    Value {
        #[allow(missing_docs)]
        value: Literal,
    },
    /// Not a member key; present only in trees produced elsewhere.
    NonMemberKey {},
}

impl MemberKey {
    /// The variant tag, e.g. `"Bareword"`.
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// Returns the bareword name of a member key.
///
/// Fails with `MissingMemberKey` if there is no key, and with
/// `UnsupportedMemberKey` if the key isn't a bareword.
pub fn member_key_name(member_key: Option<&MemberKey>) -> DatumResult<&str> {
    match member_key {
        None => Err(DatumError::MissingMemberKey),
        Some(MemberKey::Bareword { ident }) => Ok(&ident.ident),
        Some(other) => Err(DatumError::UnsupportedMemberKey {
            kind: other.kind(),
            rule: None,
        }),
    }
}

/// A literal value, i.e. `"foo"`, `1.0`, or `h'FFF7'`
///
/// CDDL ABNF grammar:
/// ```text
/// value = number / text / bytes
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Literal {
    #[serde(rename = "TEXT")]
    Text(String),
    #[serde(rename = "INT")]
    Int(i64),
    #[serde(rename = "UINT")]
    Uint(u64),
    #[serde(rename = "FLOAT")]
    Float(f64),
    #[serde(rename = "BYTE")]
    Byte(ByteValue),
}

/// A byte-string literal, tagged with the syntax it was written in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ByteValue {
    #[serde(rename = "UTF8")]
    Utf8(Vec<u8>),
    B16(Vec<u8>),
    B64(Vec<u8>),
}

/// An "occurrence" which specifies how many elements can match a group member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Occurrence {
    pub occur: Occur,
}

/// The cardinality of an occurrence.
///
/// CDDL ABNF grammar:
/// ```text
/// occur = [uint] "*" [uint]
///       / "+"
///       / "?"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Occur {
    /// `n*m`, with both bounds inclusive.
    Exact {
        #[serde(default)]
        lower: Option<usize>,
        #[serde(default)]
        upper: Option<usize>,
    },
    ZeroOrMore {},
    OneOrMore {},
    Optional {},
}

/// Prelude types that have built-in meaning during matching.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PreludeType {
    /// `int`: an integer of any size.
    Int,
    /// `bytes`: a byte string.
    Bytes,
    /// `any`: anything at all.
    Any,
}

impl PreludeType {
    /// Returns the prelude type with this name, if there is one.
    pub fn from_name(name: &str) -> Option<PreludeType> {
        match name {
            "int" => Some(PreludeType::Int),
            "bytes" => Some(PreludeType::Bytes),
            "any" => Some(PreludeType::Any),
            _ => None,
        }
    }
}

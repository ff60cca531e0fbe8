//! This module contains a [nom](https://docs.rs/nom)-based CDDL parser.
//!
//! The only public entry point is [`parse_cddl`], which returns a [`Schema`].
//!
//! The grammar follows the ABNF in RFC 8610 Appendix B, for the subset of
//! CDDL the [`ast`](crate::ast) can represent. Each parser function is named
//! after the ABNF rule it implements.
//!

mod parse_err;

pub use parse_err::{ErrorKind, ParseError};
use parse_err::{malformed, CowParseError};

use crate::ast::*;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{anychar, char as charx, digit1, hex_digit1, multispace1, not_line_ending, one_of, satisfy},
    combinator::{all_consuming, eof, map, not, opt, peek, recognize, success, value},
    multi::{many0, many1, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
};
use std::collections::HashSet;
use std::convert::TryFrom;
use tracing::debug;

// A nom result carrying our own error type.
type JResult<'a, O> = nom::IResult<&'a str, O, CowParseError<'a>>;

// comment = ";" *PCHAR CRLF
fn comment(input: &str) -> JResult<&str> {
    recognize(pair(charx(';'), not_line_ending))(input)
}

// S = *WS, where comments count as whitespace.
fn ws(input: &str) -> JResult<&str> {
    recognize(many0(alt((multispace1, comment))))(input)
}

// optcom = S ["," S]
fn optcom(input: &str) -> JResult<OptionalComma> {
    map(preceded(ws, opt(charx(','))), |comma| OptionalComma {
        optional_comma: comma.is_some(),
    })(input)
}

// EALPHA = ALPHA / "@" / "_" / "$"
fn is_ealpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '@' || c == '_' || c == '$'
}

// id = EALPHA *(*("-" / ".") (EALPHA / DIGIT))
fn id(input: &str) -> JResult<&str> {
    recognize(pair(
        satisfy(is_ealpha),
        many0(pair(
            take_while(|c| c == '-' || c == '.'),
            satisfy(|c| is_ealpha(c) || c.is_ascii_digit()),
        )),
    ))(input)
}

fn identifier(input: &str) -> JResult<Identifier> {
    map(id, |name| {
        if let Some(group) = name.strip_prefix("$$").filter(|n| !n.is_empty()) {
            Identifier {
                ident: group.to_string(),
                socket: Some(SocketPlug::Group),
            }
        } else if let Some(ty) = name.strip_prefix('$').filter(|n| !n.is_empty()) {
            Identifier {
                ident: ty.to_string(),
                socket: Some(SocketPlug::Type),
            }
        } else {
            Identifier::new(name)
        }
    })(input)
}

// uint = DIGIT1 *DIGIT / "0x" 1*HEXDIG / "0b" 1*BINDIG / "0"
fn uint_digits(input: &str) -> JResult<(u32, &str)> {
    alt((
        map(preceded(tag("0x"), hex_digit1), |digits| (16, digits)),
        map(
            preceded(tag("0b"), take_while1(|c| c == '0' || c == '1')),
            |digits| (2, digits),
        ),
        map(digit1, |digits| (10, digits)),
    ))(input)
}

fn uint(input: &str) -> JResult<u64> {
    let (rest, (radix, digits)) = uint_digits(input)?;
    let n = u64::from_str_radix(digits, radix)
        .map_err(|_| malformed(ErrorKind::MalformedInteger, digits))?;
    Ok((rest, n))
}

fn uint_usize(input: &str) -> JResult<usize> {
    let (rest, n) = uint(input)?;
    let n = usize::try_from(n).map_err(|_| malformed(ErrorKind::MalformedInteger, input))?;
    Ok((rest, n))
}

// int = ["-"] uint
fn int(input: &str) -> JResult<Literal> {
    let (rest, minus) = opt(charx('-'))(input)?;
    let (rest, (radix, digits)) = uint_digits(rest)?;
    let magnitude = u64::from_str_radix(digits, radix)
        .map_err(|_| malformed(ErrorKind::MalformedInteger, digits))?;
    if minus.is_none() {
        return Ok((rest, Literal::Uint(magnitude)));
    }
    let n = i64::try_from(-i128::from(magnitude))
        .map_err(|_| malformed(ErrorKind::MalformedInteger, input))?;
    Ok((rest, Literal::Int(n)))
}

fn exponent(input: &str) -> JResult<&str> {
    recognize(tuple((one_of("eE"), opt(one_of("+-")), digit1)))(input)
}

// number = hexfloat / (int ["." fraction] ["e" exponent ])
//
// This only matches numbers that have a fraction or an exponent; plain
// integers are handled by `int`.
fn float(input: &str) -> JResult<Literal> {
    let (rest, text) = recognize(tuple((
        opt(charx('-')),
        digit1,
        alt((
            recognize(pair(pair(charx('.'), digit1), opt(exponent))),
            exponent,
        )),
    )))(input)?;
    let f = text
        .parse::<f64>()
        .map_err(|_| malformed(ErrorKind::MalformedFloat, text))?;
    Ok((rest, Literal::Float(f)))
}

// text = %x22 *SCHAR %x22
fn text(input: &str) -> JResult<String> {
    let (rest, raw) = delimited(
        charx('"'),
        recognize(many0(alt((
            take_while1(|c| c != '"' && c != '\\'),
            recognize(pair(charx('\\'), anychar)),
        )))),
        charx('"'),
    )(input)?;
    let unescaped =
        escape8259::unescape(raw).map_err(|_| malformed(ErrorKind::MalformedText, raw))?;
    Ok((rest, unescaped))
}

// The part of a byte string after the opening quote.
fn bytes_body(input: &str) -> JResult<&str> {
    terminated(take_while(|c| c != '\''), charx('\''))(input)
}

fn hex_bytes(input: &str) -> JResult<ByteValue> {
    let (rest, body) = preceded(tag("h'"), bytes_body)(input)?;
    let digits: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = hex::decode(digits).map_err(|_| malformed(ErrorKind::MalformedHex, body))?;
    Ok((rest, ByteValue::B16(bytes)))
}

fn base64_bytes(input: &str) -> JResult<ByteValue> {
    let (rest, body) = preceded(tag("b64'"), bytes_body)(input)?;
    let bytes = base64::decode_config(body, base64::URL_SAFE)
        .or_else(|_| base64::decode(body))
        .map_err(|_| malformed(ErrorKind::MalformedBase64, body))?;
    Ok((rest, ByteValue::B64(bytes)))
}

fn utf8_bytes(input: &str) -> JResult<ByteValue> {
    map(preceded(charx('\''), bytes_body), |body| {
        ByteValue::Utf8(body.as_bytes().to_vec())
    })(input)
}

// bytes = [bsqual] %x27 *BCHAR %x27
fn bytes(input: &str) -> JResult<ByteValue> {
    alt((hex_bytes, base64_bytes, utf8_bytes))(input)
}

// value = number / text / bytes
fn literal(input: &str) -> JResult<Literal> {
    alt((
        float,
        int,
        map(text, Literal::Text),
        map(bytes, Literal::Byte),
    ))(input)
}

impl From<Literal> for Type2 {
    fn from(literal: Literal) -> Type2 {
        match literal {
            Literal::Text(value) => Type2::TextValue { value },
            Literal::Int(value) => Type2::IntValue { value },
            Literal::Uint(value) => Type2::UintValue { value },
            Literal::Float(value) => Type2::FloatValue { value },
            Literal::Byte(ByteValue::Utf8(value)) => Type2::Utf8ByteString { value },
            Literal::Byte(ByteValue::B16(value)) => Type2::B16ByteString { value },
            Literal::Byte(ByteValue::B64(value)) => Type2::B64ByteString { value },
        }
    }
}

// genericparm = "<" S id S *("," S id S ) ">"
fn genericparm(input: &str) -> JResult<GenericParams> {
    let (rest, params) = delimited(
        pair(charx('<'), ws),
        separated_list1(delimited(ws, charx(','), ws), identifier),
        pair(ws, charx('>')),
    )(input)?;
    let params = params
        .into_iter()
        .map(|param| GenericParam { param })
        .collect();
    Ok((rest, GenericParams { params }))
}

// genericarg = "<" S type1 S *("," S type1 S ) ">"
fn genericarg(input: &str) -> JResult<GenericArgs> {
    let (rest, args) = delimited(
        pair(charx('<'), ws),
        separated_list1(delimited(ws, charx(','), ws), type1),
        pair(ws, charx('>')),
    )(input)?;
    let args = args
        .into_iter()
        .map(|arg| GenericArg { arg: Box::new(arg) })
        .collect();
    Ok((rest, GenericArgs { args }))
}

fn name_generic(input: &str) -> JResult<(Identifier, Option<GenericArgs>)> {
    pair(identifier, opt(genericarg))(input)
}

fn bracketed<'a, O, F>(open: char, inner: F, close: char) -> impl FnMut(&'a str) -> JResult<'a, O>
where
    F: FnMut(&'a str) -> JResult<'a, O>,
{
    delimited(pair(charx(open), ws), inner, pair(ws, charx(close)))
}

// "#" "6" ["." uint] "(" S type S ")"
// "#" DIGIT ["." uint]
// "#"
fn tagged(input: &str) -> JResult<Type2> {
    let (rest, _) = charx('#')(input)?;
    alt((
        map(
            tuple((
                charx('6'),
                opt(preceded(charx('.'), uint)),
                ws,
                bracketed('(', ty, ')'),
            )),
            |(_, tag, _, t)| Type2::TaggedData { tag, t },
        ),
        map(
            pair(one_of("01234567"), opt(preceded(charx('.'), uint))),
            |(major, constraint)| Type2::DataMajorType {
                mt: major as u8 - b'0',
                constraint,
            },
        ),
        success(Type2::Any {}),
    ))(rest)
}

// "&" S "(" S group S ")"
// "&" S groupname [genericarg]
fn choice_from_group(input: &str) -> JResult<Type2> {
    preceded(
        pair(charx('&'), ws),
        alt((
            map(bracketed('(', group, ')'), |group| {
                Type2::ChoiceFromInlineGroup { group }
            }),
            map(name_generic, |(ident, generic_args)| Type2::ChoiceFromGroup {
                ident,
                generic_args,
            }),
        )),
    )(input)
}

fn type2(input: &str) -> JResult<Type2> {
    alt((
        map(literal, Type2::from),
        map(name_generic, |(ident, generic_args)| Type2::Typename {
            ident,
            generic_args,
        }),
        map(bracketed('(', ty, ')'), |pt| Type2::ParenthesizedType { pt }),
        map(bracketed('{', group, '}'), |group| Type2::Map { group }),
        map(bracketed('[', group, ']'), |group| Type2::Array { group }),
        map(
            preceded(pair(charx('~'), ws), name_generic),
            |(ident, generic_args)| Type2::Unwrap {
                ident,
                generic_args,
            },
        ),
        choice_from_group,
        tagged,
    ))(input)
}

// rangeop = "..." / ".."
// ctlop = "." id
fn range_ctl_op(input: &str) -> JResult<RangeCtlOp> {
    alt((
        value(RangeCtlOp::RangeOp { is_inclusive: false }, tag("...")),
        value(RangeCtlOp::RangeOp { is_inclusive: true }, tag("..")),
        map(preceded(charx('.'), id), |ctrl| RangeCtlOp::CtlOp {
            ctrl: ctrl.to_string(),
        }),
    ))(input)
}

// type1 = type2 [S (rangeop / ctlop) S type2]
fn type1(input: &str) -> JResult<Type1> {
    let (rest, type2) = type2(input)?;
    let (rest, operator) = opt(map(
        tuple((ws, range_ctl_op, ws, self::type2)),
        |(_, operator, _, type2)| Operator { operator, type2 },
    ))(rest)?;
    Ok((rest, Type1 { type2, operator }))
}

// A single "/", not the start of "//" or "/=".
fn type_sep(input: &str) -> JResult<char> {
    delimited(ws, terminated(charx('/'), not(one_of("/="))), ws)(input)
}

// type = type1 *(S "/" S  type1)
fn ty(input: &str) -> JResult<Type> {
    map(separated_list1(type_sep, type1), |type1s| Type {
        type_choices: type1s.into_iter().map(|type1| TypeChoice { type1 }).collect(),
    })(input)
}

// occur = [uint] "*" [uint] / "+" / "?"
fn occur(input: &str) -> JResult<Occurrence> {
    let (rest, occur) = alt((
        map(
            tuple((opt(uint_usize), charx('*'), opt(uint_usize))),
            |(lower, _, upper)| match (lower, upper) {
                (None, None) => Occur::ZeroOrMore {},
                _ => Occur::Exact { lower, upper },
            },
        ),
        value(Occur::OneOrMore {}, charx('+')),
        value(Occur::Optional {}, charx('?')),
    ))(input)?;
    Ok((rest, Occurrence { occur }))
}

// memberkey = type1 S ["^" S] "=>"
//           / bareword S ":"
//           / value S ":"
//
// Only the last two forms are handled here; see `keyed_type`.
fn colon_key(input: &str) -> JResult<MemberKey> {
    alt((
        map(terminated(identifier, pair(ws, charx(':'))), |ident| {
            MemberKey::Bareword { ident }
        }),
        map(terminated(literal, pair(ws, charx(':'))), |value| {
            MemberKey::Value { value }
        }),
    ))(input)
}

// The `^ =>` after a type1 member key. Returns true if the cut is present.
fn arrow(input: &str) -> JResult<bool> {
    map(
        tuple((ws, opt(terminated(charx('^'), ws)), tag("=>"))),
        |(_, cut, _)| cut.is_some(),
    )(input)
}

// [memberkey S] type
//
// A leading type1 is parsed once, then becomes either the member key or
// the first type choice. Parsing it twice would make nested maps and
// arrays take exponential time.
fn keyed_type(input: &str) -> JResult<(Option<MemberKey>, Type)> {
    match terminated(colon_key, ws)(input) {
        Ok((rest, key)) => {
            let (rest, entry_type) = ty(rest)?;
            return Ok((rest, (Some(key), entry_type)));
        }
        Err(nom::Err::Error(_)) => {}
        Err(e) => return Err(e),
    }
    let (rest, first) = type1(input)?;
    if let (rest, Some(is_cut)) = opt(arrow)(rest)? {
        let (rest, entry_type) = preceded(ws, ty)(rest)?;
        let key = MemberKey::Type1 {
            t1: Box::new(first),
            is_cut,
        };
        return Ok((rest, (Some(key), entry_type)));
    }
    let (rest, more) = many0(preceded(type_sep, type1))(rest)?;
    let type_choices = std::iter::once(first)
        .chain(more)
        .map(|type1| TypeChoice { type1 })
        .collect();
    Ok((rest, (None, Type { type_choices })))
}

// grpent = [occur S] [memberkey S] type
//        / [occur S] groupname [genericarg]  ; preempted by above
//        / [occur S] "(" S group S ")"
//
// Bare group names are parsed as types here; see `resolve_group_names`.
fn grpent(input: &str) -> JResult<GroupEntry> {
    let (rest, occur) = opt(terminated(self::occur, ws))(input)?;
    match bracketed('(', group, ')')(rest) {
        Ok((rest, group)) => return Ok((rest, GroupEntry::InlineGroup { occur, group })),
        Err(nom::Err::Error(_)) => {}
        Err(e) => return Err(e),
    }
    let (rest, (member_key, entry_type)) = keyed_type(rest)?;
    let ge = ValueMemberKeyEntry {
        occur,
        member_key,
        entry_type,
    };
    Ok((rest, GroupEntry::ValueMemberKey { ge: Box::new(ge) }))
}

// grpchoice = *(grpent optcom)
fn grpchoice(input: &str) -> JResult<GroupChoice> {
    map(many0(pair(preceded(ws, grpent), optcom)), |group_entries| {
        GroupChoice { group_entries }
    })(input)
}

// group = grpchoice *(S "//" S grpchoice)
fn group(input: &str) -> JResult<Group> {
    map(
        separated_list1(delimited(ws, tag("//"), ws), grpchoice),
        |group_choices| Group { group_choices },
    )(input)
}

// The start of the next rule, or the end of input.
fn rule_end(input: &str) -> JResult<()> {
    preceded(
        ws,
        alt((
            value((), eof),
            value(
                (),
                tuple((
                    id,
                    opt(genericparm),
                    ws,
                    alt((tag("//="), tag("/="), tag("="))),
                )),
            ),
        )),
    )(input)
}

// typename [genericparm] S assignt S type
fn type_rule(input: &str) -> JResult<Rule> {
    let (rest, (name, generic_params, _, is_type_choice_alternate, _, value)) = tuple((
        identifier,
        opt(genericparm),
        ws,
        alt((value(true, tag("/=")), value(false, tag("=")))),
        ws,
        ty,
    ))(input)?;
    let (rest, _) = peek(rule_end)(rest)?;
    let rule = TypeRule {
        name,
        generic_params,
        is_type_choice_alternate,
        value,
    };
    Ok((rest, Rule::Type { rule }))
}

// groupname [genericparm] S assigng S grpent
fn group_rule(input: &str) -> JResult<Rule> {
    let (rest, (name, generic_params, _, is_group_choice_alternate, _, entry)) = tuple((
        identifier,
        opt(genericparm),
        ws,
        alt((value(true, tag("//=")), value(false, tag("=")))),
        ws,
        grpent,
    ))(input)?;
    let rule = GroupRule {
        name,
        generic_params,
        is_group_choice_alternate,
        entry,
    };
    Ok((rest, Rule::Group { rule: Box::new(rule) }))
}

fn rule(input: &str) -> JResult<Rule> {
    alt((type_rule, group_rule))(input)
}

/// Parse CDDL text into a [`Schema`].
///
/// ```
/// use cddl_datum::parse_cddl;
///
/// let schema = parse_cddl("Foo = [amount: int, label: bytes]").unwrap();
/// assert_eq!(schema.rules[0].name(), "Foo");
/// ```
pub fn parse_cddl(input: &str) -> Result<Schema, ParseError> {
    let (_, rules) = all_consuming(delimited(ws, many1(terminated(rule, ws)), ws))(input)?;
    let mut schema = Schema { rules };
    resolve_group_names(&mut schema);
    debug!(rules = schema.rules.len(), "parsed cddl");
    Ok(schema)
}

// A bare name inside a group is ambiguous: `[* foo]` repeats the type `foo`
// unless `foo` is a group rule, in which case it refers to that group.
fn resolve_group_names(schema: &mut Schema) {
    let groups: HashSet<String> = schema
        .rules
        .iter()
        .filter(|rule| rule.as_type_rule().is_none())
        .map(|rule| rule.name().to_string())
        .collect();
    if groups.is_empty() {
        return;
    }
    for rule in &mut schema.rules {
        match rule {
            Rule::Type { rule } => resolve_type(&mut rule.value, &groups),
            Rule::Group { rule } => resolve_entry(&mut rule.entry, &groups),
        }
    }
}

fn resolve_type(ty: &mut Type, groups: &HashSet<String>) {
    for choice in &mut ty.type_choices {
        resolve_type2(&mut choice.type1.type2, groups);
    }
}

fn resolve_type2(type2: &mut Type2, groups: &HashSet<String>) {
    match type2 {
        Type2::ParenthesizedType { pt } => resolve_type(pt, groups),
        Type2::TaggedData { t, .. } => resolve_type(t, groups),
        Type2::Map { group } | Type2::Array { group } | Type2::ChoiceFromInlineGroup { group } => {
            resolve_group(group, groups)
        }
        _ => {}
    }
}

fn resolve_group(group: &mut Group, groups: &HashSet<String>) {
    for choice in &mut group.group_choices {
        for (entry, _) in &mut choice.group_entries {
            resolve_entry(entry, groups);
        }
    }
}

fn resolve_entry(entry: &mut GroupEntry, groups: &HashSet<String>) {
    let replacement = match entry {
        GroupEntry::ValueMemberKey { ge } => match group_reference(ge, groups) {
            Some(replacement) => replacement,
            None => {
                resolve_type(&mut ge.entry_type, groups);
                return;
            }
        },
        GroupEntry::InlineGroup { group, .. } => {
            resolve_group(group, groups);
            return;
        }
        GroupEntry::TypeGroupname { .. } => return,
    };
    *entry = replacement;
}

fn group_reference(ge: &ValueMemberKeyEntry, groups: &HashSet<String>) -> Option<GroupEntry> {
    if ge.member_key.is_some() {
        return None;
    }
    match ge.entry_type.type_choices.as_slice() {
        [TypeChoice {
            type1:
                Type1 {
                    type2: Type2::Typename { ident, generic_args },
                    operator: None,
                },
        }] if groups.contains(&ident.ident) => Some(GroupEntry::TypeGroupname {
            ge: TypeGroupnameEntry {
                occur: ge.occur.clone(),
                name: ident.clone(),
                generic_args: generic_args.clone(),
            },
        }),
        _ => None,
    }
}

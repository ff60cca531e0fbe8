//! This module matches decoded data against a schema.
//!
//! Matching walks the schema starting from its first type rule, following
//! rule references by name, and builds a [`ReadableDatum`] that mirrors the
//! shape of the data. Any mismatch is returned as a [`DatumError`] chain
//! that names each rule, field, and choice on the way down.
//!
//! Only part of CDDL is understood here: type rules whose choices are
//! arrays, tables (maps with one repeated entry), tags, and references to
//! other rules or to the prelude types `int`, `bytes`, and `any`. A schema
//! can be checked for unsupported constructs ahead of time with
//! [`validate_schema`](crate::validate::validate_schema).

use crate::ast::*;
use crate::cbor::encode_cbor;
use crate::context::{BasicContext, LookupContext, MatchOptions};
use crate::datum::{DatumValue, NamedDatum, ReadableDatum};
use crate::util::{DatumError, DatumResult, OccurrenceBound, Structure, ValidateResult, WrapErr};
use crate::value::Value;
use tracing::{debug, trace};

/// Match a value against a schema, starting from its first type rule.
///
/// ```
/// use cddl_datum::{match_datum, parse_cddl, Value};
///
/// let schema = parse_cddl("Foo = [* int]").unwrap();
/// let value = Value::Array(vec![Value::Integer(1), Value::Integer(2)]);
/// let datum = match_datum(&schema, &value).unwrap();
/// assert_eq!(datum.type_name, "Foo");
/// ```
pub fn match_datum(schema: &Schema, value: &Value) -> DatumResult<ReadableDatum> {
    let ctx = BasicContext::new(schema);
    match_datum_with(&ctx, &MatchOptions::default(), value)
}

/// Match a value using a custom rule lookup and options.
pub fn match_datum_with(
    lookup: &dyn LookupContext,
    options: &MatchOptions,
    value: &Value,
) -> DatumResult<ReadableDatum> {
    let root = lookup.root_rule().ok_or(DatumError::MissingRootRule)?;
    debug!(
        root = %root.name,
        rules = lookup.rule_names().len(),
        kind = value.kind(),
        "matching value"
    );
    let matcher = Matcher {
        lookup,
        options,
        depth: 0,
    };
    matcher.type_rule(root, value)
}

/// A schema that matched in [`detect`].
#[derive(Debug, Clone, PartialEq)]
pub struct Detected {
    /// The name the schema was given by the caller.
    pub name: String,
    #[allow(missing_docs)]
    pub datum: ReadableDatum,
}

/// Try one value against several schemas, in order.
///
/// Returns every successful match; schemas that fail are skipped.
pub fn detect(candidates: &[(&str, &Schema)], value: &Value) -> Vec<Detected> {
    candidates
        .iter()
        .filter_map(|(name, schema)| match match_datum(schema, value) {
            Ok(datum) => Some(Detected {
                name: name.to_string(),
                datum,
            }),
            Err(e) => {
                trace!(schema = %name, error = %e.root_cause(), "schema did not match");
                None
            }
        })
        .collect()
}

// Matching state. A new one is derived for every rule reference.
#[derive(Clone, Copy)]
struct Matcher<'a> {
    lookup: &'a dyn LookupContext,
    options: &'a MatchOptions,
    depth: u32,
}

impl<'a> Matcher<'a> {
    // The matcher to use one rule reference further down.
    fn descend(&self) -> DatumResult<Matcher<'a>> {
        if self.depth >= self.options.max_depth {
            return Err(DatumError::RecursionLimit {
                depth: self.options.max_depth,
            });
        }
        Ok(Matcher {
            depth: self.depth + 1,
            ..*self
        })
    }

    fn type_rule(&self, rule: &TypeRule, value: &Value) -> DatumResult<ReadableDatum> {
        let name = &rule.name.ident;
        trace!(rule = %name, depth = self.depth, "matching type rule");
        let result = match rule.value.single_choice() {
            Some(type2) => self
                .single_choice(type2, value)
                .map(|v| ReadableDatum::new(name.as_str(), v)),
            // The matched choice carries its own type name.
            None => self.type_choices(&rule.value.type_choices, value),
        };
        result.wrap_with(|| format!("When parsing TypeRule \"{}\":", name))
    }

    fn typename(&self, name: &str, value: &Value) -> DatumResult<ReadableDatum> {
        if let Some(prelude) = PreludeType::from_name(name) {
            return Ok(ReadableDatum::new(name, prelude_value(prelude, value)?));
        }
        let inner = self.descend()?;
        let rule = self
            .lookup
            .lookup_rule(name)
            .ok_or_else(|| DatumError::RuleNotFound {
                name: name.to_string(),
                in_rule: None,
            })?;
        let rule = rule.as_type_rule().ok_or_else(|| DatumError::NotATypeRule {
            name: name.to_string(),
        })?;
        inner.type_rule(rule, value)
    }

    // A type2 that is the only choice of its type.
    fn single_choice(&self, type2: &Type2, value: &Value) -> DatumResult<DatumValue> {
        match type2 {
            Type2::Array { group } => {
                let entries = group.single_choice()?;
                match value {
                    Value::Array(items) => self.array(&entries, items),
                    other => Err(DatumError::NotAnArray {
                        actual: other.kind(),
                    }),
                }
            }
            Type2::TaggedData { tag, t } => {
                let (actual, inner) = match value {
                    Value::Tag(actual, inner) => (*actual, inner.as_ref()),
                    other => {
                        return Err(DatumError::NotATag {
                            actual: other.kind(),
                        })
                    }
                };
                if let Some(expected) = *tag {
                    if expected != actual {
                        return Err(DatumError::TagMismatch { expected, actual });
                    }
                }
                match t.single_choice() {
                    Some(inner_type) => self.single_choice(inner_type, inner),
                    None => Err(DatumError::MultipleTaggedChoicesUnsupported {
                        count: t.type_choices.len(),
                        rule: None,
                    }),
                }
            }
            Type2::Typename { ident, .. } => self.typename(&ident.ident, value).map(Into::into),
            Type2::Map { group } => {
                let entries = group.single_choice()?;
                match value {
                    Value::Map(pairs) => self.table(&entries, pairs),
                    other => Err(DatumError::NotAMap {
                        actual: other.kind(),
                    }),
                }
            }
            other => Err(DatumError::UnsupportedType2 { kind: other.kind() }),
        }
    }

    // A type2 that is one of several choices; only references are allowed.
    fn multi_choice(&self, type2: &Type2, value: &Value) -> DatumResult<ReadableDatum> {
        match type2 {
            Type2::Typename { ident, .. } => self.typename(&ident.ident, value),
            other => Err(other.unsupported_in_choice()),
        }
    }

    // Try each choice in order; the first match wins.
    fn type_choices(&self, choices: &[TypeChoice], value: &Value) -> DatumResult<ReadableDatum> {
        let mut errors = Vec::new();
        for choice in choices {
            match self.multi_choice(&choice.type1.type2, value) {
                Ok(datum) => return Ok(datum),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    trace!(kind = choice.type1.type2.kind(), "type choice failed");
                    errors.push(e);
                }
            }
        }
        match (choices, errors.len()) {
            ([only], 1) => {
                let cause = errors.remove(0);
                Err(DatumError::only_choice_failed(only.type1.type2.kind(), cause))
            }
            _ => Err(DatumError::choices_failed(errors)),
        }
    }

    fn array(&self, entries: &[&GroupEntry], items: &[Value]) -> DatumResult<DatumValue> {
        if entries.iter().any(|entry| entry.occurrence().is_some()) {
            return self.repeated_array(entries, items);
        }
        if entries.len() != items.len() {
            return Err(DatumError::ArrayLengthMismatch {
                expected: entries.len(),
                actual: items.len(),
            });
        }
        match (entries, items) {
            ([entry], [item]) => self.singleton(entry, item),
            _ => self.array_struct(entries, items),
        }
    }

    // `[* type]`: every item matches the same entry.
    fn repeated_array(&self, entries: &[&GroupEntry], items: &[Value]) -> DatumResult<DatumValue> {
        let entry = repeated_entry(entries, Structure::Array, items.len())?;
        let ge = value_member_key(entry)?;
        let matched = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                self.type_choices(&ge.entry_type.type_choices, item)
                    .map(DatumValue::from)
                    .wrap_with(|| format!("When parsing array item {}:", index))
            })
            .collect::<DatumResult<_>>()?;
        Ok(DatumValue::Sequence(matched))
    }

    // A one-element array is matched as its element.
    fn singleton(&self, entry: &GroupEntry, item: &Value) -> DatumResult<DatumValue> {
        let ge = value_member_key(entry)?;
        match ge.entry_type.single_choice() {
            Some(type2) => self.single_choice(type2, item),
            None => self
                .type_choices(&ge.entry_type.type_choices, item)
                .map(Into::into),
        }
    }

    // `[a: x, b: y]`: entries and items are paired by position.
    fn array_struct(&self, entries: &[&GroupEntry], items: &[Value]) -> DatumResult<DatumValue> {
        let count = entries.len();
        let fields = entries
            .iter()
            .zip(items)
            .enumerate()
            .map(|(index, (entry, item))| {
                let ge = value_member_key(entry)?;
                let name = member_key_name(ge.member_key.as_ref())
                    .map(str::trim)
                    .wrap_with(|| {
                        format!(
                            "Error parsing ValueMemberKey on index {}, while Array has {} items",
                            index, count
                        )
                    })?;
                self.struct_field(ge, item)
                    .map(|datum| datum.named(name))
                    .wrap_with(|| format!("When parsing ValueMemberKey \"{}\":", name))
            })
            .collect::<DatumResult<Vec<NamedDatum>>>()?;
        Ok(DatumValue::Struct(fields))
    }

    fn struct_field(&self, ge: &ValueMemberKeyEntry, item: &Value) -> DatumResult<ReadableDatum> {
        if let Some(Type2::Array { .. }) = ge.entry_type.single_choice() {
            return Err(DatumError::NestedArraysUnsupported);
        }
        self.type_choices(&ge.entry_type.type_choices, item)
    }

    // `{* key => value}`: produces `{type: "Table", value: [[key, value], ...]}`.
    fn table(&self, entries: &[&GroupEntry], pairs: &[(Value, Value)]) -> DatumResult<DatumValue> {
        let entry = repeated_entry(entries, Structure::Table, pairs.len())?;
        let ge = value_member_key(entry)?;
        let key_type = match &ge.member_key {
            Some(MemberKey::Type1 { t1, .. }) => &t1.type2,
            Some(other) => {
                return Err(DatumError::UnsupportedMemberKey {
                    kind: other.kind(),
                    rule: None,
                })
            }
            None => return Err(DatumError::TableWithNoMemberKey { rule: None }),
        };
        let rows = pairs
            .iter()
            .map(|(key, value)| {
                let key = self.single_choice(key_type, key)?;
                let value = self.type_choices(&ge.entry_type.type_choices, value)?;
                Ok(DatumValue::Sequence(vec![key, value.into()]))
            })
            .collect::<DatumResult<_>>()?;
        Ok(ReadableDatum::new("Table", DatumValue::Sequence(rows)).into())
    }
}

fn prelude_value(prelude: PreludeType, value: &Value) -> DatumResult<DatumValue> {
    match (prelude, value) {
        (PreludeType::Int, Value::Integer(i)) => Ok(DatumValue::from_integer(*i)),
        (PreludeType::Int, Value::Float(f)) => Ok(DatumValue::from_float(*f)),
        (PreludeType::Int, other) => Err(DatumError::NotANumber {
            actual: other.kind(),
        }),
        (PreludeType::Bytes, Value::Bytes(b)) => Ok(DatumValue::Text(hex::encode(b))),
        (PreludeType::Bytes, other) => Err(DatumError::NotABuffer {
            actual: other.kind(),
        }),
        (PreludeType::Any, any) => Ok(DatumValue::Text(hex::encode(encode_cbor(any)?))),
    }
}

fn value_member_key(entry: &GroupEntry) -> DatumResult<&ValueMemberKeyEntry> {
    entry
        .as_value_member_key()
        .ok_or(DatumError::UnsupportedGroupEntry {
            kind: entry.kind(),
            rule: None,
        })
}

// The single entry of a repeated array or table, with its occurrence checked.
fn repeated_entry<'e>(
    entries: &[&'e GroupEntry],
    structure: Structure,
    actual: usize,
) -> DatumResult<&'e GroupEntry> {
    let entry = match entries {
        [entry] => *entry,
        _ => {
            return Err(DatumError::OnlyOneRepeatedEntrySupported {
                structure,
                count: entries.len(),
                rule: None,
            })
        }
    };
    let occurrence = entry
        .occurrence()
        .ok_or(DatumError::MissingOccurrence { structure })?;
    check_occurrence(occurrence, structure, actual)?;
    Ok(entry)
}

fn check_occurrence(occurrence: &Occurrence, structure: Structure, actual: usize) -> ValidateResult {
    let violated = match &occurrence.occur {
        Occur::Exact {
            lower: Some(lower), ..
        } if actual < *lower => Some(OccurrenceBound::Lower(*lower)),
        Occur::Exact {
            upper: Some(upper), ..
        } if actual > *upper => Some(OccurrenceBound::Upper(*upper)),
        Occur::OneOrMore {} if actual < 1 => Some(OccurrenceBound::OneOrMore),
        Occur::Optional {} if actual > 1 => Some(OccurrenceBound::Optional),
        _ => None,
    };
    match violated {
        Some(bound) => Err(DatumError::OccurrenceViolation {
            structure,
            actual,
            bound,
        }),
        None => Ok(()),
    }
}

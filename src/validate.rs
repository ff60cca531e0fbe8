//! This module checks a schema for constructs the matcher can't handle.
//!
//! Validation walks every rule the same way the matcher would, but without
//! any data. A schema that passes will never fail matching because of its
//! own shape; only mismatches between the schema and a particular value
//! remain possible.
//!
//! Unlike the matcher, the validator also rejects group rules, generic
//! parameters and arguments, sockets, and table keys marked with a cut.

use crate::ast::*;
use crate::context::{BasicContext, LookupContext};
use crate::parser::parse_cddl;
use crate::util::{DatumError, DatumResult, Structure, ValidateResult, WrapErr};
use tracing::{debug, trace};

/// Check every rule in a schema.
///
/// ```
/// use cddl_datum::{parse_cddl, validate_schema};
///
/// let schema = parse_cddl("Foo = [* Bar]\nBar = int / bytes").unwrap();
/// validate_schema(&schema).unwrap();
///
/// let schema = parse_cddl("Foo = [* Baz]").unwrap();
/// assert!(validate_schema(&schema).is_err());
/// ```
pub fn validate_schema(schema: &Schema) -> ValidateResult {
    debug!(rules = schema.rules.len(), "validating schema");
    let ctx = BasicContext::new(schema);
    for rule in &schema.rules {
        let rule = match rule {
            Rule::Type { rule } => rule,
            Rule::Group { rule } => {
                return Err(DatumError::GroupRuleUnsupported {
                    name: rule.name.ident.clone(),
                })
            }
        };
        let checker = RuleChecker {
            lookup: &ctx,
            rule: &rule.name.ident,
        };
        checker.check_rule(rule)?;
    }
    Ok(())
}

/// Parse CDDL text, then check it with [`validate_schema`].
pub fn validate_cddl(cddl: &str) -> ValidateResult {
    let schema = parse_cddl(cddl)?;
    validate_schema(&schema)
}

// Checks one rule; every error names that rule.
struct RuleChecker<'a> {
    lookup: &'a dyn LookupContext,
    rule: &'a str,
}

impl RuleChecker<'_> {
    fn check_rule(&self, rule: &TypeRule) -> ValidateResult {
        trace!(rule = self.rule, "checking rule");
        if rule.generic_params.is_some() {
            return Err(DatumError::GenericParamsUnsupported {
                name: self.rule.to_string(),
            });
        }
        self.type_choices(&rule.value.type_choices)
    }

    fn typename(&self, ident: &Identifier, generic_args: &Option<GenericArgs>) -> ValidateResult {
        if generic_args.is_some() {
            return Err(DatumError::GenericArgsUnsupported {
                rule: self.rule.to_string(),
                name: ident.ident.clone(),
            });
        }
        if ident.socket.is_some() {
            return Err(DatumError::SocketPlugUnsupported {
                rule: self.rule.to_string(),
                name: ident.to_string(),
            });
        }
        let known = PreludeType::from_name(&ident.ident).is_some()
            || self.lookup.lookup_rule(&ident.ident).is_some();
        if !known {
            return Err(DatumError::RuleNotFound {
                name: ident.ident.clone(),
                in_rule: Some(self.rule.to_string()),
            });
        }
        Ok(())
    }

    // A rule body or a singleton array element: one choice is matched inline.
    fn type_choices(&self, choices: &[TypeChoice]) -> ValidateResult {
        match choices {
            [only] => self.single_choice(&only.type1.type2),
            _ => self.entry_type(choices),
        }
    }

    // Array items, struct fields, and table values are always matched as choices.
    fn entry_type(&self, choices: &[TypeChoice]) -> ValidateResult {
        choices
            .iter()
            .try_for_each(|choice| self.multi_choice(&choice.type1.type2))
    }

    fn multi_choice(&self, type2: &Type2) -> ValidateResult {
        match type2 {
            Type2::Typename {
                ident,
                generic_args,
            } => self.typename(ident, generic_args),
            other => Err(other.unsupported_in_choice()),
        }
    }

    fn single_choice(&self, type2: &Type2) -> ValidateResult {
        match type2 {
            Type2::Typename {
                ident,
                generic_args,
            } => self.typename(ident, generic_args),
            Type2::Array { group } => self.array(&group.single_choice()?),
            Type2::TaggedData { t, .. } => match t.single_choice() {
                Some(inner) => self.single_choice(inner),
                None => Err(DatumError::MultipleTaggedChoicesUnsupported {
                    count: t.type_choices.len(),
                    rule: Some(self.rule.to_string()),
                }),
            },
            Type2::Map { group } => self.table(&group.single_choice()?),
            other => Err(DatumError::UnsupportedType2 { kind: other.kind() }),
        }
    }

    fn array(&self, entries: &[&GroupEntry]) -> ValidateResult {
        if entries.iter().any(|entry| entry.occurrence().is_some()) {
            let entry = self.repeated_entry(entries, Structure::Array)?;
            let ge = self.value_member_key(entry)?;
            return self.entry_type(&ge.entry_type.type_choices);
        }
        match entries {
            [entry] => {
                let ge = entry
                    .as_value_member_key()
                    .ok_or_else(|| DatumError::UnsupportedGroupEntry {
                        kind: entry.kind(),
                        rule: Some(self.rule.to_string()),
                    })?;
                self.type_choices(&ge.entry_type.type_choices)
            }
            _ => entries
                .iter()
                .enumerate()
                .try_for_each(|(index, entry)| self.struct_field(index, entries.len(), entry)),
        }
    }

    fn struct_field(&self, index: usize, count: usize, entry: &GroupEntry) -> ValidateResult {
        let ge = self.value_member_key(entry)?;
        let name = member_key_name(ge.member_key.as_ref())
            .map(str::trim)
            .wrap_with(|| {
                format!(
                    "Rule {} has invalid ValueMemberKey on index {}, while Array has {} items",
                    self.rule, index, count
                )
            })?;
        if name.is_empty() {
            return Err(DatumError::StructWithUnnamedField {
                rule: self.rule.to_string(),
            });
        }
        let checked = match ge.entry_type.single_choice() {
            Some(Type2::Array { .. }) => Err(DatumError::NestedArraysUnsupported),
            _ => self.entry_type(&ge.entry_type.type_choices),
        };
        checked.wrap_with(|| format!("Rule {} has invalid ValueMemberKey \"{}\":", self.rule, name))
    }

    fn table(&self, entries: &[&GroupEntry]) -> ValidateResult {
        let entry = self.repeated_entry(entries, Structure::Table)?;
        let ge = entry
            .as_value_member_key()
            .ok_or_else(|| DatumError::UnsupportedGroupEntry {
                kind: entry.kind(),
                rule: Some(self.rule.to_string()),
            })?;
        if ge.occur.is_none() {
            return Err(DatumError::MissingOccurrence {
                structure: Structure::Table,
            });
        }
        let key = match &ge.member_key {
            Some(MemberKey::Type1 { is_cut: true, .. }) => {
                return Err(DatumError::CutUnsupported {
                    name: self.rule.to_string(),
                })
            }
            Some(MemberKey::Type1 { t1, .. }) => &t1.type2,
            Some(other) => {
                return Err(DatumError::UnsupportedMemberKey {
                    kind: other.kind(),
                    rule: Some(self.rule.to_string()),
                })
            }
            None => {
                return Err(DatumError::TableWithNoMemberKey {
                    rule: Some(self.rule.to_string()),
                })
            }
        };
        self.single_choice(key)?;
        self.entry_type(&ge.entry_type.type_choices)
    }

    fn repeated_entry<'e>(
        &self,
        entries: &[&'e GroupEntry],
        structure: Structure,
    ) -> DatumResult<&'e GroupEntry> {
        match entries {
            [entry] => Ok(*entry),
            _ => Err(DatumError::OnlyOneRepeatedEntrySupported {
                structure,
                count: entries.len(),
                rule: Some(self.rule.to_string()),
            }),
        }
    }

    fn value_member_key<'e>(&self, entry: &'e GroupEntry) -> DatumResult<&'e ValueMemberKeyEntry> {
        entry
            .as_value_member_key()
            .ok_or_else(|| DatumError::OnlyValueMemberKeySupported {
                kind: entry.kind(),
                rule: self.rule.to_string(),
            })
    }
}

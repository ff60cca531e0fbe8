//! This module defines the LookupContext trait.
//!
//! A [`LookupContext`] is used to specify runtime behavior for matching.
//! When the matcher needs to resolve a rule reference, it will ask the
//! `LookupContext` to perform the name resolution.
//!

use crate::ast::{Rule, Schema, TypeRule};
use std::collections::HashMap;

/// The default for [`MatchOptions::max_depth`].
pub const DEFAULT_MAX_DEPTH: u32 = 64;

/// A LookupContext contains any external information required for matching.
///
/// Right now, that only includes resolving a name to a [`Rule`], knowing
/// which rule is the entry point, and listing the names it can resolve.
pub trait LookupContext {
    /// Lookup a rule by name.
    fn lookup_rule(&self, name: &str) -> Option<&Rule>;

    /// The rule that matching starts from, if there is one.
    fn root_rule(&self) -> Option<&TypeRule>;

    /// Every rule name this context knows, in the order they were defined.
    fn rule_names(&self) -> Vec<&str>;
}

/// A simple context that borrows a schema and can lookup rules by name.
///
/// If a name is defined more than once, the first definition wins.
pub struct BasicContext<'a> {
    schema: &'a Schema,
    rules: HashMap<&'a str, &'a Rule>,
}

impl<'a> BasicContext<'a> {
    /// Create a new BasicContext from a schema.
    pub fn new(schema: &'a Schema) -> BasicContext<'a> {
        let mut rules = HashMap::new();
        for rule in &schema.rules {
            rules.entry(rule.name()).or_insert(rule);
        }
        BasicContext { schema, rules }
    }
}

impl LookupContext for BasicContext<'_> {
    fn lookup_rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name).copied()
    }

    fn root_rule(&self) -> Option<&TypeRule> {
        self.schema.root_rule()
    }

    // Duplicates are included.
    fn rule_names(&self) -> Vec<&str> {
        self.schema.rules.iter().map(Rule::name).collect()
    }
}

/// Settings that control a single match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOptions {
    /// The maximum number of nested rule references followed before giving up.
    ///
    /// A schema that refers to itself would otherwise recurse until the
    /// stack overflows.
    pub max_depth: u32,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_cddl;

    #[test]
    fn first_definition_wins() {
        let schema = parse_cddl("a = int\nb = bytes\na = bytes").unwrap();
        let ctx = BasicContext::new(&schema);
        let rule = ctx.lookup_rule("a").unwrap();
        assert!(std::ptr::eq(rule, &schema.rules[0]));
        assert!(ctx.lookup_rule("c").is_none());
        assert_eq!(ctx.rule_names(), vec!["a", "b", "a"]);
        assert_eq!(ctx.root_rule().unwrap().name.ident, "a");
    }
}

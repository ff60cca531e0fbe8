use cddl_datum::ast::{Rule, Schema, TypeRule};
use cddl_datum::context::{BasicContext, LookupContext, MatchOptions};
use cddl_datum::{decode_cbor_hex, match_datum_with, parse_cddl, DatumError};

// A document that can refer to rules from a shared library document.
struct Stacked<'a> {
    local: BasicContext<'a>,
    library: BasicContext<'a>,
}

impl LookupContext for Stacked<'_> {
    fn lookup_rule(&self, name: &str) -> Option<&Rule> {
        self.local
            .lookup_rule(name)
            .or_else(|| self.library.lookup_rule(name))
    }

    fn root_rule(&self) -> Option<&TypeRule> {
        self.local.root_rule()
    }

    fn rule_names(&self) -> Vec<&str> {
        let mut names = self.local.rule_names();
        for name in self.library.rule_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

fn stacked<'a>(local: &'a Schema, library: &'a Schema) -> Stacked<'a> {
    Stacked {
        local: BasicContext::new(local),
        library: BasicContext::new(library),
    }
}

#[test]
fn library_rules() {
    let library = parse_cddl("Hash = bytes\nCoin = int").unwrap();
    let local = parse_cddl("Output = [hash: Hash, coin: Coin]").unwrap();
    let ctx = stacked(&local, &library);
    assert_eq!(ctx.rule_names(), vec!["Output", "Hash", "Coin"]);

    // [h'00ff', 7]
    let value = decode_cbor_hex("824200ff07").unwrap();
    let datum = match_datum_with(&ctx, &MatchOptions::default(), &value).unwrap();
    assert_eq!(datum.type_name, "Output");

    // Without the library, the names don't resolve.
    let alone = BasicContext::new(&local);
    let err = match_datum_with(&alone, &MatchOptions::default(), &value).unwrap_err();
    assert_eq!(
        err.root_cause(),
        &DatumError::RuleNotFound {
            name: "Hash".into(),
            in_rule: None,
        }
    );
}

#[test]
fn local_rules_shadow_library() {
    let library = parse_cddl("Coin = int").unwrap();
    let local = parse_cddl("Output = [coin: Coin]\nCoin = bytes").unwrap();
    let ctx = stacked(&local, &library);
    assert_eq!(ctx.rule_names(), vec!["Output", "Coin"]);

    // A singleton array is matched as its element: [7]
    let value = decode_cbor_hex("8107").unwrap();
    let err = match_datum_with(&ctx, &MatchOptions::default(), &value).unwrap_err();
    assert_eq!(err.root_cause(), &DatumError::NotABuffer { actual: "Integer" });
}

#[test]
fn no_root_rule() {
    let schema = parse_cddl("pair = (a: int, b: int)").unwrap();
    let ctx = BasicContext::new(&schema);
    let value = decode_cbor_hex("00").unwrap();
    assert_eq!(
        match_datum_with(&ctx, &MatchOptions::default(), &value),
        Err(DatumError::MissingRootRule)
    );
}

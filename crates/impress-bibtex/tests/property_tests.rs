//! Property-based tests for parsing, expansion and the LaTeX codec

use impress_bibtex::lexer::tokenize;
use impress_bibtex::{
    decode_latex, encode_latex, export, parse, parse_with, resolve_crossrefs, BibTeXEntry,
    Component, DiagnosticKind, ExportOptions, FieldValue, MacroTable, ParseOptions,
};
use proptest::prelude::*;

const ENTRY_TYPES: &[&str] = &["article", "book", "inproceedings", "misc", "techreport"];

fn field_name() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{0,10}".prop_filter("crossref is resolved", |name| name != "crossref")
}

/// Text that survives LaTeX decoding unchanged
fn plain_text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ,.:;'!?]{0,30}"
}

fn entry() -> impl Strategy<Value = BibTeXEntry> {
    (
        "[A-Za-z][A-Za-z0-9:_]{0,15}",
        prop::sample::select(ENTRY_TYPES),
        prop::collection::btree_map(field_name(), plain_text(), 0..8),
    )
        .prop_map(|(key, entry_type, fields)| {
            let mut entry = BibTeXEntry::new(key, entry_type);
            for (name, value) in fields {
                entry.add_field(name, value);
            }
            entry
        })
}

fn component() -> impl Strategy<Value = Component> {
    prop_oneof![
        "[a-z ]{0,8}".prop_map(Component::text),
        "[0-9]{1,4}".prop_map(Component::number),
        prop::sample::select(vec!["jan", "feb", "undefined"]).prop_map(Component::macro_ref),
    ]
}

proptest! {
    // === Parse/Export ===

    #[test]
    fn export_then_parse_preserves_entries(entries in prop::collection::vec(entry(), 0..5)) {
        let exported = export(&entries, &ExportOptions::default()).unwrap();
        let result = parse(&exported);

        prop_assert_eq!(result.entries.len(), entries.len());
        for (original, parsed) in entries.iter().zip(&result.entries) {
            prop_assert_eq!(&original.cite_key, &parsed.cite_key);
            prop_assert_eq!(&original.entry_type, &parsed.entry_type);
            prop_assert_eq!(&original.fields, &parsed.fields);
        }
    }

    #[test]
    fn tokens_reconstruct_input(input in "[@{}\"#,=() a-z0-9\\\\\n%]{0,80}") {
        let rebuilt: String = tokenize(&input).iter().map(|t| t.text).collect();
        prop_assert_eq!(rebuilt, input);
    }

    #[test]
    fn parse_never_panics(input in "[@{}\"#,=() a-z0-9\\\\\n%]{0,120}") {
        let result = parse(&input);
        prop_assert!(result.entries.iter().all(|e| !e.cite_key.is_empty()));
    }

    // === Expansion ===

    #[test]
    fn expansion_is_idempotent(components in prop::collection::vec(component(), 1..5)) {
        let table = MacroTable::default();
        let mut entry = BibTeXEntry::new("k", "misc");
        entry.add_field("note", FieldValue::new(components).unwrap());

        let mut diagnostics = Vec::new();
        let once = table.expand_entry(&entry, &mut diagnostics);
        let warnings = diagnostics.len();
        let twice = table.expand_entry(&once, &mut diagnostics);

        prop_assert_eq!(&once, &twice);
        prop_assert!(once.get("note").unwrap().is_literal());
        prop_assert_eq!(diagnostics.len(), warnings);
    }

    // === Crossref ===

    #[test]
    fn crossref_never_overwrites(
        child_fields in prop::collection::btree_map(field_name(), plain_text(), 0..6),
        parent_fields in prop::collection::btree_map(field_name(), plain_text(), 0..6),
    ) {
        let mut child = BibTeXEntry::new("child", "inproceedings");
        for (name, value) in &child_fields {
            child.add_field(name.as_str(), value.as_str());
        }
        child.add_field("crossref", "parent");
        let mut parent = BibTeXEntry::new("parent", "proceedings");
        for (name, value) in &parent_fields {
            parent.add_field(name.as_str(), value.as_str());
        }

        let mut entries = vec![child, parent.clone()];
        let mut diagnostics = Vec::new();
        resolve_crossrefs(&mut entries, &mut diagnostics);

        prop_assert!(diagnostics.is_empty());
        for (name, value) in &child_fields {
            prop_assert_eq!(entries[0].get_field(name), Some(value.clone()));
        }
        for name in parent_fields.keys() {
            prop_assert!(entries[0].contains(name));
        }
        prop_assert_eq!(&entries[1], &parent);
    }

    // === Nesting ===

    #[test]
    fn nesting_reported_once(depth in 1usize..60, limit in 1usize..20) {
        let input = format!(
            "@misc{{k, note = {}x{}}}",
            "{".repeat(depth),
            "}".repeat(depth)
        );
        let options = ParseOptions { max_nesting_depth: limit, ..Default::default() };
        let result = parse_with(&input, &MacroTable::default(), &options);

        let reported = result
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::ExcessiveNesting)
            .count();
        prop_assert_eq!(result.entries.len(), 1);
        prop_assert_eq!(reported, usize::from(depth > limit));
    }

    // === LaTeX Codec ===

    #[test]
    fn decode_inverts_encode(s in "[a-zA-Z0-9 .,:{}äöüÄÖÜßçÇéèêñøØłŁåÅæœıšžř&%#\u{a0}\u{2013}\u{2014}]{0,40}") {
        prop_assert_eq!(decode_latex(&encode_latex(&s)), s);
    }

    #[test]
    fn encode_inverts_decode_of_encoded(s in "[a-zA-Z äöüßéñøłå&%\u{2013}\u{2014}]{0,40}") {
        let encoded = encode_latex(&s);
        prop_assert_eq!(encode_latex(&decode_latex(&encoded)), encoded);
    }
}

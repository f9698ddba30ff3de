//! Snapshot and round-trip tests for BibTeX export
//!
//! Uses insta crate to detect unexpected output changes

mod common;

use common::fixtures::{bibtex_fixture_names, load_bibtex_fixture};
use impress_bibtex::{
    export, export_items, format_entry, parse, parse_document, BibTeXEntry, BibTeXError,
    BraceStyle, ExportOptions, FieldCase, ParseOptions,
};
use insta::assert_snapshot;

fn einstein() -> BibTeXEntry {
    let mut entry = BibTeXEntry::new("Einstein1905", "Article");
    entry.add_field("Author", "Albert Einstein");
    entry.add_field("title", "Zur Elektrodynamik bewegter Körper");
    entry.add_field("journal", "Annalen der Physik");
    entry.add_field("year", "1905");
    entry.add_field("pages", "891–921");
    entry.add_field("doi", "10.1002/andp.19053221004");
    entry
}

// === Formatting ===

#[test]
fn test_default_format() {
    let output = format_entry(&einstein(), &ExportOptions::default()).unwrap();
    assert_snapshot!(output, @r###"
@Article{Einstein1905,
  Author = {Albert Einstein},
  title = {Zur Elektrodynamik bewegter Körper},
  journal = {Annalen der Physik},
  year = {1905},
  pages = {891–921},
  doi = {10.1002/andp.19053221004},
}
"###);
}

#[test]
fn test_latex_escaped_format() {
    let options = ExportOptions {
        escape_latex: true,
        field_case: FieldCase::Lowercase,
        bare_numbers: true,
        trailing_comma: false,
        indent: "    ".to_string(),
        ..Default::default()
    };
    let output = format_entry(&einstein(), &options).unwrap();
    assert_snapshot!(output, @r###"
@article{Einstein1905,
    author = {Albert Einstein},
    title = {Zur Elektrodynamik bewegter K{\"o}rper},
    journal = {Annalen der Physik},
    year = 1905,
    pages = {891{--}921},
    doi = {10.1002/andp.19053221004}
}
"###);
}

#[test]
fn test_quoted_format() {
    let mut entry = BibTeXEntry::new("k", "misc");
    entry.add_field("title", "The {DNA} of {E. coli}");
    entry.add_field("note", "A \"quoted\" word");
    let options = ExportOptions {
        brace_style: BraceStyle::Quoted,
        ..Default::default()
    };
    let output = format_entry(&entry, &options).unwrap();
    assert_snapshot!(output, @r###"
@misc{k,
  title = "The {DNA} of {E. coli}",
  note = {A "quoted" word},
}
"###);
}

#[test]
fn test_export_document_items() {
    let input = "% exported by hand\n@string{jnl = \"Journal of\"}\n@article{k, journal = jnl # { Physics}, month = mar}";
    let (items, diagnostics) = parse_document(input, &ParseOptions::default());
    assert!(diagnostics.is_empty());

    let output = export_items(&items, &ExportOptions::default()).unwrap();
    assert_snapshot!(output.trim_end(), @r###"
% exported by hand

@string{jnl = {Journal of}}

@article{k,
  journal = jnl # { Physics},
  month = mar,
}
"###);
}

#[test]
fn test_invalid_indent_rejected() {
    let options = ExportOptions {
        indent: "-->".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        export(&[einstein()], &options),
        Err(BibTeXError::InvalidExportOptions { .. })
    ));
}

// === Round Trip ===

#[test]
fn test_fixtures_round_trip() {
    for name in bibtex_fixture_names() {
        let first = parse(&load_bibtex_fixture(&name));
        let exported = export(&first.entries, &ExportOptions::default()).unwrap();
        let second = parse(&exported);

        assert!(second.diagnostics.is_empty(), "{}: {:?}", name, second.diagnostics);
        assert_eq!(first.entries.len(), second.entries.len(), "{}", name);
        for (a, b) in first.entries.iter().zip(&second.entries) {
            assert_eq!(a.cite_key, b.cite_key);
            assert_eq!(a.entry_type, b.entry_type);
            assert_eq!(a.fields, b.fields, "{}", name);
        }
    }
}

#[test]
fn test_escaped_round_trip_restores_source() {
    let input = load_bibtex_fixture("accents.bib");
    let first = parse(&input);
    let options = ExportOptions {
        escape_latex: true,
        ..Default::default()
    };
    let second = parse(&export(&first.entries, &options).unwrap());
    assert_eq!(first.entries, strip_spans(second.entries, &first.entries));
}

/// Copy source spans from `reference` so entries from different texts compare
fn strip_spans(mut entries: Vec<BibTeXEntry>, reference: &[BibTeXEntry]) -> Vec<BibTeXEntry> {
    for (entry, original) in entries.iter_mut().zip(reference) {
        entry.raw_span = original.raw_span;
    }
    entries
}

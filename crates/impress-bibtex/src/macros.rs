//! String macro table and expansion
//!
//! Macros are resolved strictly in document order: an `@string` only affects
//! items that come after it, and a redefinition never changes earlier
//! expansions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::diagnostic::{Diagnostic, DiagnosticKind, Span};
use crate::entry::{BibTeXEntry, BibTeXItem};
use crate::journal_macros::journal_macros;
use crate::value::{Component, FieldValue};

/// Built-in month abbreviations
const MONTHS: [(&str, &str); 12] = [
    ("jan", "January"),
    ("feb", "February"),
    ("mar", "March"),
    ("apr", "April"),
    ("may", "May"),
    ("jun", "June"),
    ("jul", "July"),
    ("aug", "August"),
    ("sep", "September"),
    ("oct", "October"),
    ("nov", "November"),
    ("dec", "December"),
];

/// Case-insensitive mapping from macro name to resolved text
///
/// `MacroTable::default()` holds the twelve month abbreviations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroTable {
    macros: HashMap<String, String>,
}

impl Default for MacroTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for (name, month) in MONTHS {
            table.define(name, month);
        }
        table
    }
}

impl MacroTable {
    /// A table without the month abbreviations
    pub fn empty() -> Self {
        Self {
            macros: HashMap::new(),
        }
    }

    /// Add the AASTeX journal macros, keeping any existing definitions
    pub fn with_journal_macros(mut self) -> Self {
        for (name, journal) in journal_macros() {
            self.macros
                .entry(name.to_string())
                .or_insert_with(|| journal.to_string());
        }
        self
    }

    /// Define or redefine a macro, returning the previous value
    pub fn define(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        self.macros.insert(name.to_lowercase(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.macros.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Definitions in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        let mut pairs: Vec<_> = self
            .macros
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        pairs.sort_unstable();
        pairs.into_iter()
    }

    /// Resolve a value to plain text.
    ///
    /// Unknown macros are substituted by their own name, with a warning at `span`.
    pub fn expand_value(
        &self,
        value: &FieldValue,
        span: Span,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> String {
        let mut text = String::new();
        for component in value.components() {
            match component {
                Component::Text(s) | Component::Number(s) => text.push_str(s),
                Component::Macro(name) => match self.get(name) {
                    Some(resolved) => text.push_str(resolved),
                    None => {
                        diagnostics.push(
                            Diagnostic::new(
                                DiagnosticKind::UnknownMacro,
                                format!("Unknown macro '{}'; using its name literally", name),
                                span,
                            )
                            .with_suggestion(format!("define it with @string{{{} = ...}}", name)),
                        );
                        text.push_str(name);
                    }
                },
            }
        }
        text
    }

    /// Copy of `entry` with every field reduced to literal text
    pub fn expand_entry(
        &self,
        entry: &BibTeXEntry,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> BibTeXEntry {
        let mut expanded = entry.clone();
        for field in &mut expanded.fields {
            if !field.value.is_literal() {
                let span = field.span.or(entry.raw_span).unwrap_or_default();
                field.value = FieldValue::literal(self.expand_value(&field.value, span, diagnostics));
            }
        }
        expanded
    }
}

/// Output of the expansion pass
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub entries: Vec<BibTeXEntry>,
    pub preambles: Vec<String>,
    pub comments: Vec<String>,
    /// Table after the last `@string` of the document
    pub macros: MacroTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// Expand macros in document order against a private copy of `seed`
pub fn expand(items: &[BibTeXItem], seed: &MacroTable) -> Expansion {
    let mut macros = seed.clone();
    let mut diagnostics = Vec::new();
    let mut entries = Vec::new();
    let mut preambles = Vec::new();
    let mut comments = Vec::new();

    for item in items {
        match item {
            BibTeXItem::Entry(entry) => entries.push(macros.expand_entry(entry, &mut diagnostics)),
            BibTeXItem::StringMacro { name, value, span } => {
                let resolved = macros.expand_value(value, *span, &mut diagnostics);
                macros.define(name, resolved);
            }
            BibTeXItem::Preamble { value, span } => {
                preambles.push(macros.expand_value(value, *span, &mut diagnostics));
            }
            BibTeXItem::Comment { text, .. } => comments.push(text.clone()),
        }
    }

    Expansion {
        entries,
        preambles,
        comments,
        macros,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::BibTeXField;

    fn string_item(name: &str, value: FieldValue) -> BibTeXItem {
        BibTeXItem::StringMacro {
            name: name.to_string(),
            value,
            span: Span::default(),
        }
    }

    fn entry_with(field: &str, value: FieldValue) -> BibTeXItem {
        let mut entry = BibTeXEntry::new("k", "article");
        entry.add_field(field, value);
        BibTeXItem::Entry(entry)
    }

    fn macro_value(name: &str) -> FieldValue {
        FieldValue::new(vec![Component::macro_ref(name)]).unwrap()
    }

    #[test]
    fn test_months_seeded() {
        let table = MacroTable::default();
        assert_eq!(table.len(), 12);
        assert_eq!(table.get("JAN"), Some("January"));
        assert_eq!(table.get("dec"), Some("December"));
        assert!(MacroTable::empty().is_empty());
    }

    #[test]
    fn test_seed_can_override_months() {
        let mut seed = MacroTable::default();
        seed.define("jan", "Jan.");
        let result = expand(&[entry_with("month", macro_value("jan"))], &seed);
        assert_eq!(result.entries[0].get_field("month").as_deref(), Some("Jan."));
    }

    #[test]
    fn test_document_order() {
        let items = vec![
            entry_with("journal", macro_value("j")),
            string_item("J", FieldValue::literal("First")),
            entry_with("journal", macro_value("j")),
            string_item("j", FieldValue::literal("Second")),
            entry_with("journal", macro_value("J")),
        ];
        let result = expand(&items, &MacroTable::default());
        let journals: Vec<_> = result
            .entries
            .iter()
            .map(|e| e.get_field("journal").unwrap())
            .collect();
        assert_eq!(journals, ["j", "First", "Second"]);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::UnknownMacro);
        assert_eq!(result.macros.get("j"), Some("Second"));
    }

    #[test]
    fn test_string_refers_to_earlier_string() {
        let items = vec![
            string_item("a", FieldValue::literal("Phys.")),
            string_item(
                "b",
                FieldValue::new(vec![Component::macro_ref("a"), Component::text(" Rev.")]).unwrap(),
            ),
        ];
        let result = expand(&items, &MacroTable::empty());
        assert_eq!(result.macros.get("b"), Some("Phys. Rev."));
    }

    #[test]
    fn test_seed_is_not_mutated() {
        let seed = MacroTable::default();
        let result = expand(&[string_item("x", FieldValue::literal("y"))], &seed);
        assert!(!seed.contains("x"));
        assert!(result.macros.contains("x"));
    }

    #[test]
    fn test_expand_entry_is_idempotent() {
        let table = MacroTable::default();
        let mut entry = BibTeXEntry::new("k", "article");
        entry.add_field(
            "month",
            FieldValue::new(vec![Component::macro_ref("mar"), Component::text(" 3")]).unwrap(),
        );
        entry.add_field("year", FieldValue::new(vec![Component::number("2001")]).unwrap());
        let mut diagnostics = Vec::new();
        let once = table.expand_entry(&entry, &mut diagnostics);
        let twice = table.expand_entry(&once, &mut diagnostics);
        assert_eq!(once, twice);
        assert_eq!(once.get("month"), Some(&FieldValue::literal("March 3")));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_macro_points_at_field() {
        let mut entry = BibTeXEntry::new("k", "article");
        entry.raw_span = Some(Span {
            start: 0,
            end: 60,
            line: 1,
            column: 1,
        });
        let field_span = Span {
            start: 30,
            end: 37,
            line: 3,
            column: 3,
        };
        entry.push_field(BibTeXField::new("journal", macro_value("nowhere")).with_span(field_span));

        let mut diagnostics = Vec::new();
        MacroTable::default().expand_entry(&entry, &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].span, field_span);
    }

    #[test]
    fn test_journal_seed_keeps_existing() {
        let mut seed = MacroTable::default();
        seed.define("apj", "ApJ");
        let table = seed.with_journal_macros();
        assert_eq!(table.get("apj"), Some("ApJ"));
        assert_eq!(table.get("mnras"), Some("Monthly Notices of the Royal Astronomical Society"));
        assert_eq!(table.get("jan"), Some("January"));
    }
}

//! BibTeX entry data structures

use serde::{Deserialize, Serialize};

use crate::diagnostic::Span;
use crate::value::FieldValue;

/// A single BibTeX field (name-value pair)
///
/// Equality ignores `span`, so fields read from different texts compare by
/// content.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct BibTeXField {
    /// Lower-cased name used for matching
    pub name: String,
    /// Name as it was written in the source
    pub name_as_typed: String,
    pub value: FieldValue,
    /// Location of the field name in the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl BibTeXField {
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let name_as_typed = name.into();
        Self {
            name: name_as_typed.to_lowercase(),
            name_as_typed,
            value: value.into(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl PartialEq for BibTeXField {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.name_as_typed == other.name_as_typed
            && self.value == other.value
    }
}

/// A parsed BibTeX entry
///
/// Fields keep their insertion order so that custom or vendor-specific fields
/// survive a parse/export cycle in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibTeXEntry {
    pub cite_key: String,
    /// Lower-cased entry type (`article`, `inproceedings`, ...)
    pub entry_type: String,
    /// Entry type as it was written in the source
    pub entry_type_as_typed: String,
    pub fields: Vec<BibTeXField>,
    /// Source location of the whole `@type{...}` block
    pub raw_span: Option<Span>,
}

impl BibTeXEntry {
    /// Create a new BibTeX entry
    pub fn new(cite_key: impl Into<String>, entry_type: impl Into<String>) -> Self {
        let entry_type_as_typed = entry_type.into();
        Self {
            cite_key: cite_key.into(),
            entry_type: entry_type_as_typed.to_lowercase(),
            entry_type_as_typed,
            fields: Vec::new(),
            raw_span: None,
        }
    }

    /// Add a field unless one with the same name exists.
    ///
    /// Returns `false` (and leaves the entry unchanged) when the name is taken.
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> bool {
        self.push_field(BibTeXField::new(name, value))
    }

    /// [`add_field`](Self::add_field) for a prepared field
    pub fn push_field(&mut self, field: BibTeXField) -> bool {
        if self.contains(&field.name) {
            return false;
        }
        self.fields.push(field);
        true
    }

    /// Replace a field's value in place, or append it when absent
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let field = BibTeXField::new(name, value);
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => existing.value = field.value,
            None => self.fields.push(field),
        }
    }

    pub fn remove_field(&mut self, name: &str) -> Option<FieldValue> {
        let name = name.to_lowercase();
        let index = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(index).value)
    }

    /// Get a field value by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        let name = name.to_lowercase();
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }

    /// Get a field's text by name (case-insensitive)
    pub fn get_field(&self, name: &str) -> Option<String> {
        self.get(name).map(FieldValue::to_literal_text)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Target of the `crossref` field, if any
    pub fn crossref(&self) -> Option<String> {
        self.get_field("crossref").map(|key| key.trim().to_string())
    }

    /// True when both cite keys are equal ignoring case
    pub fn has_key(&self, key: &str) -> bool {
        self.cite_key.to_lowercase() == key.to_lowercase()
    }
}

/// A top-level item of a BibTeX document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BibTeXItem {
    Entry(BibTeXEntry),
    StringMacro {
        name: String,
        value: FieldValue,
        span: Span,
    },
    Preamble {
        value: FieldValue,
        span: Span,
    },
    /// `@comment{...}` block or text between items, kept verbatim
    Comment {
        text: String,
        span: Span,
    },
}

impl BibTeXItem {
    pub fn as_entry(&self) -> Option<&BibTeXEntry> {
        match self {
            Self::Entry(entry) => Some(entry),
            _ => None,
        }
    }
}

//! Parse and export configuration
//!
//! Both option sets deserialize with defaults for missing keys, so hosts can
//! keep them in their own settings files.

use serde::{Deserialize, Serialize};

use crate::error::BibTeXError;

/// Fields whose values are identifiers or paths rather than LaTeX text
pub const DEFAULT_VERBATIM_FIELDS: &[&str] = &["url", "doi", "eprint", "file", "crossref"];

/// Default limit on brace nesting inside one field value
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 500;

fn default_verbatim_fields() -> Vec<String> {
    DEFAULT_VERBATIM_FIELDS.iter().map(|f| f.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Deepest brace nesting accepted in a value (the value's own group counts as 1)
    pub max_nesting_depth: usize,
    /// Decode LaTeX accents and special characters in field values
    pub decode_latex: bool,
    /// Replace AASTeX journal commands (`{\apj}`) in `journal` fields with full names
    pub expand_journal_macros: bool,
    /// Fields never LaTeX-decoded
    pub verbatim_fields: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            decode_latex: true,
            expand_journal_macros: false,
            verbatim_fields: default_verbatim_fields(),
        }
    }
}

impl ParseOptions {
    pub fn is_verbatim(&self, field: &str) -> bool {
        is_listed(&self.verbatim_fields, field)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BraceStyle {
    /// `title = {Value}`
    #[default]
    Braced,
    /// `title = "Value"`
    Quoted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldCase {
    /// Write entry types and field names as they were typed
    #[default]
    Preserve,
    Lowercase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Encode Unicode back to LaTeX sequences
    pub escape_latex: bool,
    pub brace_style: BraceStyle,
    pub field_case: FieldCase,
    /// Write a comma after the last field
    pub trailing_comma: bool,
    /// Write all-digit values without delimiters (`year = 2024`)
    pub bare_numbers: bool,
    /// Prefix for each field line; spaces and tabs only
    pub indent: String,
    /// Fields never LaTeX-encoded
    pub verbatim_fields: Vec<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            escape_latex: false,
            brace_style: BraceStyle::Braced,
            field_case: FieldCase::Preserve,
            trailing_comma: true,
            bare_numbers: false,
            indent: "  ".to_string(),
            verbatim_fields: default_verbatim_fields(),
        }
    }
}

impl ExportOptions {
    pub fn validate(&self) -> Result<(), BibTeXError> {
        if let Some(c) = self.indent.chars().find(|c| *c != ' ' && *c != '\t') {
            return Err(BibTeXError::InvalidExportOptions {
                reason: format!("indent may only contain spaces and tabs, found {:?}", c),
            });
        }
        Ok(())
    }

    pub fn is_verbatim(&self, field: &str) -> bool {
        is_listed(&self.verbatim_fields, field)
    }
}

fn is_listed(list: &[String], field: &str) -> bool {
    list.iter().any(|f| f.eq_ignore_ascii_case(field))
}

//! BibTeX parsing and formatting
//!
//! This crate converts BibTeX text to structured entries and back, keeping
//! unknown fields, field order and brace grouping intact across a round trip.
//!
//! Features:
//! - Token-level parser that recovers from malformed input with diagnostics
//! - Document-order `@string` macro expansion (month abbreviations built in)
//! - One-level `crossref` inheritance
//! - LaTeX accent and special character decoding/encoding
//! - AASTeX journal macro expansion
//! - Configurable formatting
//!
//! No parser state is global, so separate documents can be parsed on separate
//! threads at the same time.

mod crossref;
mod diagnostic;
mod entry;
mod error;
mod formatter;
mod journal_macros;
mod latex;
pub mod lexer;
mod macros;
mod options;
pub mod parser;
pub mod reader;
mod value;

pub use crossref::resolve_crossrefs;
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity, Span};
pub use entry::{BibTeXEntry, BibTeXField, BibTeXItem};
pub use error::BibTeXError;
pub use formatter::{export, export_items, format_entry};
pub use macros::{expand, Expansion, MacroTable};
pub use options::{
    BraceStyle, ExportOptions, FieldCase, ParseOptions, DEFAULT_MAX_NESTING_DEPTH,
    DEFAULT_VERBATIM_FIELDS,
};
pub use parser::{parse, parse_document, parse_items, parse_with, ParseResult};
pub use value::{Component, FieldValue};

// Re-export LaTeX and journal macro functions
pub use journal_macros::{expand_journal_macro, is_journal_macro, journal_macro_names};
pub use latex::{decode as decode_latex, encode as encode_latex};

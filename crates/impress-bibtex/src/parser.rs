//! BibTeX item parser
//!
//! This parser handles standard BibTeX format including:
//! - @string definitions
//! - @preamble declarations
//! - @comment sections and free text between items
//! - All entry types, with `{...}` or `(...)` delimiters
//! - Braced and quoted field values, `#` concatenation and nested braces
//!
//! Parsing never fails. Problems are recorded as diagnostics and the parser
//! resynchronises at the next item.

use serde::{Deserialize, Serialize};

use crate::crossref::resolve_crossrefs;
use crate::diagnostic::{Diagnostic, DiagnosticKind, Severity, Span};
use crate::entry::{BibTeXEntry, BibTeXField, BibTeXItem};
use crate::journal_macros::expand_journal_macro;
use crate::latex::decode_entry;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::macros::{expand, MacroTable};
use crate::options::ParseOptions;
use crate::reader::{describe, read_value, starts_line, Cursor, ReadFailure};
use crate::value::FieldValue;

/// Result of parsing a BibTeX document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    /// Entries with macros expanded and crossrefs resolved
    pub entries: Vec<BibTeXEntry>,
    pub preambles: Vec<String>,
    /// `@comment` blocks and text between items
    pub comments: Vec<String>,
    /// Macro table after the last `@string` of the document
    pub macros: MacroTable,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Parse a BibTeX string with the month macros and default options
pub fn parse(input: &str) -> ParseResult {
    parse_with(input, &MacroTable::default(), &ParseOptions::default())
}

/// Parse a BibTeX string against a caller-supplied macro seed.
///
/// `seed` is never modified; the document's own `@string` definitions end up
/// in [`ParseResult::macros`].
pub fn parse_with(input: &str, seed: &MacroTable, options: &ParseOptions) -> ParseResult {
    let (items, mut diagnostics) = parse_document(input, options);

    let expansion = if options.expand_journal_macros {
        expand(&items, &seed.clone().with_journal_macros())
    } else {
        expand(&items, seed)
    };
    diagnostics.extend(expansion.diagnostics);

    let mut entries = expansion.entries;
    for entry in &mut entries {
        if options.expand_journal_macros {
            expand_journal_field(entry);
        }
        if options.decode_latex {
            decode_entry(entry, options);
        }
    }
    resolve_crossrefs(&mut entries, &mut diagnostics);

    let result = ParseResult {
        entries,
        preambles: expansion.preambles,
        comments: expansion.comments,
        macros: expansion.macros,
        diagnostics,
    };
    tracing::debug!(
        "Parsed {} entries ({} errors, {} warnings)",
        result.entries.len(),
        result.error_count(),
        result.warning_count()
    );
    result
}

/// Parse a document into raw items without expanding anything
pub fn parse_document(input: &str, options: &ParseOptions) -> (Vec<BibTeXItem>, Vec<Diagnostic>) {
    let tokens = tokenize(input);
    let mut diagnostics = Vec::new();
    let items = parse_items(&tokens, options, &mut diagnostics);
    (items, diagnostics)
}

/// Parse tokens into items in document order
pub fn parse_items(
    tokens: &[Token<'_>],
    options: &ParseOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<BibTeXItem> {
    let mut parser = ItemParser {
        cursor: Cursor::new(tokens),
        options,
        diagnostics,
        items: Vec::new(),
    };
    parser.run();
    parser.items
}

/// `journal = {\apj}` becomes the full journal name
fn expand_journal_field(entry: &mut BibTeXEntry) {
    let Some(journal) = entry.get_field("journal") else {
        return;
    };
    if !journal.trim_start().starts_with('\\') {
        return;
    }
    if let Some(name) = expand_journal_macro(&journal) {
        entry.set_field("journal", name);
    }
}

// ===== Item Parser =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Brace,
    Paren,
}

impl Delimiter {
    fn opening(token: &Token<'_>) -> Option<Self> {
        if token.is(TokenKind::LeftBrace) {
            Some(Self::Brace)
        } else if token.is_char('(') {
            Some(Self::Paren)
        } else {
            None
        }
    }

    fn closes(self, token: &Token<'_>) -> bool {
        match self {
            Self::Brace => token.is(TokenKind::RightBrace),
            Self::Paren => token.is_char(')'),
        }
    }

    fn closer(self) -> char {
        match self {
            Self::Brace => '}',
            Self::Paren => ')',
        }
    }
}

/// The `@type{` prefix of the item being parsed
#[derive(Debug, Clone, Copy)]
struct Opened<'a> {
    at: Token<'a>,
    open: Token<'a>,
    delimiter: Delimiter,
}

/// How to get out of an item that could not be completed
#[derive(Debug)]
enum Skip {
    /// Report `MalformedItem` and skip to the item's matching closer
    Malformed { message: String, span: Span },
    /// Already reported; continue at token `resume`
    Abandoned { resume: usize },
}

impl From<ReadFailure> for Skip {
    fn from(failure: ReadFailure) -> Self {
        match failure {
            ReadFailure::Missing { message, span } => Skip::Malformed { message, span },
            ReadFailure::Unterminated { resume, .. } => Skip::Abandoned { resume },
        }
    }
}

struct ItemParser<'t, 'a, 'p> {
    cursor: Cursor<'t, 'a>,
    options: &'p ParseOptions,
    diagnostics: &'p mut Vec<Diagnostic>,
    items: Vec<BibTeXItem>,
}

impl<'t, 'a, 'p> ItemParser<'t, 'a, 'p> {
    fn run(&mut self) {
        loop {
            let gap_start = self.cursor.position();
            while !self.cursor.is_eof() && !self.starts_item(self.cursor.position()) {
                self.cursor.bump();
            }
            self.implicit_comment(gap_start, self.cursor.position());

            if self.cursor.is_eof() {
                break;
            }
            self.item();
        }
    }

    /// An `@` glued to a preceding word (`name@example.org`) is comment text
    fn starts_item(&self, index: usize) -> bool {
        if !self.cursor.at(index).is(TokenKind::At) {
            return false;
        }
        if index == 0 {
            return true;
        }
        let previous = self.cursor.at(index - 1);
        let is_word = matches!(
            previous.kind,
            TokenKind::Identifier | TokenKind::Number | TokenKind::Text
        );
        !is_word || previous.is_char('(') || previous.is_char(')')
    }

    fn implicit_comment(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let tokens = &self.cursor.tokens()[start..end];
        let raw: String = tokens.iter().map(|t| t.text).collect();
        let text = raw.trim();
        if text.is_empty() {
            return;
        }
        self.items.push(BibTeXItem::Comment {
            text: text.to_string(),
            span: tokens[0].span.to(tokens[tokens.len() - 1].span),
        });
    }

    fn item(&mut self) {
        let at_index = self.cursor.position();
        let at = self.cursor.bump();
        self.cursor.skip_whitespace();

        let kind_token = self.cursor.peek();
        if !kind_token.is(TokenKind::Identifier) {
            let skip = Skip::Malformed {
                message: format!("Expected an item type after '@', found {}", describe(&kind_token)),
                span: kind_token.span,
            };
            self.recover(at_index, skip);
            return;
        }
        self.cursor.bump();
        let kind = kind_token.text.to_lowercase();

        if kind == "comment" {
            self.explicit_comment(at_index, at);
            return;
        }

        self.cursor.skip_whitespace();
        let open = self.cursor.peek();
        let Some(delimiter) = Delimiter::opening(&open) else {
            let skip = Skip::Malformed {
                message: format!(
                    "Expected '{{' or '(' after '@{}', found {}",
                    kind_token.text,
                    describe(&open)
                ),
                span: open.span,
            };
            self.recover(at_index, skip);
            return;
        };
        self.cursor.bump();

        let opened = Opened {
            at,
            open,
            delimiter,
        };
        let result = match kind.as_str() {
            "string" => self.string_body(&opened),
            "preamble" => self.preamble_body(&opened),
            _ => self.entry_body(&opened, kind_token.text).map(Some),
        };

        match result {
            Ok(Some(item)) => self.items.push(item),
            Ok(None) => {}
            Err(skip) => self.recover(at_index, skip),
        }
    }

    /// `@comment{...}` kept whole, or `@comment` with the rest of its line
    fn explicit_comment(&mut self, at_index: usize, at: Token<'a>) {
        let tokens = self.cursor.tokens();
        let mut next = self.cursor.position();
        while is_inline_space(&self.cursor.at(next)) {
            next += 1;
        }

        let end = match Delimiter::opening(&self.cursor.at(next)) {
            Some(_) => match self.cursor.group_end(next) {
                Some(close) => close + 1,
                None => {
                    let open = self.cursor.at(next);
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::UnterminatedGroup,
                        format!(
                            "Unterminated @comment opened at line {}, column {}",
                            open.span.line, open.span.column
                        ),
                        open.span,
                    ));
                    let resume = self.cursor.recovery_point(next + 1);
                    self.recover(at_index, Skip::Abandoned { resume });
                    return;
                }
            },
            None => {
                let mut end = self.cursor.position();
                loop {
                    let token = self.cursor.at(end);
                    if token.is(TokenKind::Eof) || is_line_break(&token) {
                        break end;
                    }
                    end += 1;
                }
            }
        };

        let raw: String = tokens[at_index..end].iter().map(|t| t.text).collect();
        let span = at.span.to(self.cursor.at(end.saturating_sub(1)).span);
        self.items.push(BibTeXItem::Comment {
            text: raw.trim_end().to_string(),
            span,
        });
        self.cursor.set_position(end);
    }

    fn string_body(&mut self, opened: &Opened<'a>) -> Result<Option<BibTeXItem>, Skip> {
        self.cursor.skip_whitespace();
        let name = self.cursor.peek();
        if !name.is(TokenKind::Identifier) {
            return Err(self.unexpected(opened, "a macro name"));
        }
        self.cursor.bump();
        self.expect_equals(opened)?;

        let value = self.field_value()?;

        self.cursor.skip_whitespace();
        if self.cursor.peek().is(TokenKind::Comma) {
            self.cursor.bump();
            self.cursor.skip_whitespace();
        }
        let closer = self.cursor.peek();
        if !opened.delimiter.closes(&closer) {
            if closer.is(TokenKind::Identifier) {
                return Err(Skip::Malformed {
                    message: "@string holds more than one definition".to_string(),
                    span: closer.span,
                });
            }
            return Err(self.unexpected(opened, "the end of @string"));
        }
        self.cursor.bump();

        Ok(value.map(|value| BibTeXItem::StringMacro {
            name: name.text.to_string(),
            value,
            span: opened.at.span.to(closer.span),
        }))
    }

    fn preamble_body(&mut self, opened: &Opened<'a>) -> Result<Option<BibTeXItem>, Skip> {
        let value = self.field_value()?;

        self.cursor.skip_whitespace();
        let closer = self.cursor.peek();
        if !opened.delimiter.closes(&closer) {
            return Err(self.unexpected(opened, "the end of @preamble"));
        }
        self.cursor.bump();

        Ok(value.map(|value| BibTeXItem::Preamble {
            value,
            span: opened.at.span.to(closer.span),
        }))
    }

    fn entry_body(&mut self, opened: &Opened<'a>, entry_type: &str) -> Result<BibTeXItem, Skip> {
        self.cursor.skip_whitespace();
        let cite_key = self.cite_key(opened.delimiter);
        if cite_key.is_empty() {
            return Err(self.unexpected(opened, "a cite key"));
        }
        let mut entry = BibTeXEntry::new(cite_key, entry_type);

        // After the key and after each field: `,` or the closer
        loop {
            self.cursor.skip_whitespace();
            let token = self.cursor.peek();
            if opened.delimiter.closes(&token) {
                self.cursor.bump();
                entry.raw_span = Some(opened.at.span.to(token.span));
                return Ok(BibTeXItem::Entry(entry));
            }
            if !token.is(TokenKind::Comma) {
                return Err(self.unexpected(opened, "',' or the end of the entry"));
            }
            self.cursor.bump();

            self.cursor.skip_whitespace();
            let name = self.cursor.peek();
            if opened.delimiter.closes(&name) || name.is(TokenKind::Comma) {
                continue;
            }
            if !name.is(TokenKind::Identifier) {
                return Err(self.unexpected(opened, "a field name"));
            }
            self.cursor.bump();
            self.expect_equals(opened)?;

            let Some(value) = self.field_value()? else {
                continue;
            };
            if !entry.push_field(BibTeXField::new(name.text, value).with_span(name.span)) {
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DuplicateField,
                    format!(
                        "Duplicate field '{}' in '{}'; keeping the first",
                        name.text, entry.cite_key
                    ),
                    name.span,
                ));
            }
        }
    }

    /// Consecutive word tokens before the first comma
    fn cite_key(&mut self, delimiter: Delimiter) -> String {
        let mut key = String::new();
        loop {
            let token = self.cursor.peek();
            let is_word = matches!(
                token.kind,
                TokenKind::Identifier | TokenKind::Number | TokenKind::Text
            );
            if !is_word || delimiter.closes(&token) {
                break;
            }
            key.push_str(token.text);
            self.cursor.bump();
        }
        key
    }

    fn expect_equals(&mut self, opened: &Opened<'a>) -> Result<(), Skip> {
        self.cursor.skip_whitespace();
        if !self.cursor.peek().is(TokenKind::Equals) {
            return Err(self.unexpected(opened, "'='"));
        }
        self.cursor.bump();
        Ok(())
    }

    /// Read a value. `None` means the value was dropped and the cursor sits
    /// on the enclosing item's closer.
    fn field_value(&mut self) -> Result<Option<FieldValue>, Skip> {
        match read_value(&mut self.cursor, self.options, self.diagnostics) {
            Ok(value) => Ok(Some(value)),
            Err(ReadFailure::Unterminated {
                resume,
                abandon_item: false,
            }) => {
                self.cursor.set_position(resume);
                Ok(None)
            }
            Err(failure) => Err(failure.into()),
        }
    }

    /// Failure at the cursor. Running into the end of input or the next item
    /// means the item was never closed.
    fn unexpected(&mut self, opened: &Opened<'a>, expected: &str) -> Skip {
        let token = self.cursor.peek();
        let position = self.cursor.position();
        let runs_into_next = token.is(TokenKind::At) && starts_line(self.cursor.tokens(), position);

        if token.is(TokenKind::Eof) || runs_into_next {
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::UnterminatedGroup,
                    format!(
                        "Item opened at line {}, column {} is missing its closing '{}'",
                        opened.open.span.line,
                        opened.open.span.column,
                        opened.delimiter.closer()
                    ),
                    opened.open.span,
                )
                .with_suggestion(format!("add '{}' before {}", opened.delimiter.closer(), describe(&token))),
            );
            return Skip::Abandoned { resume: position };
        }

        Skip::Malformed {
            message: format!("Expected {}, found {}", expected, describe(&token)),
            span: token.span,
        }
    }

    fn recover(&mut self, at_index: usize, skip: Skip) {
        let tokens = self.cursor.tokens();
        let resume = match skip {
            Skip::Malformed { message, span } => {
                self.diagnostics.push(Diagnostic::new(DiagnosticKind::MalformedItem, message, span));
                item_opener(tokens, at_index)
                    .and_then(|open| self.cursor.group_end(open))
                    .map(|close| close + 1)
                    .unwrap_or_else(|| self.cursor.recovery_point(at_index + 1))
            }
            Skip::Abandoned { resume } => resume,
        };

        let at = self.cursor.at(at_index).span;
        tracing::trace!(
            "Skipped item at line {}, column {}; resuming at token {}",
            at.line,
            at.column,
            resume
        );
        self.cursor.set_position(resume.max(at_index + 1));
    }
}

fn is_line_break(token: &Token<'_>) -> bool {
    token.is(TokenKind::Whitespace) && token.text.contains('\n')
}

fn is_inline_space(token: &Token<'_>) -> bool {
    token.is(TokenKind::Whitespace) && !is_line_break(token)
}

/// First `{` or `(` of the item starting at `at_index`
fn item_opener(tokens: &[Token<'_>], at_index: usize) -> Option<usize> {
    for (i, token) in tokens.iter().enumerate().skip(at_index + 1) {
        if token.is(TokenKind::At) || token.is(TokenKind::Eof) {
            return None;
        }
        if Delimiter::opening(token).is_some() {
            return Some(i);
        }
    }
    None
}

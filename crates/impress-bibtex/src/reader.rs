//! Brace-balanced field value reader
//!
//! Reads one `#`-concatenated value from a token cursor. Brace nesting is
//! tracked with an explicit stack, so arbitrarily deep input never grows the
//! call stack.

use crate::diagnostic::{Diagnostic, DiagnosticKind, Span};
use crate::lexer::{Token, TokenKind};
use crate::options::ParseOptions;
use crate::value::{Component, FieldValue};

/// Position in a token slice that always ends with `Eof`
#[derive(Debug, Clone)]
pub struct Cursor<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
    landmarks: Landmarks,
}

impl<'t, 'a> Cursor<'t, 'a> {
    pub fn new(tokens: &'t [Token<'a>]) -> Self {
        Self {
            tokens,
            pos: 0,
            landmarks: Landmarks::build(tokens),
        }
    }

    pub fn tokens(&self) -> &'t [Token<'a>] {
        self.tokens
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.last_index());
    }

    /// Token at `index`, or the final token past the end
    pub fn at(&self, index: usize) -> Token<'a> {
        match self.tokens.get(index).or_else(|| self.tokens.last()) {
            Some(token) => *token,
            None => Token {
                kind: TokenKind::Eof,
                text: "",
                span: Span::default(),
            },
        }
    }

    pub fn peek(&self) -> Token<'a> {
        self.at(self.pos)
    }

    /// Return the current token and move past it (never past `Eof`)
    pub fn bump(&mut self) -> Token<'a> {
        let token = self.peek();
        if !token.is(TokenKind::Eof) {
            self.pos += 1;
        }
        token
    }

    pub fn skip_whitespace(&mut self) {
        while self.peek().is(TokenKind::Whitespace) {
            self.pos += 1;
        }
    }

    pub fn is_eof(&self) -> bool {
        self.peek().is(TokenKind::Eof)
    }

    /// Token that ends the group opened at `open` (a `{`, `(` or `"`).
    ///
    /// A `{` ends at its matching `}`. A `(` ends at the next `)` inside the
    /// same braces. A `"` ends at the next `"` inside the same braces, or at
    /// the first `}` it did not open. `None` when the input ends first.
    pub(crate) fn group_end(&self, open: usize) -> Option<usize> {
        self.landmarks.ends.get(open).copied().flatten()
    }

    /// Where to resume after an unrecoverable item: the next `@` that starts
    /// a line at or after `from`, else the next `@`, else `Eof`
    pub(crate) fn recovery_point(&self, from: usize) -> usize {
        let landmarks = &self.landmarks;
        landmarks
            .next_line_at
            .get(from)
            .copied()
            .flatten()
            .or_else(|| landmarks.next_at.get(from).copied().flatten())
            .unwrap_or_else(|| self.last_index())
    }

    fn last_index(&self) -> usize {
        self.tokens.len().saturating_sub(1)
    }
}

// ===== Landmarks =====

/// Group ends and item starts for every token, computed in one pass so that
/// recovering from a broken item never rescans the input
#[derive(Debug, Clone, Default)]
struct Landmarks {
    ends: Vec<Option<usize>>,
    next_line_at: Vec<Option<usize>>,
    next_at: Vec<Option<usize>>,
    /// Innermost `{` still open at the end of input
    innermost_unclosed: Option<usize>,
}

/// An open `{` with the `(` and `"` seen directly inside it
#[derive(Debug, Default)]
struct Frame {
    open: Option<usize>,
    parens: Vec<usize>,
    quote: Option<usize>,
}

impl Landmarks {
    fn build(tokens: &[Token<'_>]) -> Self {
        let mut ends = vec![None; tokens.len()];
        // The bottom frame is top level and is never popped
        let mut frames = vec![Frame::default()];

        for (i, token) in tokens.iter().enumerate() {
            match token.kind {
                TokenKind::LeftBrace => frames.push(Frame {
                    open: Some(i),
                    ..Default::default()
                }),
                TokenKind::RightBrace => {
                    if let Some(quote) = frames.last_mut().and_then(|f| f.quote.take()) {
                        ends[quote] = Some(i);
                    }
                    if frames.len() > 1 {
                        if let Some(open) = frames.pop().and_then(|f| f.open) {
                            ends[open] = Some(i);
                        }
                    }
                }
                TokenKind::Quote => {
                    // Each `"` ends the previous one and may open the next
                    if let Some(quote) = frames.last_mut().and_then(|f| f.quote.replace(i)) {
                        ends[quote] = Some(i);
                    }
                }
                _ if token.is_char('(') => {
                    if let Some(frame) = frames.last_mut() {
                        frame.parens.push(i);
                    }
                }
                _ if token.is_char(')') => {
                    if let Some(frame) = frames.last_mut() {
                        for paren in frame.parens.drain(..) {
                            ends[paren] = Some(i);
                        }
                    }
                }
                _ => {}
            }
        }

        let mut next_line_at = vec![None; tokens.len()];
        let mut next_at = vec![None; tokens.len()];
        let (mut line_at, mut any_at) = (None, None);
        for (i, token) in tokens.iter().enumerate().rev() {
            if token.is(TokenKind::At) {
                any_at = Some(i);
                if starts_line(tokens, i) {
                    line_at = Some(i);
                }
            }
            next_line_at[i] = line_at;
            next_at[i] = any_at;
        }

        Self {
            ends,
            next_line_at,
            next_at,
            innermost_unclosed: frames.last().and_then(|f| f.open),
        }
    }
}

/// Why no value could be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadFailure {
    /// The cursor is not at a value; nothing was consumed or reported
    Missing { message: String, span: Span },
    /// A group was never closed. The diagnostic has been recorded; parsing
    /// should continue at token `resume`. When `abandon_item` is set the
    /// enclosing item cannot be completed.
    Unterminated { resume: usize, abandon_item: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Braced,
    Quoted,
}

/// Read one field value starting at the cursor
pub fn read_value(
    cursor: &mut Cursor<'_, '_>,
    options: &ParseOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<FieldValue, ReadFailure> {
    let mut components = Vec::new();
    let mut nesting_reported = false;

    loop {
        cursor.skip_whitespace();
        let token = cursor.peek();
        let component = match token.kind {
            TokenKind::LeftBrace => Component::Text(read_group(
                cursor,
                Group::Braced,
                options,
                diagnostics,
                &mut nesting_reported,
            )?),
            TokenKind::Quote => Component::Text(read_group(
                cursor,
                Group::Quoted,
                options,
                diagnostics,
                &mut nesting_reported,
            )?),
            TokenKind::Number => {
                cursor.bump();
                Component::Number(token.text.to_string())
            }
            TokenKind::Identifier => {
                cursor.bump();
                Component::Macro(token.text.to_string())
            }
            TokenKind::Text if !token.is_char('(') && !token.is_char(')') => {
                cursor.bump();
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::LexicalAnomaly,
                    format!("Unexpected bare text '{}' in field value", token.text),
                    token.span,
                ).with_suggestion("enclose the value in braces"));
                Component::Text(token.text.to_string())
            }
            _ => {
                return Err(ReadFailure::Missing {
                    message: format!("Expected a field value, found {}", describe(&token)),
                    span: token.span,
                })
            }
        };
        components.push(component);

        cursor.skip_whitespace();
        if cursor.peek().is(TokenKind::Hash) {
            cursor.bump();
        } else {
            break;
        }
    }

    let span = cursor.peek().span;
    FieldValue::new(components).map_err(|e| ReadFailure::Missing {
        message: e.to_string(),
        span,
    })
}

/// Read a `{...}` or `"..."` group at the cursor, returning its inner text
fn read_group(
    cursor: &mut Cursor<'_, '_>,
    group: Group,
    options: &ParseOptions,
    diagnostics: &mut Vec<Diagnostic>,
    nesting_reported: &mut bool,
) -> Result<String, ReadFailure> {
    let open = cursor.position();
    if cursor.group_end(open).is_none() {
        return Err(unterminated(cursor, group, open, diagnostics));
    }
    let opener = cursor.at(open);
    let max_depth = options.max_nesting_depth.max(1);

    // Inner open braces; the group's own delimiter is depth 1
    let mut stack: Vec<usize> = Vec::new();
    // Braces opened past the limit, counted but not stored
    let mut overflow = 0usize;
    // Inner braces still open when the value was truncated
    let mut truncated_open: Option<usize> = None;
    let mut text = String::new();
    let mut i = open + 1;

    loop {
        let token = cursor.at(i);
        let balanced = stack.is_empty() && overflow == 0;

        match token.kind {
            TokenKind::Eof => return Err(unterminated(cursor, group, open, diagnostics)),
            TokenKind::Quote if group == Group::Quoted && balanced => {
                cursor.set_position(i + 1);
                break;
            }
            TokenKind::RightBrace if balanced => {
                if group == Group::Braced {
                    cursor.set_position(i + 1);
                    break;
                }
                // An unbalanced `}` inside quotes belongs to the enclosing item
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::UnterminatedGroup,
                        format!(
                            "Unterminated quoted value opened at line {}, column {}",
                            opener.span.line, opener.span.column
                        ),
                        opener.span,
                    )
                    .with_suggestion("add the closing '\"'"),
                );
                return Err(ReadFailure::Unterminated {
                    resume: i,
                    abandon_item: false,
                });
            }
            TokenKind::LeftBrace => {
                let depth = 2 + stack.len() + overflow;
                if depth > max_depth {
                    overflow += 1;
                    if truncated_open.is_none() {
                        truncated_open = Some(stack.len());
                        if !*nesting_reported {
                            *nesting_reported = true;
                            diagnostics.push(Diagnostic::new(
                                DiagnosticKind::ExcessiveNesting,
                                format!(
                                    "Brace nesting exceeds the limit of {}; value truncated",
                                    max_depth
                                ),
                                token.span,
                            ));
                        }
                    }
                } else {
                    stack.push(i);
                    if truncated_open.is_none() {
                        text.push('{');
                    }
                }
            }
            TokenKind::RightBrace => {
                if overflow > 0 {
                    overflow -= 1;
                } else {
                    stack.pop();
                    if truncated_open.is_none() {
                        text.push('}');
                    }
                }
            }
            _ => {
                if truncated_open.is_none() {
                    text.push_str(token.text);
                }
            }
        }
        i += 1;
    }

    if let Some(open_braces) = truncated_open {
        text.push_str(&"}".repeat(open_braces));
    }
    Ok(text)
}

impl Group {
    fn describe(&self) -> &'static str {
        match self {
            Group::Braced => "brace group",
            Group::Quoted => "quoted value",
        }
    }
}

/// Report a group that the input never closes. The enclosing item is lost.
fn unterminated(
    cursor: &Cursor<'_, '_>,
    group: Group,
    open: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> ReadFailure {
    let opener = cursor.at(open).span;
    let mut diagnostic = Diagnostic::new(
        DiagnosticKind::UnterminatedGroup,
        format!(
            "Unterminated {} opened at line {}, column {}",
            group.describe(),
            opener.line,
            opener.column
        ),
        opener,
    );
    if let Some(inner) = cursor.landmarks.innermost_unclosed.filter(|&inner| inner > open) {
        let inner = cursor.at(inner).span;
        diagnostic = diagnostic.with_suggestion(format!(
            "innermost unclosed brace is at line {}, column {}",
            inner.line, inner.column
        ));
    }
    diagnostics.push(diagnostic);
    ReadFailure::Unterminated {
        resume: cursor.recovery_point(open + 1),
        abandon_item: true,
    }
}

pub(crate) fn starts_line(tokens: &[Token<'_>], index: usize) -> bool {
    index == 0
        || tokens
            .get(index - 1)
            .map(|t| t.is(TokenKind::Whitespace) && t.text.contains('\n'))
            .unwrap_or(false)
}

pub(crate) fn describe(token: &Token<'_>) -> String {
    match token.kind {
        TokenKind::Eof => "end of input".to_string(),
        TokenKind::Whitespace => "whitespace".to_string(),
        _ => format!("'{}'", token.text),
    }
}

//! BibTeX lexer
//!
//! Splits raw text into structural tokens without interpreting them. Every byte
//! of the input belongs to exactly one token, so the token texts concatenate
//! back to the original input.

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{anychar, char},
    combinator::recognize,
    multi::many1,
    sequence::pair,
    IResult,
};
use serde::Serialize;

use crate::diagnostic::Span;

/// Characters that always form a token of their own
const DELIMITERS: &str = "@{}\"#,=()";

/// Characters that may not appear in a macro name or field name
const NON_IDENTIFIER: &str = "%'~\\";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    At,
    Identifier,
    LeftBrace,
    RightBrace,
    Quote,
    Hash,
    Comma,
    Equals,
    Number,
    Text,
    Whitespace,
    Eof,
}

/// A lexical unit borrowing its text from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Span,
}

impl Token<'_> {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// True for a `Text` token holding exactly `c` (used for `(`/`)` delimiters)
    pub fn is_char(&self, c: char) -> bool {
        self.kind == TokenKind::Text && self.text.len() == c.len_utf8() && self.text.starts_with(c)
    }
}

/// Tokenize BibTeX source. Never fails; the last token is always `Eof`.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = input;
    let mut position = Position::default();

    while let Some((remaining, text, kind)) = next_token(rest) {
        let span = position.advance(text);
        tokens.push(Token { kind, text, span });
        rest = remaining;
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        text: "",
        span: Span {
            start: position.offset,
            end: position.offset,
            line: position.line,
            column: position.column,
        },
    });
    tokens
}

struct Position {
    offset: usize,
    line: usize,
    column: usize,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl Position {
    /// Span of `text` starting here; moves past it
    fn advance(&mut self, text: &str) -> Span {
        let span = Span {
            start: self.offset,
            end: self.offset + text.len(),
            line: self.line,
            column: self.column,
        };
        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.offset += text.len();
        span
    }
}

fn next_token(input: &str) -> Option<(&str, &str, TokenKind)> {
    let first = input.chars().next()?;

    if first.is_whitespace() {
        if let Ok((rest, ws)) = whitespace(input) {
            return Some((rest, ws, TokenKind::Whitespace));
        }
    }

    let punctuation = match first {
        '@' => Some(TokenKind::At),
        '{' => Some(TokenKind::LeftBrace),
        '}' => Some(TokenKind::RightBrace),
        '"' => Some(TokenKind::Quote),
        '#' => Some(TokenKind::Hash),
        ',' => Some(TokenKind::Comma),
        '=' => Some(TokenKind::Equals),
        '(' | ')' => Some(TokenKind::Text),
        _ => None,
    };
    if let Some(kind) = punctuation {
        let len = first.len_utf8();
        return Some((&input[len..], &input[..len], kind));
    }

    match word(input) {
        Ok((rest, text)) => Some((rest, text, classify(text))),
        // A lone backslash at the very end of the input
        Err(_) => {
            let len = first.len_utf8();
            Some((&input[len..], &input[..len], TokenKind::Text))
        }
    }
}

fn whitespace(input: &str) -> IResult<&str, &str> {
    take_while1(char::is_whitespace)(input)
}

/// A run of word characters; a backslash always takes the next character with it
fn word(input: &str) -> IResult<&str, &str> {
    recognize(many1(alt((
        recognize(pair(char('\\'), anychar)),
        take_while1(is_word_char),
    ))))(input)
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && c != '\\' && !DELIMITERS.contains(c)
}

fn classify(word: &str) -> TokenKind {
    if word.bytes().all(|b| b.is_ascii_digit()) {
        TokenKind::Number
    } else if is_identifier(word) {
        TokenKind::Identifier
    } else {
        TokenKind::Text
    }
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() || NON_IDENTIFIER.contains(c) => false,
        Some(_) => chars.all(|c| !NON_IDENTIFIER.contains(c)),
        None => false,
    }
}

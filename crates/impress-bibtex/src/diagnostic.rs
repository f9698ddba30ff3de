//! Diagnostics collected while importing a bibliography
//!
//! Diagnostics annotate a best-effort result; they never change data that has
//! already been produced.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Location of a token or item in the source text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    /// 1-based line of `start`
    pub line: usize,
    /// 1-based column (in characters) of `start`
    pub column: usize,
}

impl Span {
    /// Span covering `self` through `other`
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end.max(self.end),
            line: self.line,
            column: self.column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// What went wrong, and how it was recovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// Unrecognized character, kept as literal text
    LexicalAnomaly,
    /// Brace or quote never closed; parsing resumed at the next delimiter
    UnterminatedGroup,
    /// Item violates the entry/string/preamble grammar and was skipped
    MalformedItem,
    /// Field repeated within one entry; the first occurrence is kept
    DuplicateField,
    /// Macro not defined; its name was substituted literally
    UnknownMacro,
    /// `crossref` names a key that is not in the document
    UnresolvedCrossref,
    /// `crossref` names the entry itself; the field was removed
    SelfReferentialCrossref,
    /// Brace nesting exceeded the configured limit; the value was truncated
    ExcessiveNesting,
    /// Two entries share a cite key; both are kept
    DuplicateCiteKey,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LexicalAnomaly => "lexical-anomaly",
            Self::UnterminatedGroup => "unterminated-group",
            Self::MalformedItem => "malformed-item",
            Self::DuplicateField => "duplicate-field",
            Self::UnknownMacro => "unknown-macro",
            Self::UnresolvedCrossref => "unresolved-crossref",
            Self::SelfReferentialCrossref => "self-referential-crossref",
            Self::ExcessiveNesting => "excessive-nesting",
            Self::DuplicateCiteKey => "duplicate-cite-key",
        }
    }

    /// Severity a diagnostic of this kind is reported with
    pub fn severity(&self) -> Severity {
        match self {
            Self::UnterminatedGroup
            | Self::MalformedItem
            | Self::SelfReferentialCrossref
            | Self::ExcessiveNesting => Severity::Error,
            Self::LexicalAnomaly
            | Self::DuplicateField
            | Self::UnknownMacro
            | Self::UnresolvedCrossref
            | Self::DuplicateCiteKey => Severity::Warning,
        }
    }
}

/// A single problem found in the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Span,
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Create a diagnostic with the default severity of `kind`
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            message: message.into(),
            span,
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(
            f,
            "{}[{}] {}:{}: {}",
            severity,
            self.kind.as_str(),
            self.span.line,
            self.span.column,
            self.message
        )?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

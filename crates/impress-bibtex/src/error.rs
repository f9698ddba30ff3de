//! Error types for argument-contract violations
//!
//! Malformed BibTeX input never produces one of these; it is reported through
//! [`Diagnostic`](crate::Diagnostic) values instead.

use thiserror::Error;

/// Error type for misuse of the API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BibTeXError {
    #[error("Field value must contain at least one component")]
    EmptyValue,
    #[error("Invalid export options: {reason}")]
    InvalidExportOptions { reason: String },
}

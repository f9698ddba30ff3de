//! Field values as sequences of concatenated components
//!
//! A value is kept as its parts (`{text} # macro # 12`) rather than eagerly
//! joined, so expansion can happen later, or again, against any macro table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BibTeXError;

/// One `#`-separated part of a field value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    /// Contents of a `{...}` or `"..."` group, without the outer delimiters
    Text(String),
    /// Bare identifier referring to a `@string` macro
    Macro(String),
    /// Bare run of digits
    Number(String),
}

impl Component {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn macro_ref(name: impl Into<String>) -> Self {
        Self::Macro(name.into())
    }

    pub fn number(digits: impl Into<String>) -> Self {
        Self::Number(digits.into())
    }

    /// The raw string carried by this component
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::Macro(s) | Self::Number(s) => s,
        }
    }
}

/// A non-empty, ordered sequence of components
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Component>", into = "Vec<Component>")]
pub struct FieldValue(Vec<Component>);

impl FieldValue {
    /// Build a value from its components; an empty list is rejected
    pub fn new(components: Vec<Component>) -> Result<Self, BibTeXError> {
        if components.is_empty() {
            return Err(BibTeXError::EmptyValue);
        }
        Ok(Self(components))
    }

    /// A single literal text component
    pub fn literal(text: impl Into<String>) -> Self {
        Self(vec![Component::Text(text.into())])
    }

    pub fn components(&self) -> &[Component] {
        &self.0
    }

    /// True when the value is plain text with nothing left to expand
    pub fn is_literal(&self) -> bool {
        matches!(self.0.as_slice(), [Component::Text(_)])
    }

    /// Join the components without expanding macros (macro names are kept verbatim)
    pub fn to_literal_text(&self) -> String {
        self.0.iter().map(Component::as_str).collect()
    }
}

impl TryFrom<Vec<Component>> for FieldValue {
    type Error = BibTeXError;

    fn try_from(components: Vec<Component>) -> Result<Self, Self::Error> {
        Self::new(components)
    }
}

impl From<FieldValue> for Vec<Component> {
    fn from(value: FieldValue) -> Self {
        value.0
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        Self::literal(text)
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        Self::literal(text)
    }
}

/// Renders the value as BibTeX source: `{text} # macro # 12`
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" # ")?;
            }
            match component {
                Component::Text(s) => write!(f, "{{{}}}", s)?,
                Component::Macro(s) | Component::Number(s) => f.write_str(s)?,
            }
        }
        Ok(())
    }
}

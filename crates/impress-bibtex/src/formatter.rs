//! BibTeX formatting module
//!
//! Converts entries and document items back to BibTeX text.

use crate::entry::{BibTeXEntry, BibTeXItem};
use crate::error::BibTeXError;
use crate::latex::encode;
use crate::options::{BraceStyle, ExportOptions, FieldCase};
use crate::value::{Component, FieldValue};

/// Format entries separated by a blank line
pub fn export(entries: &[BibTeXEntry], options: &ExportOptions) -> Result<String, BibTeXError> {
    options.validate()?;
    let blocks: Vec<String> = entries
        .iter()
        .map(|entry| format_entry_internal(entry, options))
        .collect();
    Ok(finish(blocks))
}

/// Format a whole document: comments, `@string`, `@preamble` and entries in order
pub fn export_items(items: &[BibTeXItem], options: &ExportOptions) -> Result<String, BibTeXError> {
    options.validate()?;
    let blocks: Vec<String> = items
        .iter()
        .map(|item| match item {
            BibTeXItem::Entry(entry) => format_entry_internal(entry, options),
            BibTeXItem::StringMacro { name, value, .. } => format!(
                "@string{{{} = {}}}",
                name,
                format_value(value, Context::new("@string", name), options)
            ),
            BibTeXItem::Preamble { value, .. } => format!(
                "@preamble{{{}}}",
                format_value(value, Context::new("@preamble", ""), options)
            ),
            BibTeXItem::Comment { text, .. } => text.clone(),
        })
        .collect();
    Ok(finish(blocks))
}

/// Format a single entry
pub fn format_entry(entry: &BibTeXEntry, options: &ExportOptions) -> Result<String, BibTeXError> {
    options.validate()?;
    Ok(format_entry_internal(entry, options))
}

fn finish(blocks: Vec<String>) -> String {
    if blocks.is_empty() {
        return String::new();
    }
    let mut result = blocks.join("\n\n");
    result.push('\n');
    result
}

fn format_entry_internal(entry: &BibTeXEntry, options: &ExportOptions) -> String {
    let entry_type = spelled(&entry.entry_type, &entry.entry_type_as_typed, options);

    let mut result = String::new();
    result.push('@');
    result.push_str(entry_type);
    result.push('{');
    result.push_str(&entry.cite_key);

    if entry.fields.is_empty() {
        result.push('}');
        return result;
    }
    result.push(',');

    let last = entry.fields.len() - 1;
    for (i, field) in entry.fields.iter().enumerate() {
        result.push('\n');
        result.push_str(&options.indent);
        result.push_str(spelled(&field.name, &field.name_as_typed, options));
        result.push_str(" = ");
        result.push_str(&format_value(
            &field.value,
            Context::new(&entry.cite_key, &field.name),
            options,
        ));
        if i < last || options.trailing_comma {
            result.push(',');
        }
    }

    result.push_str("\n}");
    result
}

/// Name to write for an entry type or field, falling back to the canonical
/// form when the typed spelling no longer matches it
fn spelled<'e>(canonical: &'e str, as_typed: &'e str, options: &ExportOptions) -> &'e str {
    match options.field_case {
        FieldCase::Preserve if as_typed.to_lowercase() == canonical => as_typed,
        _ => canonical,
    }
}

/// Where a value lives, for log messages
struct Context<'c> {
    owner: &'c str,
    field: &'c str,
}

impl<'c> Context<'c> {
    fn new(owner: &'c str, field: &'c str) -> Self {
        Self { owner, field }
    }
}

fn format_value(value: &FieldValue, context: Context<'_>, options: &ExportOptions) -> String {
    let escape = options.escape_latex && !options.is_verbatim(context.field);

    value
        .components()
        .iter()
        .map(|component| match component {
            Component::Macro(name) => name.clone(),
            Component::Number(digits) if options.bare_numbers => digits.clone(),
            Component::Number(digits) => delimit(digits, &context, options),
            Component::Text(text) if options.bare_numbers && is_number(text) => text.clone(),
            Component::Text(text) if escape => delimit(&encode(text), &context, options),
            Component::Text(text) => delimit(text, &context, options),
        })
        .collect::<Vec<_>>()
        .join(" # ")
}

fn is_number(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Wrap text in the configured delimiters
fn delimit(text: &str, context: &Context<'_>, options: &ExportOptions) -> String {
    let scan = scan(text);
    if !scan.balanced {
        tracing::warn!(
            "Field '{}' of '{}' has unbalanced braces; the output may not parse",
            context.field,
            context.owner
        );
    }

    // A top-level quote would end a quoted value early
    if options.brace_style == BraceStyle::Quoted && !scan.top_level_quote {
        format!("\"{}\"", text)
    } else {
        format!("{{{}}}", text)
    }
}

struct Scan {
    balanced: bool,
    top_level_quote: bool,
}

fn scan(text: &str) -> Scan {
    let mut depth = 0i64;
    let mut balanced = true;
    let mut top_level_quote = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    balanced = false;
                    depth = 0;
                }
            }
            '"' if depth == 0 => top_level_quote = true,
            _ => {}
        }
    }

    Scan {
        balanced: balanced && depth == 0,
        top_level_quote,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BibTeXEntry {
        let mut entry = BibTeXEntry::new("Smith2024", "Article");
        entry.add_field("Author", "John Smith");
        entry.add_field("title", "A Great Paper");
        entry.add_field("year", "2024");
        entry
    }

    #[test]
    fn test_format_simple_entry() {
        let formatted = format_entry(&sample(), &ExportOptions::default()).unwrap();
        assert_eq!(
            formatted,
            "@Article{Smith2024,\n  Author = {John Smith},\n  title = {A Great Paper},\n  year = {2024},\n}"
        );
    }

    #[test]
    fn test_lowercase_and_no_trailing_comma() {
        let options = ExportOptions {
            field_case: FieldCase::Lowercase,
            trailing_comma: false,
            bare_numbers: true,
            ..Default::default()
        };
        let formatted = format_entry(&sample(), &options).unwrap();
        assert!(formatted.starts_with("@article{Smith2024,\n  author = {John Smith},"));
        assert!(formatted.ends_with("  year = 2024\n}"));
    }

    #[test]
    fn test_quoted_style_falls_back_to_braces() {
        let mut entry = BibTeXEntry::new("k", "misc");
        entry.add_field("title", "Plain");
        entry.add_field("note", "Say \"hi\"");
        entry.add_field("howpublished", "{\"}quoted");
        let options = ExportOptions {
            brace_style: BraceStyle::Quoted,
            ..Default::default()
        };
        let formatted = format_entry(&entry, &options).unwrap();
        assert!(formatted.contains("title = \"Plain\","));
        assert!(formatted.contains("note = {Say \"hi\"},"));
        assert!(formatted.contains("howpublished = \"{\"}quoted\","));
    }

    #[test]
    fn test_escape_latex_skips_verbatim_fields() {
        let mut entry = BibTeXEntry::new("k", "misc");
        entry.add_field("author", "Müller & Söhne");
        entry.add_field("url", "https://example.com/a%20b");
        let options = ExportOptions {
            escape_latex: true,
            ..Default::default()
        };
        let formatted = format_entry(&entry, &options).unwrap();
        assert!(formatted.contains(r#"author = {M{\"u}ller \& S{\"o}hne},"#));
        assert!(formatted.contains("url = {https://example.com/a%20b},"));
    }

    #[test]
    fn test_unexpanded_components() {
        let mut entry = BibTeXEntry::new("k", "article");
        entry.add_field(
            "journal",
            FieldValue::new(vec![
                Component::macro_ref("jnl"),
                Component::text(" Physics"),
                Component::number("7"),
            ])
            .unwrap(),
        );
        let formatted = format_entry(&entry, &ExportOptions::default()).unwrap();
        assert!(formatted.contains("journal = jnl # { Physics} # {7},"));
    }

    #[test]
    fn test_entry_without_fields() {
        let entry = BibTeXEntry::new("k", "misc");
        assert_eq!(format_entry(&entry, &ExportOptions::default()).unwrap(), "@misc{k}");
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = ExportOptions {
            indent: "xx".to_string(),
            ..Default::default()
        };
        assert!(export(&[sample()], &options).is_err());
    }

    #[test]
    fn test_blank_line_between_entries() {
        let output = export(&[sample(), sample()], &ExportOptions::default()).unwrap();
        assert!(output.contains("}\n\n@Article{Smith2024,"));
        assert!(output.ends_with("}\n"));
        assert_eq!(export(&[], &ExportOptions::default()).unwrap(), "");
    }

    #[test]
    fn test_scan() {
        assert!(scan("a {b} c").balanced);
        assert!(!scan("a } b {").balanced);
        assert!(scan(r"a \} b").balanced);
        assert!(scan("say \"x\"").top_level_quote);
        assert!(!scan("{\"}").top_level_quote);
    }
}

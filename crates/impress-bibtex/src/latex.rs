//! LaTeX accent codec
//!
//! Converts between a fixed table of LaTeX sequences and Unicode. `decode`
//! accepts the common spellings (`\"o`, `\"{o}`, `{\"o}`, `\c c`, `\ss{}`);
//! `encode` always writes the braced form (`{\"o}`, `{\c{c}}`, `{\ss}`, `{--}`),
//! which `decode` maps back exactly. Anything outside the table passes through.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::entry::BibTeXEntry;
use crate::options::ParseOptions;
use crate::value::FieldValue;

// ===== Accent Tables =====

/// Accents written as `\<symbol><letter>`
const SYMBOL_ACCENTS: &[(char, &str)] = &[
    ('"', "aäAÄeëEËiïIÏoöOÖuüUÜyÿYŸ"),
    ('\'', "aáAÁeéEÉiíIÍoóOÓuúUÚyýYÝcćCĆnńNŃsśSŚzźZŹ"),
    ('`', "aàAÀeèEÈiìIÌoòOÒuùUÙ"),
    ('^', "aâAÂeêEÊiîIÎoôOÔuûUÛ"),
    ('~', "aãAÃnñNÑoõOÕ"),
    ('=', "aāAĀeēEĒiīIĪoōOŌuūUŪ"),
    ('.', "zżZŻeėEĖ"),
];

/// Accents written as `\<letter>{<letter>}` or `\<letter> <letter>`
const LETTER_ACCENTS: &[(char, &str)] = &[
    ('c', "cçCÇsşSŞ"),
    ('v', "cčCČsšSŠzžZŽrřRŘeěEĚnňNŇ"),
    ('u', "aăAĂgğGĞ"),
    ('r', "aåAÅuůUŮ"),
    ('k', "aąAĄeęEĘ"),
    ('H', "oőOŐuűUŰ"),
];

/// Letters written as a control word (`\ss`, `{\o}`)
const NAMED_LETTERS: &[(&str, char)] = &[
    ("ss", 'ß'),
    ("ae", 'æ'),
    ("AE", 'Æ'),
    ("oe", 'œ'),
    ("OE", 'Œ'),
    ("o", 'ø'),
    ("O", 'Ø'),
    ("l", 'ł'),
    ("L", 'Ł'),
    ("i", 'ı'),
    ("aa", 'å'),
    ("AA", 'Å'),
];

/// Escaped characters (`\&`)
const ESCAPED: &[char] = &['&', '%', '#'];

const NBSP: char = '\u{a0}';
const EN_DASH: char = '\u{2013}';
const EM_DASH: char = '\u{2014}';

fn accent_pairs(table: &'static [(char, &'static str)]) -> impl Iterator<Item = (char, char, char)> {
    table.iter().flat_map(|(accent, pairs)| {
        let chars: Vec<char> = pairs.chars().collect();
        chars
            .chunks(2)
            .filter_map(|pair| match pair {
                [base, accented] => Some((*accent, *base, *accented)),
                _ => None,
            })
            .collect::<Vec<_>>()
    })
}

lazy_static! {
    /// (accent, base letter) to accented character
    static ref DECODE_ACCENTS: HashMap<(char, char), char> = accent_pairs(SYMBOL_ACCENTS)
        .chain(accent_pairs(LETTER_ACCENTS))
        .map(|(accent, base, accented)| ((accent, base), accented))
        .collect();

    static ref DECODE_NAMED: HashMap<&'static str, char> = NAMED_LETTERS.iter().copied().collect();

    /// Unicode character to its braced LaTeX spelling
    static ref ENCODE: HashMap<char, String> = {
        let mut map = HashMap::new();
        for (accent, base, accented) in accent_pairs(SYMBOL_ACCENTS) {
            map.insert(accented, format!("{{\\{}{}}}", accent, base));
        }
        for (accent, base, accented) in accent_pairs(LETTER_ACCENTS) {
            map.insert(accented, format!("{{\\{}{{{}}}}}", accent, base));
        }
        // `\aa` duplicates `\r{a}`; the accent spelling wins
        for (name, letter) in NAMED_LETTERS {
            map.entry(*letter).or_insert_with(|| format!("{{\\{}}}", name));
        }
        map
    };

    static ref SYMBOL_ACCENT: Regex =
        Regex::new(r#"^\\(["'`^~=.])(?:\{(\\i|[A-Za-z])\}|(\\i|[A-Za-z]))"#).unwrap();
    static ref LETTER_ACCENT: Regex =
        Regex::new(r"^\\([cvurkH])(?:\{([A-Za-z])\}| ([A-Za-z]))").unwrap();
    static ref CONTROL_WORD: Regex = Regex::new(r"^\\([A-Za-z]+)(\{\}| )?").unwrap();
}

// ===== Decoding =====

/// Replace known LaTeX sequences with Unicode characters
pub fn decode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(c) = rest.chars().next() {
        let decoded = match c {
            '{' => braced_dash(rest).or_else(|| braced_command(rest)),
            '\\' => command(rest),
            '~' => Some((NBSP, 1)),
            '-' if rest.starts_with("---") => Some((EM_DASH, 3)),
            '-' if rest.starts_with("--") => Some((EN_DASH, 2)),
            _ => None,
        };

        match decoded {
            Some((decoded, len)) => {
                out.push(decoded);
                rest = &rest[len..];
            }
            None if c == '\\' => {
                // Unknown command: keep the backslash and the character it escapes
                let len = 1 + rest[1..].chars().next().map_or(0, char::len_utf8);
                out.push_str(&rest[..len]);
                rest = &rest[len..];
            }
            None => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    out
}

/// `{---}` or `{--}` read as one dash
fn braced_dash(input: &str) -> Option<(char, usize)> {
    if input.starts_with("{---}") {
        Some((EM_DASH, 5))
    } else if input.starts_with("{--}") {
        Some((EN_DASH, 4))
    } else {
        None
    }
}

/// `{<command>}` where the braces hold exactly one known command
fn braced_command(input: &str) -> Option<(char, usize)> {
    let inner = &input[1..];
    if !inner.starts_with('\\') {
        return None;
    }
    // Escapes keep their braces: `{\&}` reads as `{&}`
    if inner[1..].starts_with(ESCAPED) {
        return None;
    }
    let (decoded, len) = command(inner)?;
    inner[len..].starts_with('}').then_some((decoded, len + 2))
}

/// A known command at the start of `input` (which begins with `\`)
fn command(input: &str) -> Option<(char, usize)> {
    if let Some(captures) = SYMBOL_ACCENT
        .captures(input)
        .or_else(|| LETTER_ACCENT.captures(input))
    {
        let accent = captures.get(1)?.as_str().chars().next()?;
        let base = captures.get(2).or_else(|| captures.get(3))?.as_str();
        let base = if base == "\\i" { 'i' } else { base.chars().next()? };
        let decoded = DECODE_ACCENTS.get(&(accent, base))?;
        return Some((*decoded, captures.get(0)?.end()));
    }

    let escaped = input[1..].chars().next()?;
    if ESCAPED.contains(&escaped) {
        return Some((escaped, 2));
    }

    let captures = CONTROL_WORD.captures(input)?;
    let decoded = DECODE_NAMED.get(captures.get(1)?.as_str())?;
    Some((*decoded, captures.get(0)?.end()))
}

// ===== Encoding =====

/// Replace table characters with their LaTeX spelling
pub fn encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            NBSP => out.push('~'),
            EN_DASH => out.push_str("{--}"),
            EM_DASH => out.push_str("{---}"),
            c if ESCAPED.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => match ENCODE.get(&c) {
                Some(latex) => out.push_str(latex),
                None => out.push(c),
            },
        }
    }
    out
}

/// Decode every literal, non-verbatim field of `entry`
pub(crate) fn decode_entry(entry: &mut BibTeXEntry, options: &ParseOptions) {
    for field in &mut entry.fields {
        if options.is_verbatim(&field.name) || !field.value.is_literal() {
            continue;
        }
        let text = field.value.to_literal_text();
        let decoded = decode(&text);
        if decoded != text {
            field.value = FieldValue::literal(decoded);
        }
    }
}

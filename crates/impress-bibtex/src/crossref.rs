//! Crossref inheritance
//!
//! A child entry naming a parent in its `crossref` field receives every parent
//! field it does not define itself. Only one level is resolved: inherited
//! fields come from the parent as it was before resolution.

use std::collections::HashMap;

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::entry::{BibTeXEntry, BibTeXField};

/// Fill missing fields of crossref children from their parents, in place
pub fn resolve_crossrefs(entries: &mut [BibTeXEntry], diagnostics: &mut Vec<Diagnostic>) {
    let index = key_index(entries, diagnostics);

    // Collected against the unresolved entries so chains are never followed
    let mut inherited: Vec<(usize, Vec<BibTeXField>)> = Vec::new();
    let mut self_references = Vec::new();

    for (child_index, child) in entries.iter().enumerate() {
        let Some(target) = child.crossref() else {
            continue;
        };
        let span = child.raw_span.unwrap_or_default();

        if child.has_key(&target) {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::SelfReferentialCrossref,
                    format!("Entry '{}' crossrefs itself; crossref ignored", child.cite_key),
                    span,
                )
                .with_suggestion("remove the crossref field"),
            );
            self_references.push(child_index);
            continue;
        }

        let Some(&parent_index) = index.get(&target.to_lowercase()) else {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnresolvedCrossref,
                format!(
                    "Entry '{}' crossrefs unknown key '{}'",
                    child.cite_key, target
                ),
                span,
            ));
            continue;
        };

        let fields: Vec<BibTeXField> = entries[parent_index]
            .fields
            .iter()
            .filter(|field| !child.contains(&field.name))
            .cloned()
            .collect();
        if !fields.is_empty() {
            inherited.push((child_index, fields));
        }
    }

    for (child_index, fields) in inherited {
        entries[child_index].fields.extend(fields);
    }
    for child_index in self_references {
        entries[child_index].remove_field("crossref");
    }
}

/// Lower-cased cite key to the index of its first entry
fn key_index(entries: &[BibTeXEntry], diagnostics: &mut Vec<Diagnostic>) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let key = entry.cite_key.to_lowercase();
        if index.contains_key(&key) {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::DuplicateCiteKey,
                format!("Duplicate cite key '{}'; both entries kept", entry.cite_key),
                entry.raw_span.unwrap_or_default(),
            ));
        } else {
            index.insert(key, i);
        }
    }
    index
}

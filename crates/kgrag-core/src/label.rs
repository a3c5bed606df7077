//! Structural label sanitization.
//!
//! Entity types and relationship types are free text, but graph labels must
//! be identifier-safe. Sanitization keeps ASCII alphanumerics and `_` and
//! maps every other character to `_`. The mapping is lossy: distinct types
//! can collapse onto the same label.

use std::collections::BTreeMap;

use serde::Serialize;

/// Sanitize an entity type into a node label.
pub fn entity_label(entity_type: &str) -> String {
    entity_type
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Sanitize a relationship type into an uppercase relationship label.
pub fn relationship_label(rel_type: &str) -> String {
    entity_label(rel_type).to_ascii_uppercase()
}

/// Distinct source types that collapse onto one sanitized label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCollision {
    pub label: String,
    pub types: Vec<String>,
}

/// Find labels produced by more than one distinct source type.
///
/// `sanitize` is [`entity_label`] or [`relationship_label`].
pub fn find_collisions<'a>(
    types: impl IntoIterator<Item = &'a str>,
    sanitize: fn(&str) -> String,
) -> Vec<LabelCollision> {
    let mut by_label: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for t in types {
        let sources = by_label.entry(sanitize(t)).or_default();
        if !sources.iter().any(|s| s == t) {
            sources.push(t.to_string());
        }
    }

    by_label
        .into_iter()
        .filter(|(_, types)| types.len() > 1)
        .map(|(label, types)| LabelCollision { label, types })
        .collect()
}

//! Dry-run validation of an import document.
//!
//! Reports what an import would skip or silently merge, without touching
//! the store.

use std::collections::HashSet;

use serde::Serialize;

use kgrag_core::label::{entity_label, find_collisions, relationship_label, LabelCollision};
use kgrag_core::types::{DocumentWarnings, KnowledgeDocument, MissingField};

/// A record that fails validation, by position in its array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidRecord {
    pub index: usize,
    pub field: MissingField,
}

/// A relationship whose endpoint names no entity in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingRelationship {
    pub index: usize,
    pub missing_endpoint: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCheck {
    pub entity_count: usize,
    pub relationship_count: usize,
    pub warnings: DocumentWarnings,
    pub invalid_entities: Vec<InvalidRecord>,
    pub invalid_relationships: Vec<InvalidRecord>,
    pub duplicate_names: Vec<String>,
    pub dangling_relationships: Vec<DanglingRelationship>,
    pub entity_label_collisions: Vec<LabelCollision>,
    pub relationship_label_collisions: Vec<LabelCollision>,
}

impl DocumentCheck {
    /// Whether an import of this document would create every record as written.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
            && self.invalid_entities.is_empty()
            && self.invalid_relationships.is_empty()
            && self.duplicate_names.is_empty()
            && self.dangling_relationships.is_empty()
            && self.entity_label_collisions.is_empty()
            && self.relationship_label_collisions.is_empty()
    }
}

pub fn check_document(doc: &KnowledgeDocument, warnings: DocumentWarnings) -> DocumentCheck {
    let mut check = DocumentCheck {
        entity_count: doc.entities.len(),
        relationship_count: doc.relationships.len(),
        warnings,
        ..Default::default()
    };

    let mut names = HashSet::new();
    for (index, entity) in doc.entities.iter().enumerate() {
        if let Err(field) = entity.validate() {
            check.invalid_entities.push(InvalidRecord { index, field });
            continue;
        }
        if !names.insert(entity.name.as_str())
            && !check.duplicate_names.contains(&entity.name)
        {
            check.duplicate_names.push(entity.name.clone());
        }
    }

    let mut rel_types = Vec::new();
    for (index, raw) in doc.relationships.iter().enumerate() {
        let rel = match raw.normalize() {
            Ok(rel) => rel,
            Err(field) => {
                check.invalid_relationships.push(InvalidRecord { index, field });
                continue;
            }
        };
        for endpoint in [&rel.from, &rel.to] {
            if !names.contains(endpoint.as_str()) {
                check.dangling_relationships.push(DanglingRelationship {
                    index,
                    missing_endpoint: endpoint.clone(),
                });
                break;
            }
        }
        rel_types.push(rel.rel_type);
    }

    check.entity_label_collisions = find_collisions(
        doc.entities
            .iter()
            .filter(|e| e.validate().is_ok())
            .map(|e| e.entity_type.as_str()),
        entity_label,
    );
    check.relationship_label_collisions =
        find_collisions(rel_types.iter().map(String::as_str), relationship_label);

    check
}

//! Core domain types for the kgrag knowledge graph.
//!
//! These types describe what the loader writes into the graph, what the
//! retrieval pipeline reads back out of it, and the JSON shapes exchanged
//! with callers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Entities ──────────────────────────────────────────────────────

/// A named node in the knowledge graph. Identity is `name`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entity {
    #[serde(default)]
    pub name: String,
    /// Category, stored verbatim. The structural label derived from it is lossy.
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The description, treating an empty string as absent.
    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }

    /// Check that the fields required for creation are present.
    pub fn validate(&self) -> Result<(), MissingField> {
        if self.name.is_empty() {
            return Err(MissingField::Name);
        }
        if self.entity_type.is_empty() {
            return Err(MissingField::Type);
        }
        Ok(())
    }
}

// ── Relationships ─────────────────────────────────────────────────

/// A directed, typed edge between two existing entities (canonical shape).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Relationship {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub rel_type: String,
}

impl Relationship {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        rel_type: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            rel_type: rel_type.into(),
        }
    }
}

/// A relationship record as it appears in an import document.
///
/// Two field conventions are accepted: `{from, to, type}` and
/// `{subject, predicate, object}`. When both are present the
/// subject/predicate/object fields win.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawRelationship {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub rel_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
}

impl RawRelationship {
    /// Resolve either field convention into the canonical shape.
    pub fn normalize(&self) -> Result<Relationship, MissingField> {
        let from = pick(&self.subject, &self.from).ok_or(MissingField::From)?;
        let to = pick(&self.object, &self.to).ok_or(MissingField::To)?;
        let rel_type = pick(&self.predicate, &self.rel_type).ok_or(MissingField::Type)?;
        Ok(Relationship::new(from, to, rel_type))
    }

    /// Best-effort key for reporting, even when fields are missing.
    pub fn describe(&self) -> String {
        let part = |primary: &Option<String>, alt: &Option<String>| {
            pick(primary, alt).unwrap_or("?").to_string()
        };
        format!(
            "{} -[{}]-> {}",
            part(&self.subject, &self.from),
            part(&self.predicate, &self.rel_type),
            part(&self.object, &self.to)
        )
    }
}

impl From<Relationship> for RawRelationship {
    fn from(rel: Relationship) -> Self {
        Self {
            from: Some(rel.from),
            to: Some(rel.to),
            rel_type: Some(rel.rel_type),
            ..Default::default()
        }
    }
}

fn pick<'a>(primary: &'a Option<String>, alt: &'a Option<String>) -> Option<&'a str> {
    primary
        .as_deref()
        .filter(|s| !s.is_empty())
        .or_else(|| alt.as_deref().filter(|s| !s.is_empty()))
}

/// A required field that is absent or empty on an import record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingField {
    Name,
    Type,
    From,
    To,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = match self {
            Self::Name => "name",
            Self::Type => "type",
            Self::From => "from/subject",
            Self::To => "to/object",
        };
        write!(f, "missing field: {field}")
    }
}

// ── Import Document ───────────────────────────────────────────────

/// The at-rest import format.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnowledgeDocument {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
}

/// Structural problems found while reading a document. None of them are fatal.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DocumentWarnings {
    pub missing_entities: bool,
    pub missing_relationships: bool,
    /// Positions of array elements that were not JSON objects of the right shape.
    pub malformed_entities: Vec<usize>,
    pub malformed_relationships: Vec<usize>,
}

impl DocumentWarnings {
    pub fn is_empty(&self) -> bool {
        !self.missing_entities
            && !self.missing_relationships
            && self.malformed_entities.is_empty()
            && self.malformed_relationships.is_empty()
    }
}

impl KnowledgeDocument {
    pub fn new(entities: Vec<Entity>, relationships: Vec<Relationship>) -> Self {
        Self {
            entities,
            relationships: relationships.into_iter().map(RawRelationship::from).collect(),
        }
    }

    /// Parse a document leniently.
    ///
    /// Invalid JSON syntax is an error. A missing or non-array `entities` /
    /// `relationships` member is read as empty. Array elements of the wrong
    /// shape are kept as empty records so they still count toward totals and
    /// fail validation at import time.
    pub fn from_slice(bytes: &[u8]) -> Result<(Self, DocumentWarnings), serde_json::Error> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        Ok(Self::from_value(value))
    }

    pub fn from_value(value: serde_json::Value) -> (Self, DocumentWarnings) {
        let mut warnings = DocumentWarnings::default();

        let entities = match value.get("entities").and_then(|v| v.as_array()) {
            Some(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    serde_json::from_value::<Entity>(item.clone()).unwrap_or_else(|_| {
                        warnings.malformed_entities.push(i);
                        Entity::default()
                    })
                })
                .collect(),
            None => {
                warnings.missing_entities = true;
                Vec::new()
            }
        };

        let relationships = match value.get("relationships").and_then(|v| v.as_array()) {
            Some(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    serde_json::from_value::<RawRelationship>(item.clone()).unwrap_or_else(|_| {
                        warnings.malformed_relationships.push(i);
                        RawRelationship::default()
                    })
                })
                .collect(),
            None => {
                warnings.missing_relationships = true;
                Vec::new()
            }
        };

        (
            Self {
                entities,
                relationships,
            },
            warnings,
        )
    }
}

// ── Retrieval Context ─────────────────────────────────────────────

/// A relationship normalized to edge-origin → edge-destination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RelationshipTriple {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub rel_type: String,
}

impl RelationshipTriple {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        rel_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            rel_type: rel_type.into(),
        }
    }
}

/// Grounding material assembled for one question. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub entities: Vec<Entity>,
    pub relationships: Vec<RelationshipTriple>,
    pub related_entities: Vec<Entity>,
}

impl Context {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty() && self.related_entities.is_empty()
    }
}

/// The result of answering one question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub answer: String,
    pub context: Context,
    pub rendered_context: String,
}

// ── Import Report ─────────────────────────────────────────────────

/// Which kind of import record an outcome refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Entity,
    Relationship,
}

/// A single record that could not be created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemFailure {
    pub kind: ItemKind,
    pub key: String,
    pub reason: String,
}

impl ItemFailure {
    pub fn new(kind: ItemKind, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Per-record result of a bulk creation step.
pub type ItemOutcome = Result<(), ItemFailure>;

/// Node and relationship totals read back from the store.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphCounts {
    pub entities: i64,
    pub relationships: i64,
}

/// Summary of one full-replace import run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub entities_created: usize,
    pub entities_total: usize,
    pub relationships_created: usize,
    pub relationships_total: usize,
    pub failures: Vec<ItemFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<GraphCounts>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportReport {
    pub fn new(entities_total: usize, relationships_total: usize) -> Self {
        Self {
            entities_created: 0,
            entities_total,
            relationships_created: 0,
            relationships_total,
            failures: Vec::new(),
            document_digest: None,
            verified: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Fold one entity outcome into the counters.
    pub fn record_entity(&mut self, outcome: ItemOutcome) {
        match outcome {
            Ok(()) => self.entities_created += 1,
            Err(failure) => self.failures.push(failure),
        }
    }

    /// Fold one relationship outcome into the counters.
    pub fn record_relationship(&mut self, outcome: ItemOutcome) {
        match outcome {
            Ok(()) => self.relationships_created += 1,
            Err(failure) => self.failures.push(failure),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.entities_created == self.entities_total
            && self.relationships_created == self.relationships_total
    }

    pub fn finish(&mut self) {
        self.completed_at = Some(Utc::now());
    }
}

// ── Read-side Views ───────────────────────────────────────────────

/// A bounded view of the whole graph for rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphSnapshot {
    pub nodes: Vec<SnapshotNode>,
    pub links: Vec<SnapshotLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotLink {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub link_type: String,
}

/// One stored edge with both endpoint types, as returned by snapshot reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRow {
    pub source: String,
    pub source_type: String,
    pub target: String,
    pub target_type: String,
    pub rel_type: String,
}

impl GraphSnapshot {
    /// Build a snapshot from edge rows, deduplicating nodes by name in first-seen order.
    pub fn from_edges(rows: impl IntoIterator<Item = EdgeRow>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let mut snapshot = Self::default();

        for row in rows {
            if seen.insert(row.source.clone()) {
                snapshot.nodes.push(SnapshotNode {
                    id: row.source.clone(),
                    node_type: row.source_type,
                });
            }
            if seen.insert(row.target.clone()) {
                snapshot.nodes.push(SnapshotNode {
                    id: row.target.clone(),
                    node_type: row.target_type,
                });
            }
            snapshot.links.push(SnapshotLink {
                source: row.source,
                target: row.target,
                link_type: row.rel_type,
            });
        }

        snapshot
    }
}

/// An entity together with its direct relations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityDetails {
    pub entity: Entity,
    pub outgoing: Vec<OutgoingRelation>,
    pub incoming: Vec<IncomingRelation>,
}

/// A relation starting at the detailed entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutgoingRelation {
    pub target: String,
    #[serde(rename = "type")]
    pub rel_type: String,
}

/// A relation ending at the detailed entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncomingRelation {
    pub source: String,
    #[serde(rename = "type")]
    pub rel_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_wire_format_uses_type_key() {
        let e = Entity::new("AI", "Concept").with_description("Artificial intelligence");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "Concept");
        assert_eq!(json["description"], "Artificial intelligence");

        let bare: Entity = serde_json::from_str(r#"{"name":"ML","type":"Technology"}"#).unwrap();
        assert_eq!(bare.description, None);
    }

    #[test]
    fn empty_description_is_absent() {
        let e = Entity::new("AI", "Concept").with_description("");
        assert_eq!(e.description_text(), None);
    }

    #[test]
    fn entity_validation() {
        assert!(Entity::new("AI", "Concept").validate().is_ok());
        assert_eq!(Entity::new("", "Concept").validate(), Err(MissingField::Name));
        assert_eq!(Entity::new("AI", "").validate(), Err(MissingField::Type));
    }

    #[test]
    fn normalize_from_to_convention() {
        let raw: RawRelationship =
            serde_json::from_str(r#"{"from":"AI","to":"ML","type":"includes"}"#).unwrap();
        assert_eq!(raw.normalize().unwrap(), Relationship::new("AI", "ML", "includes"));
    }

    #[test]
    fn normalize_subject_predicate_object_convention() {
        let raw: RawRelationship =
            serde_json::from_str(r#"{"subject":"AI","predicate":"includes","object":"ML"}"#)
                .unwrap();
        assert_eq!(raw.normalize().unwrap(), Relationship::new("AI", "ML", "includes"));
    }

    #[test]
    fn normalize_prefers_subject_fields() {
        let raw = RawRelationship {
            from: Some("X".into()),
            subject: Some("AI".into()),
            to: Some("ML".into()),
            rel_type: Some("includes".into()),
            ..Default::default()
        };
        assert_eq!(raw.normalize().unwrap().from, "AI");
    }

    #[test]
    fn normalize_reports_first_missing_field() {
        let raw: RawRelationship = serde_json::from_str(r#"{"from":"AI","type":"x"}"#).unwrap();
        assert_eq!(raw.normalize(), Err(MissingField::To));

        let raw: RawRelationship = serde_json::from_str(r#"{"from":"","to":"ML"}"#).unwrap();
        assert_eq!(raw.normalize(), Err(MissingField::From));
        assert_eq!(raw.describe(), "? -[?]-> ML");
    }

    #[test]
    fn document_missing_arrays_read_as_empty() {
        let (doc, warnings) = KnowledgeDocument::from_slice(br#"{"relations": []}"#).unwrap();
        assert!(doc.entities.is_empty());
        assert!(doc.relationships.is_empty());
        assert!(warnings.missing_entities);
        assert!(warnings.missing_relationships);
    }

    #[test]
    fn document_keeps_malformed_elements_as_placeholders() {
        let (doc, warnings) = KnowledgeDocument::from_slice(
            br#"{"entities": [{"name":"AI","type":"Concept"}, 42], "relationships": "nope"}"#,
        )
        .unwrap();
        assert_eq!(doc.entities.len(), 2);
        assert_eq!(warnings.malformed_entities, vec![1]);
        assert!(doc.entities[1].validate().is_err());
        assert!(warnings.missing_relationships);
    }

    #[test]
    fn document_invalid_json_is_error() {
        assert!(KnowledgeDocument::from_slice(b"{not json").is_err());
    }

    #[test]
    fn context_serializes_camel_case() {
        let ctx = Context {
            entities: vec![Entity::new("ML", "Technology")],
            relationships: vec![RelationshipTriple::new("AI", "ML", "includes")],
            related_entities: vec![Entity::new("AI", "Concept")],
        };
        let json = serde_json::to_value(&ctx).unwrap();
        assert!(json.get("relatedEntities").is_some());
        assert_eq!(json["relationships"][0]["type"], "includes");
    }

    #[test]
    fn report_folds_outcomes() {
        let mut report = ImportReport::new(2, 1);
        report.record_entity(Ok(()));
        report.record_entity(Err(ItemFailure::new(ItemKind::Entity, "B", "boom")));
        report.record_relationship(Ok(()));
        assert_eq!(report.entities_created, 1);
        assert_eq!(report.relationships_created, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(!report.is_complete());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entitiesCreated"], 1);
        assert_eq!(json["relationshipsTotal"], 1);
    }

    #[test]
    fn entity_details_wire_format() {
        let details = EntityDetails {
            entity: Entity::new("ML", "Technology"),
            outgoing: vec![OutgoingRelation {
                target: "DL".into(),
                rel_type: "includes".into(),
            }],
            incoming: vec![IncomingRelation {
                source: "AI".into(),
                rel_type: "includes".into(),
            }],
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["outgoing"][0]["target"], "DL");
        assert_eq!(json["outgoing"][0]["type"], "includes");
        assert_eq!(json["incoming"][0]["source"], "AI");
    }

    #[test]
    fn snapshot_dedupes_nodes() {
        let row = |s: &str, t: &str| EdgeRow {
            source: s.into(),
            source_type: "Concept".into(),
            target: t.into(),
            target_type: "Technology".into(),
            rel_type: "includes".into(),
        };
        let snapshot = GraphSnapshot::from_edges(vec![row("AI", "ML"), row("AI", "DL")]);
        assert_eq!(snapshot.nodes.len(), 3);
        assert_eq!(snapshot.links.len(), 2);
        assert_eq!(snapshot.nodes[0].id, "AI");
    }
}

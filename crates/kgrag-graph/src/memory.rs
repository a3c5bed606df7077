//! In-memory implementation of [`KnowledgeStore`].
//!
//! Mirrors the Cypher semantics of the Neo4j implementation (CREATE without
//! uniqueness enforcement, substring matching, store-return order equal to
//! insertion order) so loader and retrieval behaviour can be exercised
//! without a database. Clones share the same underlying graph.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use kgrag_core::types::{
    EdgeRow, Entity, EntityDetails, GraphCounts, IncomingRelation, OutgoingRelation, Relationship,
};

use crate::client::GraphError;
use crate::store::{Direction, KnowledgeStore, LabelMode, NeighborRow};

#[derive(Debug, Clone)]
struct StoredEntity {
    entity: Entity,
    labels: Vec<String>,
}

#[derive(Debug, Clone)]
struct StoredEdge {
    from: String,
    to: String,
    label: String,
    rel_type: String,
}

#[derive(Debug, Default)]
struct MemoryGraph {
    entities: Vec<StoredEntity>,
    edges: Vec<StoredEdge>,
    indexes: HashSet<&'static str>,
}

impl MemoryGraph {
    fn find(&self, name: &str) -> Option<&StoredEntity> {
        self.entities.iter().find(|e| e.entity.name == name)
    }
}

#[derive(Debug, Default)]
struct Behaviour {
    offline: bool,
    without_label_procedure: bool,
    rejected: HashSet<String>,
    procedure_calls: usize,
}

/// An in-memory knowledge graph.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    graph: Arc<RwLock<MemoryGraph>>,
    behaviour: Arc<RwLock<Behaviour>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store on which the label-attachment procedure is unavailable.
    pub fn without_label_procedure() -> Self {
        Self {
            graph: Arc::default(),
            behaviour: Arc::new(RwLock::new(Behaviour {
                without_label_procedure: true,
                ..Default::default()
            })),
        }
    }

    /// Make every subsequent operation fail as if the store were unreachable.
    pub async fn set_offline(&self, offline: bool) {
        self.behaviour.write().await.offline = offline;
    }

    /// Make creation of the named entity fail.
    pub async fn reject_entity(&self, name: &str) {
        self.behaviour.write().await.rejected.insert(name.to_string());
    }

    /// Structural labels attached to the named entity.
    pub async fn labels_of(&self, name: &str) -> Option<Vec<String>> {
        self.graph.read().await.find(name).map(|e| e.labels.clone())
    }

    /// Structural label of every stored relationship, in creation order.
    pub async fn relationship_labels(&self) -> Vec<String> {
        self.graph
            .read()
            .await
            .edges
            .iter()
            .map(|e| e.label.clone())
            .collect()
    }

    /// How many entity creations asked for the label procedure.
    pub async fn label_procedure_calls(&self) -> usize {
        self.behaviour.read().await.procedure_calls
    }

    /// Whether the named lookup index has been provisioned.
    pub async fn has_index(&self, name: &str) -> bool {
        self.graph.read().await.indexes.contains(name)
    }

    async fn check_online(&self) -> Result<(), GraphError> {
        if self.behaviour.read().await.offline {
            return Err(GraphError::Connection("memory store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KnowledgeStore for MemoryStore {
    async fn verify_connectivity(&self) -> Result<(), GraphError> {
        self.check_online().await
    }

    async fn clear(&self) -> Result<(), GraphError> {
        self.check_online().await?;
        let mut graph = self.graph.write().await;
        graph.entities.clear();
        graph.edges.clear();
        Ok(())
    }

    async fn create_entity(
        &self,
        entity: &Entity,
        label: &str,
        mode: LabelMode,
    ) -> Result<(), GraphError> {
        self.check_online().await?;
        {
            let mut behaviour = self.behaviour.write().await;
            if mode == LabelMode::Procedure {
                behaviour.procedure_calls += 1;
            }
            if mode == LabelMode::Procedure && behaviour.without_label_procedure {
                return Err(GraphError::Capability(
                    "There is no procedure with the name `apoc.create.addLabels`".to_string(),
                ));
            }
            if behaviour.rejected.contains(&entity.name) {
                return Err(GraphError::Constraint(format!(
                    "entity {} rejected by store",
                    entity.name
                )));
            }
        }

        let mut stored = entity.clone();
        stored.description = entity.description_text().map(str::to_string);
        self.graph.write().await.entities.push(StoredEntity {
            entity: stored,
            labels: vec!["Entity".to_string(), label.to_string()],
        });
        Ok(())
    }

    async fn create_relationship(
        &self,
        relationship: &Relationship,
        label: &str,
    ) -> Result<bool, GraphError> {
        self.check_online().await?;
        let mut graph = self.graph.write().await;
        if graph.find(&relationship.from).is_none() || graph.find(&relationship.to).is_none() {
            return Ok(false);
        }
        graph.edges.push(StoredEdge {
            from: relationship.from.clone(),
            to: relationship.to.clone(),
            label: label.to_string(),
            rel_type: relationship.rel_type.clone(),
        });
        Ok(true)
    }

    async fn ensure_indexes(&self) -> Result<(), GraphError> {
        self.check_online().await?;
        let mut graph = self.graph.write().await;
        graph.indexes.insert("entity_name");
        graph.indexes.insert("entity_type");
        Ok(())
    }

    async fn entities_named_in(&self, text: &str, limit: u32) -> Result<Vec<Entity>, GraphError> {
        self.check_online().await?;
        let haystack = text.to_lowercase();
        let graph = self.graph.read().await;
        Ok(graph
            .entities
            .iter()
            .filter(|e| haystack.contains(&e.entity.name.to_lowercase()))
            .take(limit as usize)
            .map(|e| e.entity.clone())
            .collect())
    }

    async fn entities_containing(
        &self,
        text: &str,
        limit: u32,
    ) -> Result<Vec<Entity>, GraphError> {
        self.check_online().await?;
        let graph = self.graph.read().await;
        Ok(graph
            .entities
            .iter()
            .filter(|e| {
                e.entity
                    .description
                    .as_deref()
                    .unwrap_or_default()
                    .contains(text)
                    || e.entity.name.contains(text)
            })
            .take(limit as usize)
            .map(|e| e.entity.clone())
            .collect())
    }

    async fn neighborhood(
        &self,
        names: &[String],
        limit: u32,
    ) -> Result<Vec<NeighborRow>, GraphError> {
        self.check_online().await?;
        let graph = self.graph.read().await;
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        let mut rows = Vec::new();

        for edge in &graph.edges {
            let mut sides = Vec::with_capacity(2);
            if wanted.contains(edge.from.as_str()) {
                sides.push((&edge.from, &edge.to, Direction::Outgoing));
            }
            if edge.from != edge.to && wanted.contains(edge.to.as_str()) {
                sides.push((&edge.to, &edge.from, Direction::Incoming));
            }

            for (matched, other, direction) in sides {
                let Some(neighbor) = graph.find(other) else {
                    continue;
                };
                rows.push(NeighborRow {
                    matched: matched.clone(),
                    rel_type: edge.rel_type.clone(),
                    neighbor: neighbor.entity.clone(),
                    direction,
                });
            }
        }

        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn edges(&self, limit: u32) -> Result<Vec<EdgeRow>, GraphError> {
        self.check_online().await?;
        let graph = self.graph.read().await;
        let type_of = |name: &str| {
            graph
                .find(name)
                .map(|e| e.entity.entity_type.clone())
                .unwrap_or_default()
        };
        Ok(graph
            .edges
            .iter()
            .take(limit as usize)
            .map(|edge| EdgeRow {
                source: edge.from.clone(),
                source_type: type_of(&edge.from),
                target: edge.to.clone(),
                target_type: type_of(&edge.to),
                rel_type: edge.rel_type.clone(),
            })
            .collect())
    }

    async fn list_entities(&self, limit: u32) -> Result<Vec<Entity>, GraphError> {
        self.check_online().await?;
        let graph = self.graph.read().await;
        Ok(graph
            .entities
            .iter()
            .take(limit as usize)
            .map(|e| e.entity.clone())
            .collect())
    }

    async fn search_entities(&self, term: &str, limit: u32) -> Result<Vec<Entity>, GraphError> {
        self.check_online().await?;
        let needle = term.to_lowercase();
        let graph = self.graph.read().await;
        Ok(graph
            .entities
            .iter()
            .filter(|e| {
                e.entity.name.to_lowercase().contains(&needle)
                    || e.entity
                        .description
                        .as_deref()
                        .unwrap_or_default()
                        .to_lowercase()
                        .contains(&needle)
            })
            .take(limit as usize)
            .map(|e| e.entity.clone())
            .collect())
    }

    async fn entity_details(&self, name: &str) -> Result<Option<EntityDetails>, GraphError> {
        self.check_online().await?;
        let graph = self.graph.read().await;
        let Some(stored) = graph.find(name) else {
            return Ok(None);
        };

        Ok(Some(EntityDetails {
            entity: stored.entity.clone(),
            outgoing: graph
                .edges
                .iter()
                .filter(|e| e.from == name)
                .map(|e| OutgoingRelation {
                    target: e.to.clone(),
                    rel_type: e.rel_type.clone(),
                })
                .collect(),
            incoming: graph
                .edges
                .iter()
                .filter(|e| e.to == name)
                .map(|e| IncomingRelation {
                    source: e.from.clone(),
                    rel_type: e.rel_type.clone(),
                })
                .collect(),
        }))
    }

    async fn counts(&self) -> Result<GraphCounts, GraphError> {
        self.check_online().await?;
        let graph = self.graph.read().await;
        Ok(GraphCounts {
            entities: graph.entities.len() as i64,
            relationships: graph.edges.len() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (name, ty) in [("AI", "Concept"), ("ML", "Technology"), ("DL", "Technology")] {
            store
                .create_entity(&Entity::new(name, ty), ty, LabelMode::Inline)
                .await
                .unwrap();
        }
        store
            .create_relationship(&Relationship::new("AI", "ML", "includes"), "INCLUDES")
            .await
            .unwrap();
        store
            .create_relationship(&Relationship::new("ML", "DL", "includes"), "INCLUDES")
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_relationship_requires_both_endpoints() {
        let store = seeded().await;
        let created = store
            .create_relationship(&Relationship::new("AI", "Ghost", "haunts"), "HAUNTS")
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(store.counts().await.unwrap().relationships, 2);
    }

    #[tokio::test]
    async fn test_named_in_is_case_insensitive() {
        let store = seeded().await;
        let found = store.entities_named_in("what is ml?", 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "ML");
    }

    #[tokio::test]
    async fn test_neighborhood_reports_direction() {
        let store = seeded().await;
        let rows = store.neighborhood(&["ML".to_string()], 50).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].neighbor.name, "AI");
        assert_eq!(rows[0].direction, Direction::Incoming);
        assert_eq!(rows[1].neighbor.name, "DL");
        assert_eq!(rows[1].direction, Direction::Outgoing);
    }

    #[tokio::test]
    async fn test_neighborhood_respects_limit() {
        let store = seeded().await;
        let rows = store.neighborhood(&["ML".to_string()], 1).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_procedure_unavailable() {
        let store = MemoryStore::without_label_procedure();
        let err = store
            .create_entity(&Entity::new("AI", "Concept"), "Concept", LabelMode::Procedure)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Capability(_)));
        store
            .create_entity(&Entity::new("AI", "Concept"), "Concept", LabelMode::Inline)
            .await
            .unwrap();
        assert_eq!(
            store.labels_of("AI").await.unwrap(),
            vec!["Entity".to_string(), "Concept".to_string()]
        );
    }

    #[tokio::test]
    async fn test_offline_store_reports_connectivity() {
        let store = seeded().await;
        store.set_offline(true).await;
        let err = store.verify_connectivity().await.unwrap_err();
        assert!(err.is_connectivity());
    }

    #[tokio::test]
    async fn test_entity_details() {
        let store = seeded().await;
        let details = store.entity_details("ML").await.unwrap().unwrap();
        assert_eq!(details.outgoing[0].target, "DL");
        assert_eq!(details.incoming[0].source, "AI");
        assert!(store.entity_details("Nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let store = seeded().await;
        store.clear().await.unwrap();
        assert_eq!(store.counts().await.unwrap(), GraphCounts::default());
    }
}

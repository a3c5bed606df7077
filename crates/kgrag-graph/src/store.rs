//! The store seam used by the loader and the retrieval pipeline.
//!
//! [`KnowledgeStore`] names every graph operation the rest of kgrag needs.
//! [`GraphClient`] implements it against Neo4j; [`crate::MemoryStore`]
//! implements it in memory with the same matching semantics.

use async_trait::async_trait;

use kgrag_core::types::{EdgeRow, Entity, EntityDetails, GraphCounts, Relationship};

use crate::client::{GraphClient, GraphError};

/// How the sanitized type label is attached to a new entity node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelMode {
    /// Create the node, then attach the label with `apoc.create.addLabels`.
    Procedure,
    /// Create the node with the label inlined in the CREATE statement.
    Inline,
}

/// Which end of the relationship the matched entity sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The matched entity is the relationship's start node.
    Outgoing,
    Incoming,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outgoing => "outgoing",
            Self::Incoming => "incoming",
        }
    }

    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("outgoing") {
            Self::Outgoing
        } else {
            Self::Incoming
        }
    }
}

/// One (matched entity, relationship, neighbor) row from a one-hop expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborRow {
    /// Name of the entity the expansion started from.
    pub matched: String,
    pub rel_type: String,
    pub neighbor: Entity,
    pub direction: Direction,
}

/// Graph operations required by the loader and the answering pipeline.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Open a session and answer a trivial statement.
    async fn verify_connectivity(&self) -> Result<(), GraphError>;

    /// Detach-delete every node in the store.
    async fn clear(&self) -> Result<(), GraphError>;

    /// Create one entity node carrying the given structural label.
    async fn create_entity(
        &self,
        entity: &Entity,
        label: &str,
        mode: LabelMode,
    ) -> Result<(), GraphError>;

    /// Create one relationship between existing entities.
    ///
    /// Returns `Ok(false)` when either endpoint does not exist.
    async fn create_relationship(
        &self,
        relationship: &Relationship,
        label: &str,
    ) -> Result<bool, GraphError>;

    /// Provision name and type lookup indexes if absent.
    async fn ensure_indexes(&self) -> Result<(), GraphError>;

    /// Entities whose name occurs in `text`, compared case-insensitively.
    async fn entities_named_in(&self, text: &str, limit: u32) -> Result<Vec<Entity>, GraphError>;

    /// Entities whose description or name contains `text` verbatim (case-sensitive).
    async fn entities_containing(&self, text: &str, limit: u32)
        -> Result<Vec<Entity>, GraphError>;

    /// Relationships touching any of `names`, in either direction.
    async fn neighborhood(
        &self,
        names: &[String],
        limit: u32,
    ) -> Result<Vec<NeighborRow>, GraphError>;

    /// Stored edges with endpoint types, up to `limit`.
    async fn edges(&self, limit: u32) -> Result<Vec<EdgeRow>, GraphError>;

    async fn list_entities(&self, limit: u32) -> Result<Vec<Entity>, GraphError>;

    /// Entities whose name or description contains `term`, case-insensitively.
    async fn search_entities(&self, term: &str, limit: u32) -> Result<Vec<Entity>, GraphError>;

    async fn entity_details(&self, name: &str) -> Result<Option<EntityDetails>, GraphError>;

    async fn counts(&self) -> Result<GraphCounts, GraphError>;
}

#[async_trait]
impl KnowledgeStore for GraphClient {
    async fn verify_connectivity(&self) -> Result<(), GraphError> {
        GraphClient::verify_connectivity(self).await
    }

    async fn clear(&self) -> Result<(), GraphError> {
        self.clear_graph().await
    }

    async fn create_entity(
        &self,
        entity: &Entity,
        label: &str,
        mode: LabelMode,
    ) -> Result<(), GraphError> {
        match mode {
            LabelMode::Procedure => self.create_entity_with_procedure(entity, label).await,
            LabelMode::Inline => self.create_entity_inline(entity, label).await,
        }
    }

    async fn create_relationship(
        &self,
        relationship: &Relationship,
        label: &str,
    ) -> Result<bool, GraphError> {
        GraphClient::create_relationship(self, relationship, label).await
    }

    async fn ensure_indexes(&self) -> Result<(), GraphError> {
        GraphClient::ensure_indexes(self).await
    }

    async fn entities_named_in(&self, text: &str, limit: u32) -> Result<Vec<Entity>, GraphError> {
        GraphClient::entities_named_in(self, text, limit).await
    }

    async fn entities_containing(
        &self,
        text: &str,
        limit: u32,
    ) -> Result<Vec<Entity>, GraphError> {
        GraphClient::entities_containing(self, text, limit).await
    }

    async fn neighborhood(
        &self,
        names: &[String],
        limit: u32,
    ) -> Result<Vec<NeighborRow>, GraphError> {
        GraphClient::neighborhood(self, names, limit).await
    }

    async fn edges(&self, limit: u32) -> Result<Vec<EdgeRow>, GraphError> {
        GraphClient::edges(self, limit).await
    }

    async fn list_entities(&self, limit: u32) -> Result<Vec<Entity>, GraphError> {
        GraphClient::list_entities(self, limit).await
    }

    async fn search_entities(&self, term: &str, limit: u32) -> Result<Vec<Entity>, GraphError> {
        GraphClient::search_entities(self, term, limit).await
    }

    async fn entity_details(&self, name: &str) -> Result<Option<EntityDetails>, GraphError> {
        GraphClient::entity_details(self, name).await
    }

    async fn counts(&self) -> Result<GraphCounts, GraphError> {
        GraphClient::counts(self).await
    }
}

//! Write operations for the knowledge graph.
//!
//! Imports are full-replace: the loader clears the store and then creates
//! every node and relationship afresh, so these statements use CREATE rather
//! than MERGE. Structural labels are interpolated into the Cypher text and
//! must already be sanitized (see `kgrag_core::label`).

use neo4rs::query;

use kgrag_core::types::{Entity, Relationship};

use crate::client::{GraphClient, GraphError};

impl GraphClient {
    /// Detach-delete every node and relationship.
    pub async fn clear_graph(&self) -> Result<(), GraphError> {
        self.run(query("MATCH (n) DETACH DELETE n")).await
    }

    // ── Entities ─────────────────────────────────────────────────

    /// Create an entity and attach its label through APOC.
    ///
    /// Fails with [`GraphError::Capability`] when the APOC procedure is not
    /// installed.
    pub async fn create_entity_with_procedure(
        &self,
        entity: &Entity,
        label: &str,
    ) -> Result<(), GraphError> {
        let q = query(
            "CREATE (e:Entity {name: $name, type: $type, description: $description})
             WITH e
             CALL apoc.create.addLabels(e, [$label]) YIELD node
             RETURN node",
        )
        .param("name", entity.name.clone())
        .param("type", entity.entity_type.clone())
        .param("description", entity.description.clone().unwrap_or_default())
        .param("label", label.to_string());

        self.run(q).await
    }

    /// Create an entity with its label inlined in a single CREATE.
    pub async fn create_entity_inline(
        &self,
        entity: &Entity,
        label: &str,
    ) -> Result<(), GraphError> {
        let cypher = format!(
            "CREATE (e:Entity:`{label}` {{name: $name, type: $type, description: $description}})"
        );

        let q = query(&cypher)
            .param("name", entity.name.clone())
            .param("type", entity.entity_type.clone())
            .param("description", entity.description.clone().unwrap_or_default());

        self.run(q).await
    }

    // ── Relationships ────────────────────────────────────────────

    /// Create a relationship between two entities looked up by exact name.
    ///
    /// Returns `false` when either endpoint is missing; nothing is written then.
    pub async fn create_relationship(
        &self,
        relationship: &Relationship,
        label: &str,
    ) -> Result<bool, GraphError> {
        let cypher = format!(
            "MATCH (from:Entity {{name: $from}})
             MATCH (to:Entity {{name: $to}})
             CREATE (from)-[r:`{label}` {{type: $type}}]->(to)
             RETURN count(r) AS created"
        );

        let q = query(&cypher)
            .param("from", relationship.from.clone())
            .param("to", relationship.to.clone())
            .param("type", relationship.rel_type.clone());

        match self.query_one(q).await? {
            Some(row) => Ok(row.get::<i64>("created").unwrap_or(0) > 0),
            None => Ok(false),
        }
    }

    // ── Schema ───────────────────────────────────────────────────

    /// Create the name and type lookup indexes if they do not exist.
    pub async fn ensure_indexes(&self) -> Result<(), GraphError> {
        self.run(query(
            "CREATE INDEX entity_name IF NOT EXISTS FOR (e:Entity) ON (e.name)",
        ))
        .await?;
        self.run(query(
            "CREATE INDEX entity_type IF NOT EXISTS FOR (e:Entity) ON (e.type)",
        ))
        .await
    }
}


//! Read operations for the knowledge graph.
//!
//! Every read returns plain columns (`name`, `type`, `description`, ...)
//! rather than whole nodes, so row decoding stays independent of node labels.

use neo4rs::{query, Row};

use kgrag_core::types::{
    EdgeRow, Entity, EntityDetails, GraphCounts, IncomingRelation, OutgoingRelation,
};

use crate::client::{GraphClient, GraphError};
use crate::store::{Direction, NeighborRow};

impl GraphClient {
    // ── Mention Lookups ──────────────────────────────────────────

    /// Entities whose name occurs in `text`, compared case-insensitively.
    pub async fn entities_named_in(
        &self,
        text: &str,
        limit: u32,
    ) -> Result<Vec<Entity>, GraphError> {
        let q = query(
            "MATCH (e:Entity)
             WHERE toLower($text) CONTAINS toLower(e.name)
             RETURN e.name AS name, e.type AS type, e.description AS description
             LIMIT $limit",
        )
        .param("text", text.to_string())
        .param("limit", limit as i64);

        self.entity_rows(q).await
    }

    /// Entities whose description or name contains `text` verbatim.
    pub async fn entities_containing(
        &self,
        text: &str,
        limit: u32,
    ) -> Result<Vec<Entity>, GraphError> {
        let q = query(
            "MATCH (e:Entity)
             WHERE e.description CONTAINS $text OR e.name CONTAINS $text
             RETURN e.name AS name, e.type AS type, e.description AS description
             LIMIT $limit",
        )
        .param("text", text.to_string())
        .param("limit", limit as i64);

        self.entity_rows(q).await
    }

    // ── Neighbor Queries ─────────────────────────────────────────

    /// One-hop expansion from the named entities, any direction.
    pub async fn neighborhood(
        &self,
        names: &[String],
        limit: u32,
    ) -> Result<Vec<NeighborRow>, GraphError> {
        let q = query(
            "MATCH (e:Entity)-[r]-(related:Entity)
             WHERE e.name IN $names
             RETURN e.name AS matched,
                    coalesce(r.type, type(r)) AS rel_type,
                    related.name AS name, related.type AS type,
                    related.description AS description,
                    CASE WHEN startNode(r) = e THEN 'outgoing' ELSE 'incoming' END AS direction
             LIMIT $limit",
        )
        .param("names", names.to_vec())
        .param("limit", limit as i64);

        let rows = self.query_rows(q).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let direction: String = row.get("direction").unwrap_or_default();
            results.push(NeighborRow {
                matched: row.get("matched").unwrap_or_default(),
                rel_type: row.get("rel_type").unwrap_or_default(),
                neighbor: row_to_entity(&row)?,
                direction: Direction::parse(&direction),
            });
        }
        Ok(results)
    }

    /// Stored edges with both endpoint types, for snapshots.
    pub async fn edges(&self, limit: u32) -> Result<Vec<EdgeRow>, GraphError> {
        let q = query(
            "MATCH (n:Entity)-[r]->(m:Entity)
             RETURN n.name AS source, n.type AS source_type,
                    m.name AS target, m.type AS target_type,
                    coalesce(r.type, type(r)) AS rel_type
             LIMIT $limit",
        )
        .param("limit", limit as i64);

        let rows = self.query_rows(q).await?;
        Ok(rows
            .iter()
            .map(|row| EdgeRow {
                source: row.get("source").unwrap_or_default(),
                source_type: row.get("source_type").unwrap_or_default(),
                target: row.get("target").unwrap_or_default(),
                target_type: row.get("target_type").unwrap_or_default(),
                rel_type: row.get("rel_type").unwrap_or_default(),
            })
            .collect())
    }

    // ── Listing and Search ───────────────────────────────────────

    pub async fn list_entities(&self, limit: u32) -> Result<Vec<Entity>, GraphError> {
        let q = query(
            "MATCH (e:Entity)
             RETURN e.name AS name, e.type AS type, e.description AS description
             LIMIT $limit",
        )
        .param("limit", limit as i64);

        self.entity_rows(q).await
    }

    /// Case-insensitive search over entity names and descriptions.
    pub async fn search_entities(
        &self,
        term: &str,
        limit: u32,
    ) -> Result<Vec<Entity>, GraphError> {
        let q = query(
            "MATCH (e:Entity)
             WHERE toLower(e.name) CONTAINS toLower($term)
                OR toLower(e.description) CONTAINS toLower($term)
             RETURN e.name AS name, e.type AS type, e.description AS description
             LIMIT $limit",
        )
        .param("term", term.to_string())
        .param("limit", limit as i64);

        self.entity_rows(q).await
    }

    /// An entity with its outgoing and incoming relations, read in one session.
    pub async fn entity_details(&self, name: &str) -> Result<Option<EntityDetails>, GraphError> {
        let entity_q = query(
            "MATCH (e:Entity {name: $name})
             RETURN e.name AS name, e.type AS type, e.description AS description
             LIMIT 1",
        )
        .param("name", name.to_string());
        let outgoing_q = query(
            "MATCH (e:Entity {name: $name})-[r]->(t:Entity)
             RETURN t.name AS target, coalesce(r.type, type(r)) AS rel_type",
        )
        .param("name", name.to_string());
        let incoming_q = query(
            "MATCH (s:Entity)-[r]->(e:Entity {name: $name})
             RETURN s.name AS source, coalesce(r.type, type(r)) AS rel_type",
        )
        .param("name", name.to_string());

        self.with_session(move |session| {
            Box::pin(async move {
                let Some(row) = session.one(entity_q).await? else {
                    return Ok(None);
                };
                let entity = row_to_entity(&row)?;
                let outgoing = session.rows(outgoing_q).await?;
                let incoming = session.rows(incoming_q).await?;

                Ok(Some(EntityDetails {
                    entity,
                    outgoing: outgoing
                        .iter()
                        .map(|row| OutgoingRelation {
                            target: row.get("target").unwrap_or_default(),
                            rel_type: row.get("rel_type").unwrap_or_default(),
                        })
                        .collect(),
                    incoming: incoming
                        .iter()
                        .map(|row| IncomingRelation {
                            source: row.get("source").unwrap_or_default(),
                            rel_type: row.get("rel_type").unwrap_or_default(),
                        })
                        .collect(),
                }))
            })
        })
        .await
    }

    /// Total entity and relationship counts.
    pub async fn counts(&self) -> Result<GraphCounts, GraphError> {
        let nodes_q = query("MATCH (n:Entity) RETURN count(n) AS cnt");
        let rels_q = query("MATCH (:Entity)-[r]->(:Entity) RETURN count(r) AS cnt");

        self.with_session(move |session| {
            Box::pin(async move {
                let entities = match session.one(nodes_q).await? {
                    Some(row) => row.get::<i64>("cnt").unwrap_or(0),
                    None => 0,
                };
                let relationships = match session.one(rels_q).await? {
                    Some(row) => row.get::<i64>("cnt").unwrap_or(0),
                    None => 0,
                };
                Ok(GraphCounts {
                    entities,
                    relationships,
                })
            })
        })
        .await
    }

    async fn entity_rows(&self, q: neo4rs::Query) -> Result<Vec<Entity>, GraphError> {
        let rows = self.query_rows(q).await?;
        rows.iter().map(row_to_entity).collect()
    }
}

/// Decode `name`, `type` and `description` columns into an [`Entity`].
///
/// Descriptions are stored as empty strings when absent; they decode to `None`.
fn row_to_entity(row: &Row) -> Result<Entity, GraphError> {
    let name: String = row
        .get("name")
        .map_err(|e| GraphError::Serialization(format!("Failed to get entity name: {e}")))?;
    let entity_type: String = row.get("type").unwrap_or_default();
    let description = row
        .get::<Option<String>>("description")
        .ok()
        .flatten()
        .filter(|d| !d.is_empty());

    Ok(Entity {
        name,
        entity_type,
        description,
    })
}

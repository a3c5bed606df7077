//! One-hop neighborhood expansion around matched entities.

use std::collections::HashSet;

use kgrag_core::types::{Entity, RelationshipTriple};
use kgrag_graph::{Direction, GraphError, KnowledgeStore, NeighborRow};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Triples oriented edge-origin to edge-destination.
    pub relationships: Vec<RelationshipTriple>,
    /// Neighbors, unique by name, in first-seen order.
    pub neighbors: Vec<Entity>,
}

pub async fn expand<S: KnowledgeStore>(
    store: &S,
    names: &[String],
    limit: u32,
) -> Result<Expansion, GraphError> {
    if names.is_empty() {
        return Ok(Expansion::default());
    }
    let rows = store.neighborhood(names, limit).await?;
    tracing::debug!(rows = rows.len(), "Fetched neighborhood");
    Ok(from_rows(rows))
}

/// Orient each row by its stored edge direction, not by which side matched.
pub fn orient(row: &NeighborRow) -> RelationshipTriple {
    match row.direction {
        Direction::Outgoing => {
            RelationshipTriple::new(&row.matched, &row.neighbor.name, &row.rel_type)
        }
        Direction::Incoming => {
            RelationshipTriple::new(&row.neighbor.name, &row.matched, &row.rel_type)
        }
    }
}

fn from_rows(rows: Vec<NeighborRow>) -> Expansion {
    let mut expansion = Expansion::default();
    let mut seen = HashSet::new();
    for row in rows {
        expansion.relationships.push(orient(&row));
        if seen.insert(row.neighbor.name.clone()) {
            expansion.neighbors.push(row.neighbor);
        }
    }
    expansion
}

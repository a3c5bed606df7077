//! Read-side views of the graph that need no generation model.

use kgrag_core::types::GraphSnapshot;
use kgrag_graph::{GraphError, KnowledgeStore};

/// Build a snapshot from at most `edge_limit` stored edges.
///
/// Entities with no relationships do not appear.
pub async fn snapshot<S: KnowledgeStore>(
    store: &S,
    edge_limit: u32,
) -> Result<GraphSnapshot, GraphError> {
    let rows = store.edges(edge_limit).await?;
    let snapshot = GraphSnapshot::from_edges(rows);
    tracing::debug!(
        nodes = snapshot.nodes.len(),
        links = snapshot.links.len(),
        "Built graph snapshot"
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgrag_core::types::{Entity, Relationship};
    use kgrag_graph::{LabelMode, MemoryStore};

    #[tokio::test]
    async fn test_snapshot_is_bounded() {
        let store = MemoryStore::new();
        for name in ["AI", "ML", "DL", "Lonely"] {
            store
                .create_entity(&Entity::new(name, "Concept"), "Concept", LabelMode::Inline)
                .await
                .unwrap();
        }
        for (from, to) in [("AI", "ML"), ("ML", "DL")] {
            store
                .create_relationship(&Relationship::new(from, to, "includes"), "INCLUDES")
                .await
                .unwrap();
        }

        let full = snapshot(&store, 500).await.unwrap();
        assert_eq!(full.nodes.len(), 3);
        assert!(full.nodes.iter().all(|n| n.id != "Lonely"));
        assert_eq!(full.links.len(), 2);

        let bounded = snapshot(&store, 1).await.unwrap();
        assert_eq!(bounded.links.len(), 1);
        assert_eq!(bounded.nodes.len(), 2);
    }
}

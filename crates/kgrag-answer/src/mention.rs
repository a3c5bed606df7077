//! Finding the entities a question talks about.
//!
//! Matching is keyword containment, not semantic search. Results come back
//! in store order and are capped, never ranked.

use serde::Serialize;

use kgrag_core::types::Entity;
use kgrag_graph::{GraphError, KnowledgeStore};

/// Which pass produced the matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    /// Entity name found inside the question, ignoring case.
    Name,
    /// Question found inside an entity's name or description, case-sensitive.
    Fallback,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mentions {
    pub entities: Vec<Entity>,
    pub tier: MatchTier,
}

impl Mentions {
    fn none() -> Self {
        Self {
            entities: Vec::new(),
            tier: MatchTier::None,
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.name.clone()).collect()
    }
}

/// Two-tier name matcher over a [`KnowledgeStore`].
pub struct MentionMatcher<'a, S> {
    store: &'a S,
    limit: u32,
}

impl<'a, S: KnowledgeStore> MentionMatcher<'a, S> {
    pub fn new(store: &'a S, limit: u32) -> Self {
        Self { store, limit }
    }

    pub async fn find(&self, question: &str) -> Result<Mentions, GraphError> {
        if question.trim().is_empty() {
            return Ok(Mentions::none());
        }

        let named = self.store.entities_named_in(question, self.limit).await?;
        if !named.is_empty() {
            tracing::debug!(count = named.len(), "Matched entities by name");
            return Ok(Mentions {
                entities: named,
                tier: MatchTier::Name,
            });
        }

        let loose = self.store.entities_containing(question, self.limit).await?;
        if loose.is_empty() {
            tracing::debug!("No entities mentioned in question");
            return Ok(Mentions::none());
        }
        tracing::debug!(count = loose.len(), "Matched entities by fallback search");
        Ok(Mentions {
            entities: loose,
            tier: MatchTier::Fallback,
        })
    }
}

//! kgrag-answer: Graph-grounded question answering.
//!
//! Finds the entities a question mentions, expands one hop around them,
//! renders the result as grounding text, and asks a chat model to answer
//! from it. Also exposes the read-side views of the graph (snapshot,
//! listing, search, details).

pub mod context;
pub mod error;
pub mod expand;
pub mod llm;
pub mod mention;
pub mod views;

pub use error::{AnsweringError, GenerationError};
pub use llm::{ChatMessage, ChatModel, OpenAiCompatibleClient};
pub use mention::{MatchTier, MentionMatcher};

use tracing::Instrument;
use uuid::Uuid;

use kgrag_core::config::{LlmSettings, RetrievalSettings};
use kgrag_core::types::{Answer, Context, Entity, EntityDetails, GraphCounts, GraphSnapshot};
use kgrag_graph::{GraphError, KnowledgeStore};

/// Returned in place of an answer when any stage fails.
pub const APOLOGY: &str =
    "Sorry, an error occurred while generating the answer. Please try again later.";

pub const DEFAULT_LIST_LIMIT: u32 = 100;
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// The question-answering engine.
pub struct AnswerEngine<S, M> {
    store: S,
    model: M,
    retrieval: RetrievalSettings,
    temperature: f32,
    system_prompt: String,
}

impl<S: KnowledgeStore, M: ChatModel> AnswerEngine<S, M> {
    /// Create an engine with default retrieval caps and generation settings.
    pub fn new(store: S, model: M) -> Self {
        let llm = LlmSettings::default();
        Self {
            store,
            model,
            retrieval: RetrievalSettings::default(),
            temperature: llm.temperature,
            system_prompt: llm.system_prompt,
        }
    }

    pub fn with_retrieval(mut self, retrieval: RetrievalSettings) -> Self {
        self.retrieval = retrieval;
        self
    }

    /// Take temperature and persona prompt from `settings`.
    pub fn with_generation(mut self, settings: &LlmSettings) -> Self {
        self.temperature = settings.temperature;
        self.system_prompt = settings.system_prompt.clone();
        self
    }

    /// Retrieve grounding context for a question without generating.
    ///
    /// Only name matches are expanded. Fallback matches are used as found.
    pub async fn retrieve(&self, question: &str) -> Result<Context, GraphError> {
        let mentions = MentionMatcher::new(&self.store, self.retrieval.mention_limit)
            .find(question)
            .await?;
        tracing::info!(matched = mentions.entities.len(), tier = ?mentions.tier, "Matched entities");

        let expansion = match mentions.tier {
            MatchTier::Name => {
                expand::expand(&self.store, &mentions.names(), self.retrieval.neighbor_limit)
                    .await?
            }
            MatchTier::Fallback | MatchTier::None => expand::Expansion::default(),
        };

        Ok(context::assemble(mentions.entities, expansion))
    }

    /// Answer one question from the graph.
    ///
    /// Any retrieval or generation failure is returned as is.
    pub async fn answer_question(&self, question: &str) -> Result<Answer, AnsweringError> {
        let span = tracing::info_span!("answer", question_id = %Uuid::new_v4());
        self.answer_in_span(question).instrument(span).await
    }

    async fn answer_in_span(&self, question: &str) -> Result<Answer, AnsweringError> {
        let context = self.retrieve(question).await?;
        let rendered_context = context::render(&context);
        tracing::info!(
            entities = context.entities.len(),
            relationships = context.relationships.len(),
            related = context.related_entities.len(),
            "Assembled context"
        );

        let messages = [
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(format!("Context:\n{rendered_context}\n\nQuestion: {question}")),
        ];
        let answer = self.model.chat(&messages, self.temperature).await?;
        tracing::info!(chars = answer.len(), "Generated answer");

        Ok(Answer {
            answer,
            context,
            rendered_context,
        })
    }

    /// Answer one question, replacing any failure with a fixed apology.
    pub async fn answer_or_apologize(&self, question: &str) -> Answer {
        match self.answer_question(question).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!(error = %e, "Answering failed");
                Answer {
                    answer: APOLOGY.to_string(),
                    context: Context::default(),
                    rendered_context: String::new(),
                }
            }
        }
    }

    /// A bounded view of the whole graph for rendering.
    pub async fn snapshot(&self) -> Result<GraphSnapshot, GraphError> {
        views::snapshot(&self.store, self.retrieval.snapshot_edge_limit).await
    }

    pub async fn list_entities(&self, limit: u32) -> Result<Vec<Entity>, GraphError> {
        self.store.list_entities(limit).await
    }

    pub async fn search_entities(&self, term: &str, limit: u32) -> Result<Vec<Entity>, GraphError> {
        self.store.search_entities(term, limit).await
    }

    pub async fn entity_details(&self, name: &str) -> Result<Option<EntityDetails>, GraphError> {
        self.store.entity_details(name).await
    }

    pub async fn graph_counts(&self) -> Result<GraphCounts, GraphError> {
        self.store.counts().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use kgrag_core::types::{Relationship, RelationshipTriple};
    use kgrag_graph::{LabelMode, MemoryStore};

    /// Records the prompt and answers with a fixed string.
    #[derive(Default)]
    struct RecordingModel {
        prompts: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl ChatModel for RecordingModel {
        async fn chat(
            &self,
            messages: &[ChatMessage],
            _temperature: f32,
        ) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(messages.to_vec());
            Ok("ML is a subfield of AI.".to_string())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn chat(&self, _: &[ChatMessage], _: f32) -> Result<String, GenerationError> {
            Err(GenerationError::Status {
                status: 503,
                message: "overloaded".to_string(),
            })
        }
    }

    async fn ai_ml_store() -> MemoryStore {
        let store = MemoryStore::new();
        for e in [
            Entity::new("AI", "Concept").with_description("Artificial intelligence"),
            Entity::new("ML", "Technology"),
        ] {
            store.create_entity(&e, &e.entity_type, LabelMode::Inline).await.unwrap();
        }
        store
            .create_relationship(&Relationship::new("AI", "ML", "includes"), "INCLUDES")
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_what_is_ml() {
        let engine = AnswerEngine::new(ai_ml_store().await, RecordingModel::default());
        let answer = engine.answer_question("What is ML?").await.unwrap();

        assert_eq!(answer.answer, "ML is a subfield of AI.");
        assert_eq!(answer.context.entities[0].name, "ML");
        assert_eq!(
            answer.context.relationships,
            vec![RelationshipTriple::new("AI", "ML", "includes")]
        );
        assert_eq!(answer.context.related_entities[0].name, "AI");
        assert!(answer.rendered_context.contains("- ML (Technology): no description"));
        assert!(answer.rendered_context.contains("AI includes ML"));
        assert!(answer.rendered_context.contains("- AI (Concept): Artificial intelligence"));

        let prompts = engine.model.prompts.lock().unwrap();
        assert_eq!(prompts[0].len(), 2);
        assert_eq!(prompts[0][0].role, llm::Role::System);
        assert!(prompts[0][1].content.contains("Question: What is ML?"));
        assert!(prompts[0][1].content.contains("AI includes ML"));
    }

    #[tokio::test]
    async fn test_dangling_relationship_never_reaches_context() {
        let store = ai_ml_store().await;
        let created = store
            .create_relationship(&Relationship::new("ML", "Quantum", "enables"), "ENABLES")
            .await
            .unwrap();
        assert!(!created);

        let engine = AnswerEngine::new(store, RecordingModel::default());
        let context = engine.retrieve("Tell me about ML").await.unwrap();
        assert!(context
            .relationships
            .iter()
            .all(|t| t.target != "Quantum" && t.source != "Quantum"));
    }

    #[tokio::test]
    async fn test_fallback_match_is_not_expanded() {
        let store = MemoryStore::new();
        for e in [
            Entity::new("Backprop", "Algorithm").with_description("Computes gradients"),
            Entity::new("NeuralNet", "Model"),
        ] {
            store.create_entity(&e, &e.entity_type, LabelMode::Inline).await.unwrap();
        }
        store
            .create_relationship(
                &Relationship::new("NeuralNet", "Backprop", "trained by"),
                "TRAINED_BY",
            )
            .await
            .unwrap();

        let engine = AnswerEngine::new(store, RecordingModel::default());
        let context = engine.retrieve("gradients").await.unwrap();
        assert_eq!(context.entities.len(), 1);
        assert_eq!(context.entities[0].name, "Backprop");
        assert!(context.relationships.is_empty());
        assert!(context.related_entities.is_empty());

        let answer = engine.answer_question("gradients").await.unwrap();
        assert_eq!(
            answer.rendered_context,
            "Relevant entities:\n- Backprop (Algorithm): Computes gradients\n"
        );
    }

    #[tokio::test]
    async fn test_empty_question_has_empty_context() {
        let store = ai_ml_store().await;
        let engine = AnswerEngine::new(store, RecordingModel::default());
        let answer = engine.answer_question("").await.unwrap();
        assert!(answer.context.is_empty());
        assert_eq!(answer.rendered_context, "Relevant entities:\n");
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let engine = AnswerEngine::new(ai_ml_store().await, FailingModel);
        let err = engine.answer_question("What is ML?").await.unwrap_err();
        assert!(matches!(err, AnsweringError::Generation(_)));
    }

    #[tokio::test]
    async fn test_failure_becomes_apology() {
        let engine = AnswerEngine::new(ai_ml_store().await, FailingModel);
        let answer = engine.answer_or_apologize("What is ML?").await;
        assert_eq!(answer.answer, APOLOGY);
        assert!(answer.context.is_empty());

        let store = ai_ml_store().await;
        store.set_offline(true).await;
        let engine = AnswerEngine::new(store, RecordingModel::default());
        assert!(matches!(
            engine.answer_question("What is ML?").await.unwrap_err(),
            AnsweringError::Retrieval(_)
        ));
        assert_eq!(engine.answer_or_apologize("What is ML?").await.answer, APOLOGY);
    }

    #[tokio::test]
    async fn test_configured_limits_apply() {
        let store = MemoryStore::new();
        for name in ["A1", "A2", "A3"] {
            store
                .create_entity(&Entity::new(name, "Node"), "Node", LabelMode::Inline)
                .await
                .unwrap();
        }
        let engine = AnswerEngine::new(store, RecordingModel::default()).with_retrieval(
            RetrievalSettings {
                mention_limit: 2,
                ..Default::default()
            },
        );
        let context = engine.retrieve("A1 A2 A3").await.unwrap();
        assert_eq!(context.entities.len(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_and_read_helpers() {
        let engine = AnswerEngine::new(ai_ml_store().await, RecordingModel::default());

        let snapshot = engine.snapshot().await.unwrap();
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.links[0].link_type, "includes");

        assert_eq!(engine.list_entities(DEFAULT_LIST_LIMIT).await.unwrap().len(), 2);
        let found = engine.search_entities("artificial", DEFAULT_SEARCH_LIMIT).await.unwrap();
        assert_eq!(found[0].name, "AI");
        let details = engine.entity_details("ML").await.unwrap().unwrap();
        assert_eq!(details.incoming[0].source, "AI");
        assert_eq!(engine.graph_counts().await.unwrap().relationships, 1);
    }
}

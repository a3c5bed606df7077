//! Configuration management for kgrag services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`KGRAG__` prefix, `__` as section separator,
//!    e.g. `KGRAG__NEO4J__URI`)
//! 2. Config file (`kgrag.toml` by default)
//! 3. Defaults

use serde::Deserialize;

use crate::error::KgragError;

/// Environment variable consulted when no LLM API key is configured.
pub const API_KEY_ENV: &str = "DEEPSEEK_API_KEY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KgragConfig {
    pub neo4j: Neo4jSettings,
    pub llm: LlmSettings,
    pub retrieval: RetrievalSettings,
}

/// `[neo4j]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Neo4jSettings {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub fetch_size: usize,
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "password".to_string(),
            max_connections: 16,
            fetch_size: 256,
        }
    }
}

/// `[llm]` section: the OpenAI-compatible generation endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Full chat-completions URL.
    pub api_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// System message sent ahead of every question.
    pub system_prompt: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.deepseek.com/v1/chat/completions".to_string(),
            model: "deepseek-chat".to_string(),
            api_key: None,
            temperature: 0.7,
            timeout_secs: 60,
            system_prompt: default_system_prompt(),
        }
    }
}

impl LlmSettings {
    /// The configured API key, falling back to [`API_KEY_ENV`].
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()))
    }
}

fn default_system_prompt() -> String {
    "You are a knowledgeable question-answering assistant. Answer the user's \
     question using the provided context. If the context does not contain the \
     relevant information, say so plainly."
        .to_string()
}

/// `[retrieval]` section: result caps for each pipeline stage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Maximum entities returned by mention matching (per tier).
    pub mention_limit: u32,
    /// Maximum (entity, relationship, neighbor) rows fetched during expansion.
    pub neighbor_limit: u32,
    /// Maximum edges in a graph snapshot.
    pub snapshot_edge_limit: u32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            mention_limit: 10,
            neighbor_limit: 50,
            snapshot_edge_limit: 500,
        }
    }
}

impl KgragConfig {
    /// Load configuration from `<file_prefix>.toml` (optional) and the environment.
    pub fn load(file_prefix: &str) -> Result<Self, KgragError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("KGRAG")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(cfg.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KgragConfig::default();
        assert_eq!(config.neo4j.uri, "bolt://localhost:7687");
        assert_eq!(config.retrieval.mention_limit, 10);
        assert_eq!(config.retrieval.neighbor_limit, 50);
        assert_eq!(config.retrieval.snapshot_edge_limit, 500);
        assert_eq!(config.llm.model, "deepseek-chat");
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kgrag.toml");
        std::fs::write(
            &path,
            r#"
[neo4j]
uri = "bolt://graph:7687"
password = "secret"

[retrieval]
neighbor_limit = 25
"#,
        )
        .unwrap();

        let prefix = dir.path().join("kgrag");
        let config = KgragConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.neo4j.uri, "bolt://graph:7687");
        assert_eq!(config.neo4j.password, "secret");
        assert_eq!(config.neo4j.user, "neo4j");
        assert_eq!(config.retrieval.neighbor_limit, 25);
        assert_eq!(config.retrieval.mention_limit, 10);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = KgragConfig::load("/nonexistent/kgrag-config").unwrap();
        assert_eq!(config.neo4j.user, "neo4j");
    }

    #[test]
    fn test_configured_api_key_wins() {
        let llm = LlmSettings {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert_eq!(llm.resolved_api_key().as_deref(), Some("sk-test"));
    }
}

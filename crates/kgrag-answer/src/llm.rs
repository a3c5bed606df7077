//! Chat-completion client for answer generation.
//!
//! [`ChatModel`] is the seam the answer engine generates through.
//! [`OpenAiCompatibleClient`] speaks the `/v1/chat/completions` protocol used
//! by DeepSeek, OpenAI and local compatible servers. Wire types stay private.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use kgrag_core::config::LlmSettings;

use crate::error::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A text generation collaborator.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, GenerationError>;
}

/// Client for any endpoint implementing `/v1/chat/completions`.
///
/// Clone is cheap (`reqwest::Client` is an `Arc` internally).
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    client: Client,
    api_url: String,
    model: String,
    api_key: String,
}

impl OpenAiCompatibleClient {
    pub fn new(
        api_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Build a client from settings. An API key is required.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, GenerationError> {
        let api_key = settings.resolved_api_key().ok_or_else(|| {
            GenerationError::Config(format!(
                "no API key: set llm.api_key or {}",
                kgrag_core::config::API_KEY_ENV
            ))
        })?;
        Self::new(
            settings.api_url.clone(),
            settings.model.clone(),
            api_key,
            Duration::from_secs(settings.timeout_secs),
        )
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatibleClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, GenerationError> {
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature,
        };

        tracing::debug!(
            model = %self.model,
            temperature,
            messages = messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(url = %self.api_url, error = %e, "Chat completion transport failure");
                GenerationError::Request(e.to_string())
            })?;

        let response = check_status(response).await?;
        let parsed = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| GenerationError::Request(format!("failed to parse response body: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }
}

// ── Wire types ────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());
    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body,
    };

    tracing::error!(%status, %message, "Chat completion returned HTTP error");
    Err(GenerationError::Status {
        status: status.as_u16(),
        message,
    })
}

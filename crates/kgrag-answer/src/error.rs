//! Error types for the kgrag-answer crate.

use thiserror::Error;

/// Failure of the external chat-completion service.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Request(String),

    #[error("Generation service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Generation service returned no content")]
    EmptyResponse,

    #[error("Generation client misconfigured: {0}")]
    Config(String),
}

/// Any failure while answering one question.
#[derive(Error, Debug)]
pub enum AnsweringError {
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] kgrag_graph::GraphError),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),
}

pub type Result<T> = std::result::Result<T, AnsweringError>;

use thiserror::Error;

/// Top-level error type shared by kgrag crates.
#[derive(Error, Debug)]
pub enum KgragError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for KgragError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

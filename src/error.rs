//! Error types for Sikt.

use thiserror::Error;

/// Library-level error type for Sikt operations.
#[derive(Error, Debug)]
pub enum SiktError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("No segment matched the query: {0}")]
    RetrievalEmpty(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Clip extraction failed: {0}")]
    Extraction(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Sikt operations.
pub type Result<T> = std::result::Result<T, SiktError>;

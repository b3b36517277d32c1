use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Corrupt persisted state: {0}")]
    Corruption(String),

    #[error("Persisted state was built with model '{stored}', running '{current}'")]
    ModelMismatch { stored: String, current: String },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Completion failed: {0}")]
    Completion(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

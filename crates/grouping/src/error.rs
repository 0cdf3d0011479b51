use thiserror::Error;

pub type Result<T> = std::result::Result<T, CurationError>;

#[derive(Error, Debug)]
pub enum CurationError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Unsupported stability store schema_version {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },

    #[error("Embedding error: {0}")]
    EmbeddingError(String),
}

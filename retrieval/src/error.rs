//! Error types for the retrieval layer.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur when querying a vector index.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The index has no endpoint or credentials.
    #[error("vector index not configured")]
    NotConfigured,

    /// The remote procedure returned a non-success status.
    #[error("vector index error (status {status}): {message}")]
    Remote { status: u16, message: String },

    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] lexrag_embeddings::EmbeddingError),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

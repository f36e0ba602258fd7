//! Error types for completion providers.

use thiserror::Error;

/// Result type alias for completion operations.
pub type Result<T> = std::result::Result<T, CompletionError>;

/// Errors that can occur when calling a completion provider.
#[derive(Error, Debug)]
pub enum CompletionError {
    /// Provider credentials are missing.
    #[error("completion provider not configured")]
    NotConfigured,

    /// The provider endpoint refused or dropped the connection.
    #[error("connection failed: {0}")]
    Connection(String),

    /// API returned a non-success status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response did not contain any text.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Other HTTP error.
    #[error("http error: {0}")]
    Http(reqwest::Error),
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            CompletionError::Connection(err.to_string())
        } else {
            CompletionError::Http(err)
        }
    }
}

const CONTEXT_LENGTH_MARKERS: [&str; 6] = [
    "context length",
    "context_length",
    "context window",
    "maximum context",
    "too many tokens",
    "prompt is too long",
];

impl CompletionError {
    /// The provider could not be reached at all.
    pub fn is_connection_refused(&self) -> bool {
        match self {
            CompletionError::Connection(_) => true,
            other => {
                let message = other.to_string().to_lowercase();
                message.contains("connection refused") || message.contains("econnrefused")
            }
        }
    }

    /// The prompt exceeded the model's context window.
    pub fn is_context_length(&self) -> bool {
        let message = self.to_string().to_lowercase();
        CONTEXT_LENGTH_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
    }
}

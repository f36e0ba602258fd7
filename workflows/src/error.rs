//! Error types for the workflows.

use lexrag_llm::{CompletionError, ProviderKind};
use thiserror::Error;

/// Result type alias for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Terminal failure of a workflow run.
///
/// A run either returns a complete output or exactly one of these; partial
/// results are never returned.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// The reference library is empty.
    #[error("no references available")]
    NoReferences,

    /// A requested record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Neither inline content nor a document id was supplied.
    #[error("no document content or document id supplied")]
    MissingTarget,

    /// The model reply held no parseable judgment.
    #[error("invalid response format")]
    InvalidResponseFormat,

    /// The completion provider could not be reached.
    #[error("{provider} is unavailable: {hint}")]
    ProviderUnavailable { provider: String, hint: String },

    /// The prompt exceeded the model's context window.
    #[error("document too large for the model context window")]
    DocumentTooLarge,

    /// Any other completion failure, with the provider's message.
    #[error("{0}")]
    Completion(String),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl WorkflowError {
    /// Classify a failed completion call.
    ///
    /// Unreachable providers get a remediation hint, oversized prompts are
    /// reported as such, everything else keeps the provider's message.
    pub fn from_completion(provider: &str, kind: ProviderKind, err: CompletionError) -> Self {
        if err.is_connection_refused() {
            let hint = match kind {
                ProviderKind::Local => "make sure it is running (`ollama serve`)",
                ProviderKind::Cloud => "check network access and the provider base URL",
            };
            WorkflowError::ProviderUnavailable {
                provider: provider.to_string(),
                hint: hint.to_string(),
            }
        } else if err.is_context_length() {
            WorkflowError::DocumentTooLarge
        } else {
            WorkflowError::Completion(err.to_string())
        }
    }
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Record not found.
    #[error("record not found: {0}")]
    NotFound(String),
}

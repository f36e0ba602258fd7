//! # LLM
//!
//! Text completion behind a single [`CompletionProvider`] trait. Cloud
//! backends (OpenAI, Gemini) and a local backend (Ollama) are selected once
//! from [`CompletionProviderConfig`]; workflows only see the trait and the
//! provider's [`ProviderKind`], which decides how much text a prompt may
//! carry.

pub mod error;
pub mod provider;

pub use error::{CompletionError, Result};
pub use provider::{
    from_config, CompletionBackend, CompletionProvider, CompletionProviderConfig,
    CompletionRequest, CompletionResponse, GeminiChatProvider, OllamaChatProvider,
    OpenAIChatProvider, ProviderKind,
};

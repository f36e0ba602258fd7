//! # Embeddings
//!
//! Embedding generation for lexrag retrieval, with the two guards every
//! caller goes through: a bounded in-process cache and a sliding-window rate
//! limiter.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Embedding Guard                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  safe_embed(text)                                               │
//! │       │                                                         │
//! │       ├── EmbeddingCache hit ──────────────► Embedded (cached)  │
//! │       ├── RateWindow full ─────────────────► Unavailable        │
//! │       └── EmbeddingProvider (OpenAI/Gemini/Ollama)              │
//! │                 ├── ok ──► cache insert ──► Embedded            │
//! │                 └── err ─► classify ──────► Unavailable         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod guard;
pub mod limiter;
pub mod provider;
pub mod similarity;

pub use cache::{CacheStats, EmbeddingCache};
pub use error::{EmbeddingError, Result};
pub use guard::{EmbedOutcome, EmbeddingGuard, GuardConfig, UnavailableReason};
pub use limiter::RateWindow;
pub use provider::{
    EmbeddingBackend, EmbeddingProvider, EmbeddingProviderConfig, EmbeddingRequest,
    EmbeddingResponse, GeminiProvider, OllamaProvider, OpenAIProvider,
};
pub use similarity::{SimilarityResult, cosine_similarity, find_top_k};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension of embeddings produced by the default provider.
pub const DEFAULT_DIMENSION: usize = 768; // Gemini text-embedding-004

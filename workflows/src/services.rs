//! Capabilities injected into the workflows.

use std::sync::Arc;

use lexrag_embeddings::{EmbedOutcome, EmbeddingGuard};
use lexrag_llm::CompletionProvider;
use lexrag_retrieval::{RetrievedReference, SimilaritySearch};
use tracing::{debug, info};

use crate::store::{ArtifactStore, ReferenceStore};

/// Result of a guarded embed-then-search.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// At least one reference scored above the threshold.
    Matched(Vec<RetrievedReference>),
    /// The search ran and nothing scored above the threshold.
    Empty,
    /// Retrieval could not run; the reason is informational only.
    Unavailable(String),
}

impl Retrieval {
    /// Matches, or an empty slice for every other outcome.
    pub fn matches(&self) -> &[RetrievedReference] {
        match self {
            Retrieval::Matched(matches) => matches,
            Retrieval::Empty | Retrieval::Unavailable(_) => &[],
        }
    }

    pub fn into_matches(self) -> Vec<RetrievedReference> {
        match self {
            Retrieval::Matched(matches) => matches,
            Retrieval::Empty | Retrieval::Unavailable(_) => Vec::new(),
        }
    }
}

/// Embedding guard plus similarity search.
#[derive(Clone)]
pub struct Retriever {
    guard: Arc<EmbeddingGuard>,
    search: SimilaritySearch,
}

impl Retriever {
    pub fn new(guard: Arc<EmbeddingGuard>, search: SimilaritySearch) -> Self {
        Self { guard, search }
    }

    /// Whether a search could run if an embedding were available.
    pub fn is_configured(&self) -> bool {
        self.search.is_configured()
    }

    /// Embed `text` and search for references above `threshold`.
    ///
    /// Never fails; every problem is folded into [`Retrieval::Unavailable`].
    pub async fn retrieve(&self, text: &str, threshold: f32, limit: usize) -> Retrieval {
        if !self.search.is_configured() {
            debug!("Similarity search not configured, skipping embedding");
            return Retrieval::Unavailable("vector index not configured".to_string());
        }

        let embedding = match self.guard.safe_embed(text).await {
            EmbedOutcome::Embedded { embedding, cached } => {
                let stats = self.guard.stats().await;
                debug!(
                    cached,
                    cache_entries = stats.entries,
                    cache_capacity = stats.max_entries,
                    "Query embedded"
                );
                embedding
            }
            EmbedOutcome::Unavailable(reason) => {
                info!("Embedding unavailable: {reason}");
                return Retrieval::Unavailable(reason.to_string());
            }
        };

        let outcome = self.search.search(&embedding, threshold, limit).await;
        if !outcome.success {
            let error = outcome
                .error
                .unwrap_or_else(|| "similarity search failed".to_string());
            return Retrieval::Unavailable(error);
        }
        if outcome.has_matches() {
            Retrieval::Matched(outcome.data)
        } else {
            Retrieval::Empty
        }
    }
}

/// Everything a workflow run talks to.
#[derive(Clone)]
pub struct Services {
    pub retriever: Retriever,
    pub references: Arc<dyn ReferenceStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub completer: Arc<dyn CompletionProvider>,
}

//! Vector index capability and an in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use lexrag_embeddings::similarity::{find_top_k, normalize};
use lexrag_embeddings::{Embedding, EmbeddingError};

use crate::error::Result;
use crate::search::RetrievedReference;

/// A store of reference embeddings that can answer nearest-neighbour queries.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Whether the index can be queried at all.
    ///
    /// Checked before every search so an unconfigured index never sees a call.
    fn is_configured(&self) -> bool;

    /// Return up to `limit` references with similarity above `threshold`,
    /// best match first.
    async fn match_references(
        &self,
        query: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<RetrievedReference>>;
}

#[derive(Debug, Clone)]
struct IndexEntry {
    content: String,
    embedding: Embedding,
    metadata: serde_json::Value,
}

/// Cosine-similarity index held in process memory.
pub struct InMemoryVectorIndex {
    entries: RwLock<HashMap<String, IndexEntry>>,
    dimension: usize,
}

impl InMemoryVectorIndex {
    /// Create a new index for embeddings of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            dimension,
        }
    }

    /// Add or replace a reference embedding.
    pub async fn add(
        &self,
        id: impl Into<String>,
        content: impl Into<String>,
        mut embedding: Embedding,
        metadata: serde_json::Value,
    ) -> Result<()> {
        let id = id.into();

        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            }
            .into());
        }

        normalize(&mut embedding);
        self.entries.write().await.insert(
            id.clone(),
            IndexEntry {
                content: content.into(),
                embedding,
                metadata,
            },
        );
        debug!("Added embedding to index: {id}");

        Ok(())
    }

    /// Get the number of entries in the index.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check if the index is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn is_configured(&self) -> bool {
        true
    }

    async fn match_references(
        &self,
        query: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<RetrievedReference>> {
        if query.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            }
            .into());
        }

        let mut query = query.to_vec();
        normalize(&mut query);

        let entries = self.entries.read().await;
        let ranked = find_top_k(
            &query,
            entries
                .iter()
                .map(|(id, entry)| (id.as_str(), entry.embedding.as_slice())),
            limit,
            threshold,
        )?;

        Ok(ranked
            .into_iter()
            .filter_map(|hit| {
                entries.get(&hit.id).map(|entry| RetrievedReference {
                    reference_id: hit.id.clone(),
                    content: entry.content.clone(),
                    similarity: hit.score,
                    metadata: entry.metadata.clone(),
                })
            })
            .collect())
    }
}

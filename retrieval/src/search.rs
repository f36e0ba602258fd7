//! Threshold-bounded similarity search with normalized failures.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::index::VectorIndex;

/// A reference document matched by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedReference {
    pub reference_id: String,
    pub content: String,
    pub similarity: f32,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Outcome of a similarity search.
///
/// `success = true` with empty `data` means nothing matched; `success =
/// false` means the search itself could not run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub success: bool,
    pub data: Vec<RetrievedReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutcome {
    pub fn found(data: Vec<RetrievedReference>) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Successful with at least one match.
    pub fn has_matches(&self) -> bool {
        self.success && !self.data.is_empty()
    }
}

/// Wrapper around an optional vector index.
#[derive(Clone, Default)]
pub struct SimilaritySearch {
    index: Option<Arc<dyn VectorIndex>>,
}

impl SimilaritySearch {
    /// Search through `index`.
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index: Some(index) }
    }

    /// A search with no index behind it; every call reports failure.
    pub fn disabled() -> Self {
        Self { index: None }
    }

    /// Whether searches can run at all.
    pub fn is_configured(&self) -> bool {
        self.index.as_ref().is_some_and(|index| index.is_configured())
    }

    /// Find up to `limit` references with similarity above `threshold`.
    ///
    /// The remote ranking is trusted as-is; rows at or below the threshold
    /// are dropped and the rest truncated to `limit`.
    pub async fn search(&self, query: &[f32], threshold: f32, limit: usize) -> SearchOutcome {
        let Some(index) = self.index.as_ref().filter(|index| index.is_configured()) else {
            debug!("Vector index not configured, skipping search");
            return SearchOutcome::failed("vector index not configured");
        };

        match index.match_references(query, threshold, limit).await {
            Ok(rows) => {
                let data: Vec<RetrievedReference> = rows
                    .into_iter()
                    .filter(|row| row.similarity > threshold)
                    .take(limit)
                    .collect();
                debug!("Similarity search returned {} matches", data.len());
                SearchOutcome::found(data)
            }
            Err(err) => {
                warn!("Similarity search failed: {err}");
                SearchOutcome::failed(err.to_string())
            }
        }
    }
}

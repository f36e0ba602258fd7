//! Embedding cache for avoiding redundant provider calls.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::Embedding;

/// Share of the cache dropped in one batch when it is full (1/10).
const EVICTION_DIVISOR: usize = 10;

/// Bounded in-memory cache of embeddings keyed by a hash of the input text.
///
/// Entries are kept in insertion order. When an insert would exceed the
/// capacity, the oldest ~10% of entries are dropped together, which makes
/// eviction approximate LRU rather than strict recency order.
pub struct EmbeddingCache {
    entries: RwLock<IndexMap<u64, Embedding>>,
    max_entries: usize,
}

impl EmbeddingCache {
    /// Create a new cache holding at most `max_entries` embeddings.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            max_entries,
        }
    }

    /// Compute the cache key for a text.
    ///
    /// Not cryptographic; collisions are possible but rare for document-sized
    /// inputs.
    pub fn key_for(text: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        hasher.finish()
    }

    /// Get an embedding from the cache.
    pub async fn get(&self, text: &str) -> Option<Embedding> {
        let key = Self::key_for(text);
        self.entries.read().await.get(&key).cloned()
    }

    /// Put an embedding in the cache, returning how many entries were evicted.
    pub async fn put(&self, text: &str, embedding: Embedding) -> usize {
        if self.max_entries == 0 {
            return 0;
        }

        let key = Self::key_for(text);
        let mut entries = self.entries.write().await;

        let mut evicted = 0;
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let batch = self
                .max_entries
                .div_ceil(EVICTION_DIVISOR)
                .clamp(1, entries.len());
            entries.drain(..batch);
            evicted = batch;
            debug!("Evicted {batch} oldest embeddings from cache");
        }

        entries.insert(key, embedding);
        evicted
    }

    /// Check if an embedding is cached.
    pub async fn contains(&self, text: &str) -> bool {
        let key = Self::key_for(text);
        self.entries.read().await.contains_key(&key)
    }

    /// Number of cached embeddings.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len().await,
            max_entries: self.max_entries,
        }
    }
}

/// Statistics about the embedding cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries in cache.
    pub entries: usize,

    /// Maximum cache size.
    pub max_entries: usize,
}

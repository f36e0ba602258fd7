//! Cached, rate-limited access to an embedding provider.
//!
//! [`EmbeddingGuard::safe_embed`] never returns an error: every failure is
//! folded into [`EmbedOutcome::Unavailable`] so retrieval callers can degrade
//! instead of aborting.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::Embedding;
use crate::cache::{CacheStats, EmbeddingCache};
use crate::error::EmbeddingError;
use crate::limiter::RateWindow;
use crate::provider::{EmbeddingProvider, EmbeddingRequest};

/// Configuration for the embedding guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Maximum number of cached embeddings.
    pub cache_capacity: usize,

    /// Length of the rate window in milliseconds.
    pub window_ms: u64,

    /// Provider calls allowed per window.
    pub max_calls_per_window: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 1000,
            window_ms: 60_000,
            max_calls_per_window: 10,
        }
    }
}

impl GuardConfig {
    /// Set the cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the call budget per window.
    pub fn with_rate_limit(mut self, max_calls: usize, window: Duration) -> Self {
        self.max_calls_per_window = max_calls;
        self.window_ms = millis(window);
        self
    }

    /// Length of the rate window.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Why an embedding could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnavailableReason {
    /// The local call budget for the current window is spent.
    #[error("rate limit reached")]
    RateLimited,

    /// The provider reported quota exhaustion or overload.
    #[error("embedding quota exhausted: {0}")]
    Quota(String),

    /// No credentials for the configured provider.
    #[error("embedding provider not configured")]
    NotConfigured,

    /// Any other provider or transport failure.
    #[error("embedding failed: {0}")]
    Provider(String),
}

impl From<EmbeddingError> for UnavailableReason {
    fn from(err: EmbeddingError) -> Self {
        if matches!(err, EmbeddingError::ProviderNotConfigured) {
            UnavailableReason::NotConfigured
        } else if err.is_quota() {
            UnavailableReason::Quota(err.to_string())
        } else {
            UnavailableReason::Provider(err.to_string())
        }
    }
}

/// Result of [`EmbeddingGuard::safe_embed`].
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedOutcome {
    /// An embedding is available.
    Embedded {
        embedding: Embedding,
        /// Served from the cache without a provider call.
        cached: bool,
    },
    /// No embedding could be produced.
    Unavailable(UnavailableReason),
}

impl EmbedOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EmbedOutcome::Embedded { .. })
    }

    pub fn embedding(&self) -> Option<&Embedding> {
        match self {
            EmbedOutcome::Embedded { embedding, .. } => Some(embedding),
            EmbedOutcome::Unavailable(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&UnavailableReason> {
        match self {
            EmbedOutcome::Embedded { .. } => None,
            EmbedOutcome::Unavailable(reason) => Some(reason),
        }
    }
}

/// Embedding provider wrapped with a cache and a global call budget.
///
/// Construct one per process and share it behind an `Arc`. The rate window
/// is global across all callers.
pub struct EmbeddingGuard {
    provider: Arc<dyn EmbeddingProvider>,
    cache: EmbeddingCache,
    window: Mutex<RateWindow>,
}

impl EmbeddingGuard {
    /// Create a guard around `provider`.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: &GuardConfig) -> Self {
        Self {
            provider,
            cache: EmbeddingCache::new(config.cache_capacity),
            window: Mutex::new(RateWindow::new(config.window(), config.max_calls_per_window)),
        }
    }

    /// Name of the wrapped provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Embed `text`, serving from cache when possible.
    pub async fn safe_embed(&self, text: &str) -> EmbedOutcome {
        if let Some(embedding) = self.cache.get(text).await {
            debug!("Cache hit for embedding");
            return EmbedOutcome::Embedded {
                embedding,
                cached: true,
            };
        }

        {
            let mut window = self.window.lock().await;
            let now = Instant::now();
            if !window.try_acquire(now) {
                warn!(
                    max_calls = window.max_calls(),
                    window_ms = millis(window.window()),
                    retry_after_ms = window.retry_after(now).map_or(0, millis),
                    "Embedding rate limit reached, skipping provider call"
                );
                return EmbedOutcome::Unavailable(UnavailableReason::RateLimited);
            }
        }

        match self.provider.embed(EmbeddingRequest::new(text)).await {
            Ok(response) => {
                self.cache.put(text, response.embedding.clone()).await;
                EmbedOutcome::Embedded {
                    embedding: response.embedding,
                    cached: false,
                }
            }
            Err(err) => {
                let reason = UnavailableReason::from(err);
                warn!(provider = self.provider.name(), "Embedding unavailable: {reason}");
                EmbedOutcome::Unavailable(reason)
            }
        }
    }

    /// Get the underlying cache.
    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    /// Cache statistics.
    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}

//! Vector index backed by a remote database function.
//!
//! The similarity query runs server-side as one procedure call:
//! `POST {url}/rest/v1/rpc/{function}` with the query embedding, threshold and
//! row limit. Rows come back already ranked.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::VectorIndexConfig;
use crate::error::{Result, RetrievalError};
use crate::index::VectorIndex;
use crate::search::RetrievedReference;

/// Remote vector index reached over HTTP.
pub struct RpcVectorIndex {
    url: Option<String>,
    api_key: Option<String>,
    function: String,
    client: reqwest::Client,
}

impl RpcVectorIndex {
    /// Build from configuration, reading the API key from the environment.
    pub fn from_config(config: &VectorIndexConfig) -> Self {
        Self {
            url: config.url.clone(),
            api_key: config.api_key(),
            function: config.function.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Build with explicit endpoint and key.
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            url: Some(url.into()),
            api_key: Some(api_key.into()),
            function: function.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl VectorIndex for RpcVectorIndex {
    fn is_configured(&self) -> bool {
        self.url.is_some() && self.api_key.is_some()
    }

    async fn match_references(
        &self,
        query: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<RetrievedReference>> {
        let (Some(url), Some(api_key)) = (&self.url, &self.api_key) else {
            return Err(RetrievalError::NotConfigured);
        };

        let endpoint = format!(
            "{}/rest/v1/rpc/{}",
            url.trim_end_matches('/'),
            self.function
        );
        debug!("Calling vector index function {}", self.function);

        let body = serde_json::json!({
            "query_embedding": query,
            "match_threshold": threshold,
            "match_count": limit,
        });

        let response = self
            .client
            .post(endpoint)
            .header("apikey", api_key)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let rows: Vec<MatchRow> = response.json().await?;
        Ok(rows.into_iter().map(RetrievedReference::from).collect())
    }
}

#[derive(Debug, Deserialize)]
struct MatchRow {
    id: Value,
    #[serde(default)]
    content: String,
    similarity: f32,
    #[serde(default)]
    metadata: Value,
}

impl From<MatchRow> for RetrievedReference {
    fn from(row: MatchRow) -> Self {
        let reference_id = match row.id {
            Value::String(id) => id,
            other => other.to_string(),
        };
        Self {
            reference_id,
            content: row.content,
            similarity: row.similarity,
            metadata: row.metadata,
        }
    }
}

//! Configuration for the vector index.

use serde::{Deserialize, Serialize};

/// Which vector index backs similarity search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
    /// Remote matching function over REST.
    #[default]
    Remote,
    /// Library references embedded into process memory at startup.
    Memory,
}

/// Where the similarity function lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorIndexConfig {
    pub backend: IndexBackend,

    /// Base URL of the database REST endpoint. `None` disables the index.
    pub url: Option<String>,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Name of the remote matching function.
    pub function: String,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Remote,
            url: None,
            api_key_env: "VECTOR_INDEX_API_KEY".to_string(),
            function: "match_references".to_string(),
        }
    }
}

impl VectorIndexConfig {
    /// Set the base URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the backend.
    pub fn with_backend(mut self, backend: IndexBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Set the remote function name.
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = function.into();
        self
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

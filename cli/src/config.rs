//! TOML configuration for the `lexrag` binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lexrag_embeddings::{EmbeddingProviderConfig, GuardConfig};
use lexrag_llm::CompletionProviderConfig;
use lexrag_retrieval::VectorIndexConfig;
use lexrag_workflows::WorkflowConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

const CONFIG_FILE: &str = "lexrag.toml";
const CONFIG_ENV: &str = "LEXRAG_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LexragConfig {
    pub embedding: EmbeddingProviderConfig,
    pub completion: CompletionProviderConfig,
    pub vector_index: VectorIndexConfig,
    pub guard: GuardConfig,
    pub workflow: WorkflowConfig,
}

impl LexragConfig {
    /// Load configuration.
    ///
    /// An explicit path or `$LEXRAG_CONFIG` must exist. Otherwise
    /// `./lexrag.toml` and then `<config dir>/lexrag/config.toml` are tried,
    /// falling back to defaults when neither exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        match default_locations().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::from_file(&path),
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_toml_str(&raw)
            .with_context(|| format!("invalid config {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("lexrag").join("config.toml"));
    }
    locations
}

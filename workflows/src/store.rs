//! Record stores consumed by the workflows.
//!
//! The workflows only need a handful of operations on reference documents and
//! generated artifacts; anything that implements [`ReferenceStore`] and
//! [`ArtifactStore`] can back them. [`MemoryStore`] is the in-process
//! implementation used by tests and the CLI.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;

type StoreResult<T> = std::result::Result<T, StoreError>;

/// A reference document in the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub usage_count: u64,
}

/// Lifecycle status of a generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Draft,
    Pending,
    Validated,
}

impl ArtifactStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactStatus::Draft => "draft",
            ArtifactStatus::Pending => "pending",
            ArtifactStatus::Validated => "validated",
        }
    }
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields of an artifact about to be created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArtifact {
    pub title: String,
    pub content: String,
    pub document_type: String,
    pub status: ArtifactStatus,
    pub metadata: serde_json::Value,
}

/// A persisted artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    pub title: String,
    pub content: String,
    pub document_type: String,
    pub status: ArtifactStatus,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read access to reference documents plus usage accounting.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// All references, in store order.
    async fn list_all(&self) -> StoreResult<Vec<Reference>>;

    /// A single reference by id.
    async fn get_reference(&self, id: &str) -> StoreResult<Option<Reference>>;

    /// Record that a reference was used for generation.
    async fn increment_usage(&self, id: &str) -> StoreResult<()>;

    /// Up to `limit` references ordered by usage, most used first.
    ///
    /// Ties keep store order.
    async fn most_used(&self, limit: usize) -> StoreResult<Vec<Reference>> {
        let mut references = self.list_all().await?;
        references.sort_by_key(|r| std::cmp::Reverse(r.usage_count));
        references.truncate(limit);
        Ok(references)
    }
}

/// Create/read/update access to generated artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist a new artifact and return its id.
    async fn create(&self, artifact: NewArtifact) -> StoreResult<String>;

    /// A single artifact by id.
    async fn get_artifact(&self, id: &str) -> StoreResult<Option<Artifact>>;

    /// Change an artifact's lifecycle status.
    async fn update_status(&self, id: &str, status: ArtifactStatus) -> StoreResult<()>;
}

/// Serializable contents of a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySnapshot {
    pub references: Vec<Reference>,
    pub artifacts: Vec<Artifact>,
}

/// In-memory reference and artifact store.
#[derive(Default)]
pub struct MemoryStore {
    references: RwLock<Vec<Reference>>,
    artifacts: RwLock<Vec<Artifact>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a snapshot.
    pub fn from_snapshot(snapshot: LibrarySnapshot) -> Self {
        Self {
            references: RwLock::new(snapshot.references),
            artifacts: RwLock::new(snapshot.artifacts),
        }
    }

    /// Copy the current contents out.
    pub async fn snapshot(&self) -> LibrarySnapshot {
        LibrarySnapshot {
            references: self.references.read().await.clone(),
            artifacts: self.artifacts.read().await.clone(),
        }
    }

    /// Append a reference, replacing any existing one with the same id.
    pub async fn add_reference(&self, reference: Reference) {
        let mut references = self.references.write().await;
        if let Some(existing) = references.iter_mut().find(|r| r.id == reference.id) {
            *existing = reference;
        } else {
            references.push(reference);
        }
    }

    pub async fn artifact_count(&self) -> usize {
        self.artifacts.read().await.len()
    }
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    async fn list_all(&self) -> StoreResult<Vec<Reference>> {
        Ok(self.references.read().await.clone())
    }

    async fn get_reference(&self, id: &str) -> StoreResult<Option<Reference>> {
        Ok(self
            .references
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn increment_usage(&self, id: &str) -> StoreResult<()> {
        let mut references = self.references.write().await;
        let reference = references
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        reference.usage_count += 1;
        debug!("Reference {id} used {} times", reference.usage_count);
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn create(&self, artifact: NewArtifact) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        self.artifacts.write().await.push(Artifact {
            id: id.clone(),
            title: artifact.title,
            content: artifact.content,
            document_type: artifact.document_type,
            status: artifact.status,
            metadata: artifact.metadata,
            created_at: now,
            updated_at: now,
        });
        debug!("Created artifact {id}");
        Ok(id)
    }

    async fn get_artifact(&self, id: &str) -> StoreResult<Option<Artifact>> {
        Ok(self
            .artifacts
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn update_status(&self, id: &str, status: ArtifactStatus) -> StoreResult<()> {
        let mut artifacts = self.artifacts.write().await;
        let artifact = artifacts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        artifact.status = status;
        artifact.updated_at = Utc::now();
        Ok(())
    }
}

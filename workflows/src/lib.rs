//! # Workflows
//!
//! The two retrieve-then-produce pipelines built on the embedding guard and
//! similarity search:
//!
//! - **Generation**: find the best-matching reference document, draft a new
//!   document from it, persist the draft.
//! - **Validation**: compare a document against requirements text (or, with
//!   no requirements, against key clauses of the most-used references), parse
//!   a structured judgment, persist the resulting status.
//!
//! Both are explicit state machines. Retrieval problems degrade to a
//! non-RAG path and are reported through `rag_used = false`; production
//! problems end the run with a single [`WorkflowError`].

pub mod clauses;
pub mod config;
pub mod error;
pub mod generation;
pub mod judgment;
mod prompt;
pub mod services;
pub mod store;
mod text;
pub mod validation;

pub use clauses::{ClauseConfig, ClauseExtractor};
pub use config::{PromptLimits, WorkflowConfig};
pub use error::{Result, StoreError, WorkflowError};
pub use generation::{GenerationOutput, GenerationRequest, GenerationWorkflow};
pub use judgment::{Issue, Judgment, JudgmentStatus, Severity};
pub use services::{Retrieval, Retriever, Services};
pub use store::{
    Artifact, ArtifactStatus, ArtifactStore, LibrarySnapshot, MemoryStore, NewArtifact,
    Reference, ReferenceStore,
};
pub use validation::{ValidationOutput, ValidationRequest, ValidationWorkflow};

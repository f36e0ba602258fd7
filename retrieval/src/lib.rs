//! # Retrieval
//!
//! Similarity search over the reference library.
//!
//! ```text
//! query embedding ──► SimilaritySearch ──► VectorIndex (RPC / in-memory)
//!                           │
//!                           ▼
//!                     SearchOutcome { success, data, error }
//! ```
//!
//! The wrapper never fails: an unconfigured index, a transport error and an
//! empty result are all reported through [`SearchOutcome`], and callers must
//! tell "no matches" (`success = true`, empty `data`) apart from "search
//! failed" (`success = false`).

pub mod config;
pub mod error;
pub mod index;
pub mod rpc;
pub mod search;

pub use config::{IndexBackend, VectorIndexConfig};
pub use error::{Result, RetrievalError};
pub use index::{InMemoryVectorIndex, VectorIndex};
pub use rpc::RpcVectorIndex;
pub use search::{RetrievedReference, SearchOutcome, SimilaritySearch};

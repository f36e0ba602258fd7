//! Fakes shared by the workflow integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lexrag_embeddings::{
    EmbeddingError, EmbeddingGuard, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse,
    GuardConfig,
};
use lexrag_llm::{
    CompletionError, CompletionProvider, CompletionRequest, CompletionResponse, ProviderKind,
};
use lexrag_retrieval::{RetrievalError, RetrievedReference, SimilaritySearch, VectorIndex};
use lexrag_workflows::{
    LibrarySnapshot, MemoryStore, Reference, Retriever, Services, WorkflowConfig,
};
use serde_json::json;

const DEFAULT_VECTOR: [f32; 3] = [0.1, 0.2, 0.3];

/// Embedder that records every input and returns a fixed vector per text,
/// or fails.
pub struct FakeEmbedder {
    calls: AtomicUsize,
    fail: bool,
    vectors: Vec<(String, Vec<f32>)>,
    texts: Mutex<Vec<String>>,
}

impl FakeEmbedder {
    pub fn new() -> Arc<Self> {
        Self::with_vectors(Vec::new())
    }

    /// Texts listed here embed to their vector; anything else gets a default.
    pub fn with_vectors(vectors: Vec<(&str, Vec<f32>)>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
            vectors: vectors
                .into_iter()
                .map(|(text, vector)| (text.to_string(), vector))
                .collect(),
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn quota_exhausted() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
            vectors: Vec::new(),
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Inputs sent to the provider, in call order.
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    fn name(&self) -> &str {
        "fake"
    }

    fn default_model(&self) -> &str {
        "fake-embed"
    }

    fn default_dimension(&self) -> usize {
        3
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> lexrag_embeddings::Result<EmbeddingResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(request.text.clone());
        if self.fail {
            return Err(EmbeddingError::RateLimited {
                retry_after_secs: 60,
            });
        }
        let embedding = self
            .vectors
            .iter()
            .find(|(text, _)| *text == request.text)
            .map_or_else(|| DEFAULT_VECTOR.to_vec(), |(_, vector)| vector.clone());
        Ok(EmbeddingResponse {
            dimension: embedding.len(),
            embedding,
            model: "fake-embed".to_string(),
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Vector index that answers every query with the same rows.
pub struct FixedIndex {
    rows: Vec<RetrievedReference>,
    configured: bool,
    fail: bool,
    calls: AtomicUsize,
}

impl FixedIndex {
    pub fn with_rows(rows: Vec<RetrievedReference>) -> Arc<Self> {
        Arc::new(Self {
            rows,
            configured: true,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn unconfigured() -> Arc<Self> {
        Arc::new(Self {
            rows: Vec::new(),
            configured: false,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            rows: Vec::new(),
            configured: true,
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for FixedIndex {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn match_references(
        &self,
        _query: &[f32],
        _threshold: f32,
        _limit: usize,
    ) -> lexrag_retrieval::Result<Vec<RetrievedReference>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RetrievalError::Remote {
                status: 503,
                message: "index offline".to_string(),
            });
        }
        Ok(self.rows.clone())
    }
}

/// How the fake completer answers.
#[derive(Clone)]
pub enum Reply {
    Text(String),
    Refused,
    ContextTooLong,
}

/// Completion provider with a canned reply that records every prompt.
pub struct FakeCompleter {
    reply: Reply,
    kind: ProviderKind,
    prompts: Mutex<Vec<String>>,
}

impl FakeCompleter {
    pub fn replying(text: impl Into<String>) -> Arc<Self> {
        Self::with(Reply::Text(text.into()), ProviderKind::Cloud)
    }

    pub fn with(reply: Reply, kind: ProviderKind) -> Arc<Self> {
        Arc::new(Self {
            reply,
            kind,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for FakeCompleter {
    fn name(&self) -> &str {
        match self.kind {
            ProviderKind::Local => "ollama",
            ProviderKind::Cloud => "fake-cloud",
        }
    }

    fn model(&self) -> &str {
        "fake-model"
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> lexrag_llm::Result<CompletionResponse> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        match &self.reply {
            Reply::Text(text) => Ok(CompletionResponse {
                content: text.clone(),
                prompt_tokens: 0,
                completion_tokens: 0,
            }),
            Reply::Refused => Err(CompletionError::Connection(
                "error trying to connect: Connection refused".to_string(),
            )),
            Reply::ContextTooLong => Err(CompletionError::Api {
                status: 400,
                message: "prompt is too long for the context window".to_string(),
            }),
        }
    }
}

pub fn reference(id: &str, title: &str, content: &str, usage_count: u64) -> Reference {
    Reference {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        category: None,
        usage_count,
    }
}

pub fn matched(id: &str, similarity: f32) -> RetrievedReference {
    RetrievedReference {
        reference_id: id.to_string(),
        content: format!("content of {id}"),
        similarity,
        metadata: json!({}),
    }
}

/// Route workflow logs through the test harness; `RUST_LOG` selects them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A wired-up set of services over fakes.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub embedder: Arc<FakeEmbedder>,
    pub index: Arc<FixedIndex>,
    pub completer: Arc<FakeCompleter>,
    pub config: WorkflowConfig,
}

impl Harness {
    pub fn new(
        references: Vec<Reference>,
        embedder: Arc<FakeEmbedder>,
        index: Arc<FixedIndex>,
        completer: Arc<FakeCompleter>,
    ) -> Self {
        init_tracing();
        Self {
            store: Arc::new(MemoryStore::from_snapshot(LibrarySnapshot {
                references,
                artifacts: Vec::new(),
            })),
            embedder,
            index,
            completer,
            config: WorkflowConfig::default(),
        }
    }

    pub fn services(&self) -> Services {
        self.services_over(self.index.clone())
    }

    /// Services searching `index` instead of the fixed one.
    pub fn services_over(&self, index: Arc<dyn VectorIndex>) -> Services {
        let guard = EmbeddingGuard::new(self.embedder.clone(), &GuardConfig::default());
        Services {
            retriever: Retriever::new(Arc::new(guard), SimilaritySearch::new(index)),
            references: self.store.clone(),
            artifacts: self.store.clone(),
            completer: self.completer.clone(),
        }
    }
}

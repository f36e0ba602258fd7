//! Reference-guided document generation.
//!
//! A run moves through [`Phase::Retrieve`] and [`Phase::Produce`] and ends in
//! either `Done` or `Error`. Retrieval never fails the run on its own: when
//! embedding or search is unavailable, or nothing matches, the first
//! reference in the library is used instead and `rag_used` is reported as
//! `false`.

use lexrag_llm::CompletionRequest;
use lexrag_retrieval::RetrievedReference;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::WorkflowConfig;
use crate::error::{Result, WorkflowError};
use crate::prompt::{GENERATION_SYSTEM, GenerationPrompt};
use crate::services::{Retrieval, Services};
use crate::store::{ArtifactStatus, NewArtifact, Reference};

/// What to generate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub query: String,
    pub title: String,
    pub document_type: String,
    #[serde(default)]
    pub parties: Vec<String>,
}

impl GenerationRequest {
    pub fn new(
        query: impl Into<String>,
        title: impl Into<String>,
        document_type: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            title: title.into(),
            document_type: document_type.into(),
            parties: Vec::new(),
        }
    }

    pub fn with_party(mut self, party: impl Into<String>) -> Self {
        self.parties.push(party.into());
        self
    }
}

/// A completed generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutput {
    pub content: String,
    pub artifact_id: String,
    /// Reference the draft was based on; the library fallback when retrieval
    /// did not pick one.
    pub reference_id: String,
    pub rag_used: bool,
    pub candidate_count: usize,
}

/// The reference chosen during retrieval.
#[derive(Debug)]
struct Selection {
    reference: Reference,
    candidates: Vec<RetrievedReference>,
    rag_used: bool,
}

#[derive(Debug)]
enum Phase {
    Retrieve,
    Produce(Selection),
    Done(GenerationOutput),
    Error(WorkflowError),
}

/// Generation state machine over injected [`Services`].
#[derive(Clone)]
pub struct GenerationWorkflow {
    services: Services,
    config: WorkflowConfig,
}

impl GenerationWorkflow {
    pub fn new(services: Services, config: WorkflowConfig) -> Self {
        Self { services, config }
    }

    /// Run to completion.
    pub async fn run(&self, request: &GenerationRequest) -> Result<GenerationOutput> {
        let mut phase = Phase::Retrieve;
        loop {
            phase = match phase {
                Phase::Retrieve => {
                    debug!("Generation: retrieve");
                    match self.retrieve(request).await {
                        Ok(selection) => Phase::Produce(selection),
                        Err(err) => Phase::Error(err),
                    }
                }
                Phase::Produce(selection) => {
                    debug!("Generation: produce from {}", selection.reference.id);
                    match self.produce(request, selection).await {
                        Ok(output) => Phase::Done(output),
                        Err(err) => Phase::Error(err),
                    }
                }
                Phase::Done(output) => {
                    info!(
                        "Generated artifact {} (rag: {}, reference: {})",
                        output.artifact_id, output.rag_used, output.reference_id
                    );
                    return Ok(output);
                }
                Phase::Error(err) => {
                    warn!("Generation failed: {err}");
                    return Err(err);
                }
            };
        }
    }

    async fn retrieve(&self, request: &GenerationRequest) -> Result<Selection> {
        let mut references = self.services.references.list_all().await?;
        if references.is_empty() {
            return Err(WorkflowError::NoReferences);
        }

        let retrieval = self
            .services
            .retriever
            .retrieve(
                &request.query,
                self.config.similarity_threshold,
                self.config.candidate_limit,
            )
            .await;

        let candidates = match retrieval {
            Retrieval::Matched(candidates) => candidates,
            Retrieval::Empty => {
                info!("No reference above threshold, using library fallback");
                Vec::new()
            }
            Retrieval::Unavailable(reason) => {
                info!("Retrieval unavailable ({reason}), using library fallback");
                Vec::new()
            }
        };

        let matched = candidates.first().and_then(|top| {
            let position = references.iter().position(|r| r.id == top.reference_id);
            if position.is_none() {
                warn!("Top candidate {} is not in the library", top.reference_id);
            }
            position
        });

        let (reference, rag_used) = match matched {
            Some(position) => {
                let reference = references.swap_remove(position);
                if let Err(err) = self.services.references.increment_usage(&reference.id).await {
                    warn!("Failed to record usage of {}: {err}", reference.id);
                }
                (reference, true)
            }
            None => (references.swap_remove(0), false),
        };

        Ok(Selection {
            reference,
            candidates,
            rag_used,
        })
    }

    async fn produce(
        &self,
        request: &GenerationRequest,
        selection: Selection,
    ) -> Result<GenerationOutput> {
        let completer = &self.services.completer;
        let limits = self.config.limits_for(completer.kind());

        let prompt = GenerationPrompt {
            query: &request.query,
            title: &request.title,
            document_type: &request.document_type,
            parties: &request.parties,
            reference: &selection.reference.content,
        }
        .render(limits);

        let response = completer
            .complete(&CompletionRequest::new(prompt).with_system(GENERATION_SYSTEM))
            .await
            .map_err(|err| {
                WorkflowError::from_completion(completer.name(), completer.kind(), err)
            })?;
        debug!(
            provider = completer.name(),
            prompt_tokens = response.prompt_tokens,
            completion_tokens = response.completion_tokens,
            "Completion received"
        );

        let candidate_count = selection.candidates.len();
        let artifact_id = self
            .services
            .artifacts
            .create(NewArtifact {
                title: request.title.clone(),
                content: response.content.clone(),
                document_type: request.document_type.clone(),
                status: ArtifactStatus::Draft,
                metadata: json!({
                    "referenceId": selection.reference.id,
                    "ragEnabled": selection.rag_used,
                    "candidateCount": candidate_count,
                    "parties": request.parties,
                }),
            })
            .await?;

        Ok(GenerationOutput {
            content: response.content,
            artifact_id,
            reference_id: selection.reference.id,
            rag_used: selection.rag_used,
            candidate_count,
        })
    }
}

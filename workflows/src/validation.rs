//! Compliance validation of a document.
//!
//! Phases are [`Phase::Retrieve`], which resolves the target document, the
//! baseline it is checked against and any supporting context, and
//! [`Phase::Validate`], which asks the completion provider for a judgment.
//! Without requirements text the baseline is built from key clauses of the
//! most used references ("global-clause mode").

use lexrag_llm::CompletionRequest;
use lexrag_retrieval::RetrievedReference;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clauses::ClauseExtractor;
use crate::config::{PromptLimits, WorkflowConfig};
use crate::error::{Result, WorkflowError};
use crate::judgment::{Judgment, parse_judgment};
use crate::prompt::{BaselineText, VALIDATION_SYSTEM, ValidationPrompt, join_clause_sections};
use crate::services::Services;
use crate::store::ArtifactStatus;
use crate::text::truncate_chars;

/// What to validate and against what.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    /// Inline document text. Takes precedence over `artifact_id`.
    #[serde(default)]
    pub content: Option<String>,
    /// Stored artifact to validate; its status is updated with the verdict.
    #[serde(default)]
    pub artifact_id: Option<String>,
    /// Requirements text. Absent or blank selects global-clause mode.
    #[serde(default)]
    pub requirements: Option<String>,
}

impl ValidationRequest {
    pub fn inline(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn artifact(id: impl Into<String>) -> Self {
        Self {
            artifact_id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_requirements(mut self, requirements: impl Into<String>) -> Self {
        self.requirements = Some(requirements.into());
        self
    }
}

/// A completed validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutput {
    pub judgment: Judgment,
    /// Artifact that was validated, when the target came from the store.
    pub target_id: Option<String>,
    /// Status written back to the artifact.
    pub status_update: Option<ArtifactStatus>,
    pub rag_used: bool,
    pub global_clause_mode: bool,
    pub context_count: usize,
}

/// What the target is compared against.
#[derive(Debug)]
enum Baseline {
    Requirements(String),
    GlobalClauses(String),
}

/// Everything the validate phase needs.
#[derive(Debug)]
struct Prepared {
    target: String,
    target_id: Option<String>,
    baseline: Baseline,
    context: Vec<RetrievedReference>,
}

#[derive(Debug)]
enum Phase {
    Retrieve,
    Validate(Prepared),
    Done(ValidationOutput),
    Error(WorkflowError),
}

/// Validation state machine over injected [`Services`].
#[derive(Clone)]
pub struct ValidationWorkflow {
    services: Services,
    config: WorkflowConfig,
    extractor: ClauseExtractor,
}

impl ValidationWorkflow {
    pub fn new(services: Services, config: WorkflowConfig) -> Self {
        let extractor = ClauseExtractor::new(config.clauses.clone());
        Self {
            services,
            config,
            extractor,
        }
    }

    /// Run to completion.
    pub async fn run(&self, request: &ValidationRequest) -> Result<ValidationOutput> {
        let mut phase = Phase::Retrieve;
        loop {
            phase = match phase {
                Phase::Retrieve => {
                    debug!("Validation: retrieve");
                    match self.retrieve(request).await {
                        Ok(prepared) => Phase::Validate(prepared),
                        Err(err) => Phase::Error(err),
                    }
                }
                Phase::Validate(prepared) => {
                    debug!("Validation: validate");
                    match self.validate(prepared).await {
                        Ok(output) => Phase::Done(output),
                        Err(err) => Phase::Error(err),
                    }
                }
                Phase::Done(output) => {
                    info!(
                        "Validation finished: {:?} (rag: {}, global clauses: {})",
                        output.judgment.status, output.rag_used, output.global_clause_mode
                    );
                    return Ok(output);
                }
                Phase::Error(err) => {
                    warn!("Validation failed: {err}");
                    return Err(err);
                }
            };
        }
    }

    fn limits(&self) -> &PromptLimits {
        self.config.limits_for(self.services.completer.kind())
    }

    async fn retrieve(&self, request: &ValidationRequest) -> Result<Prepared> {
        let (target, target_id) = self.resolve_target(request).await?;

        let requirements = request
            .requirements
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty());

        let baseline = match requirements {
            Some(requirements) => Baseline::Requirements(requirements.to_string()),
            None => Baseline::GlobalClauses(self.global_clauses().await?),
        };

        let search_text = match requirements {
            Some(requirements) => requirements,
            None => truncate_chars(&target, self.config.embedding_prefix_chars),
        };
        let context = self
            .services
            .retriever
            .retrieve(
                search_text,
                self.config.similarity_threshold,
                self.config.context_limit,
            )
            .await
            .into_matches();
        debug!("Retrieved {} context documents", context.len());

        Ok(Prepared {
            target,
            target_id,
            baseline,
            context,
        })
    }

    async fn resolve_target(
        &self,
        request: &ValidationRequest,
    ) -> Result<(String, Option<String>)> {
        if let Some(content) = &request.content {
            return Ok((content.clone(), None));
        }
        let Some(id) = &request.artifact_id else {
            return Err(WorkflowError::MissingTarget);
        };
        match self.services.artifacts.get_artifact(id).await? {
            Some(artifact) => Ok((artifact.content, Some(artifact.id))),
            None => Err(WorkflowError::NotFound {
                kind: "document",
                id: id.clone(),
            }),
        }
    }

    async fn global_clauses(&self) -> Result<String> {
        let references = self
            .services
            .references
            .most_used(self.config.global_reference_limit)
            .await?;
        if references.is_empty() {
            return Err(WorkflowError::NoReferences);
        }
        info!(
            "No requirements given, comparing against {} reference documents",
            references.len()
        );

        let sections = references.iter().map(|reference| {
            (
                reference.title.as_str(),
                self.extractor.extract_key_clauses(&reference.content),
            )
        });
        Ok(join_clause_sections(
            sections,
            self.limits().global_baseline_chars,
        ))
    }

    async fn validate(&self, prepared: Prepared) -> Result<ValidationOutput> {
        let completer = &self.services.completer;

        let baseline = match &prepared.baseline {
            Baseline::Requirements(text) => BaselineText::Requirements(text),
            Baseline::GlobalClauses(text) => BaselineText::GlobalClauses(text),
        };
        let prompt = ValidationPrompt {
            target: &prepared.target,
            baseline,
            context: &prepared.context,
        }
        .render(self.limits());

        let response = completer
            .complete(&CompletionRequest::new(prompt).with_system(VALIDATION_SYSTEM))
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

        let judgment = parse_judgment(&response.content)?;

        let status_update = match &prepared.target_id {
            Some(id) => {
                let status = judgment.status.artifact_status();
                self.services.artifacts.update_status(id, status).await?;
                debug!("Artifact {id} marked {status}");
                Some(status)
            }
            None => None,
        };

        Ok(ValidationOutput {
            judgment,
            target_id: prepared.target_id,
            status_update,
            rag_used: !prepared.context.is_empty(),
            global_clause_mode: matches!(prepared.baseline, Baseline::GlobalClauses(_)),
            context_count: prepared.context.len(),
        })
    }
}

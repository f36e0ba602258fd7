//! Configuration for the generation and validation workflows.

use serde::{Deserialize, Serialize};

use lexrag_llm::ProviderKind;

use crate::clauses::ClauseConfig;

/// Workflow tuning shared by generation and validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Minimum similarity (exclusive) for a reference to count as a match.
    pub similarity_threshold: f32,

    /// Candidates requested when picking a generation reference.
    pub candidate_limit: usize,

    /// Supporting documents requested during validation.
    pub context_limit: usize,

    /// Most-used references compared against in global-clause mode.
    pub global_reference_limit: usize,

    /// Characters of the target used as the search text in global-clause mode.
    pub embedding_prefix_chars: usize,

    /// Clause extraction settings.
    pub clauses: ClauseConfig,

    /// Prompt ceilings for local models.
    pub local_limits: PromptLimits,

    /// Prompt ceilings for hosted models.
    pub cloud_limits: PromptLimits,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.3,
            candidate_limit: 5,
            context_limit: 3,
            global_reference_limit: 3,
            embedding_prefix_chars: 1000,
            clauses: ClauseConfig::default(),
            local_limits: PromptLimits::local(),
            cloud_limits: PromptLimits::cloud(),
        }
    }
}

impl WorkflowConfig {
    /// Set the similarity threshold.
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Set the generation candidate limit.
    pub fn with_candidate_limit(mut self, limit: usize) -> Self {
        self.candidate_limit = limit;
        self
    }

    /// Ceilings for prompts sent to a provider of `kind`.
    pub fn limits_for(&self, kind: ProviderKind) -> &PromptLimits {
        match kind {
            ProviderKind::Local => &self.local_limits,
            ProviderKind::Cloud => &self.cloud_limits,
        }
    }
}

/// Character ceilings applied to each part of a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptLimits {
    /// Document under validation.
    pub target_chars: usize,

    /// Requirements text in query mode.
    pub requirements_chars: usize,

    /// Concatenated clause extracts in global-clause mode.
    pub global_baseline_chars: usize,

    /// Summary of retrieved supporting documents.
    pub context_chars: usize,

    /// Reference document used for generation.
    pub reference_chars: usize,
}

impl PromptLimits {
    pub fn local() -> Self {
        Self {
            target_chars: 6_000,
            requirements_chars: 3_000,
            global_baseline_chars: 3_000,
            context_chars: 1_500,
            reference_chars: 6_000,
        }
    }

    pub fn cloud() -> Self {
        Self {
            target_chars: 30_000,
            requirements_chars: 15_000,
            global_baseline_chars: 12_000,
            context_chars: 6_000,
            reference_chars: 24_000,
        }
    }
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self::cloud()
    }
}

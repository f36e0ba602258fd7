//! Structured compliance judgments parsed from model replies.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{Result, WorkflowError};
use crate::store::ArtifactStatus;

/// Overall verdict of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgmentStatus {
    Compliant,
    #[serde(alias = "issues-found")]
    IssuesFound,
    Failed,
}

impl JudgmentStatus {
    /// Artifact status recorded for a document that received this verdict.
    pub fn artifact_status(self) -> ArtifactStatus {
        match self {
            JudgmentStatus::Compliant => ArtifactStatus::Validated,
            JudgmentStatus::IssuesFound => ArtifactStatus::Pending,
            JudgmentStatus::Failed => ArtifactStatus::Draft,
        }
    }
}

/// Severities the model may report; unrecognised ones read as `Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    #[serde(other)]
    Info,
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

/// The model's verdict on a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub status: JudgmentStatus,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

/// First JSON object embedded anywhere in `reply`.
///
/// Models wrap their JSON in prose or code fences often enough that the reply
/// is scanned for the first `{` that starts a complete object.
pub fn extract_json_object(reply: &str) -> Option<Value> {
    reply.match_indices('{').find_map(|(idx, _)| {
        let mut stream = serde_json::Deserializer::from_str(&reply[idx..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value @ Value::Object(_))) => Some(value),
            _ => None,
        }
    })
}

/// Parse a model reply into a [`Judgment`].
pub fn parse_judgment(reply: &str) -> Result<Judgment> {
    let Some(object) = extract_json_object(reply) else {
        warn!("Model reply held no JSON object");
        return Err(WorkflowError::InvalidResponseFormat);
    };
    serde_json::from_value(object).map_err(|e| {
        warn!("Model reply did not match the judgment shape: {e}");
        WorkflowError::InvalidResponseFormat
    })
}

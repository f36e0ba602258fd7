//! Prompt assembly for generation and validation.
//!
//! Every variable part of a prompt is cut to its [`PromptLimits`] ceiling
//! before it is interpolated, so prompt size is bounded by the limits plus the
//! fixed instruction text.

use lexrag_retrieval::RetrievedReference;

use crate::config::PromptLimits;
use crate::text::{truncate_chars, truncate_marked};

pub(crate) const GENERATION_SYSTEM: &str = "You are a legal drafting assistant. \
Produce a complete, professionally formatted document. Follow the structure and \
wording conventions of the reference document when one is provided. Output only \
the document text.";

pub(crate) const VALIDATION_SYSTEM: &str = "You are a contract compliance reviewer. \
Respond with a single JSON object of the form \
{\"status\": \"compliant\" | \"issues_found\" | \"failed\", \"summary\": string, \
\"issues\": [{\"severity\": \"error\" | \"warning\" | \"info\", \"message\": string, \
\"section\": string}]} and nothing else.";

/// Inputs to a generation prompt.
pub(crate) struct GenerationPrompt<'a> {
    pub query: &'a str,
    pub title: &'a str,
    pub document_type: &'a str,
    pub parties: &'a [String],
    pub reference: &'a str,
}

impl GenerationPrompt<'_> {
    pub fn render(&self, limits: &PromptLimits) -> String {
        let mut prompt = format!(
            "Draft a {document_type} titled \"{title}\".\n\nRequest:\n{query}\n",
            document_type = self.document_type,
            title = self.title,
            query = self.query,
        );

        if !self.parties.is_empty() {
            prompt.push_str("\nParties:\n");
            for party in self.parties {
                prompt.push_str(&format!("- {party}\n"));
            }
        }

        prompt.push_str("\nReference document:\n---\n");
        prompt.push_str(&truncate_marked(self.reference, limits.reference_chars));
        prompt.push_str("\n---\n");

        prompt
    }
}

/// What a document is checked against.
pub(crate) enum BaselineText<'a> {
    /// Caller-supplied requirements.
    Requirements(&'a str),
    /// Key clauses of the most used references, already concatenated.
    GlobalClauses(&'a str),
}

/// Inputs to a validation prompt.
pub(crate) struct ValidationPrompt<'a> {
    pub target: &'a str,
    pub baseline: BaselineText<'a>,
    pub context: &'a [RetrievedReference],
}

impl ValidationPrompt<'_> {
    pub fn render(&self, limits: &PromptLimits) -> String {
        let mut prompt = match self.baseline {
            BaselineText::Requirements(requirements) => format!(
                "Check whether the document below satisfies these requirements.\n\n\
                 Requirements:\n{}\n",
                truncate_marked(requirements, limits.requirements_chars)
            ),
            BaselineText::GlobalClauses(clauses) => format!(
                "No explicit requirements were given. Compare the document below \
                 against the key clauses of the organisation's standard documents \
                 and report missing or conflicting clauses.\n\n\
                 Standard clauses:\n{}\n",
                truncate_chars(clauses, limits.global_baseline_chars)
            ),
        };

        let context = summarize_context(self.context, limits.context_chars);
        if !context.is_empty() {
            prompt.push_str("\nRelated documents:\n");
            prompt.push_str(&context);
            prompt.push('\n');
        }

        prompt.push_str("\nDocument:\n---\n");
        prompt.push_str(&truncate_marked(self.target, limits.target_chars));
        prompt.push_str("\n---\n");
        prompt
    }
}

/// Short listing of retrieved documents, cut to `max_chars` in total.
pub(crate) fn summarize_context(context: &[RetrievedReference], max_chars: usize) -> String {
    let listing = context
        .iter()
        .map(|r| {
            format!(
                "[{}] (similarity {:.2}) {}",
                r.reference_id, r.similarity, r.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    truncate_chars(&listing, max_chars).to_string()
}

/// Global-clause baseline: each reference's clauses under a title header.
pub(crate) fn join_clause_sections<'a>(
    sections: impl IntoIterator<Item = (&'a str, String)>,
    max_chars: usize,
) -> String {
    let joined = sections
        .into_iter()
        .map(|(title, clauses)| format!("### {title}\n{clauses}"))
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_chars(&joined, max_chars).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn retrieved(id: &str, similarity: f32, content: &str) -> RetrievedReference {
        RetrievedReference {
            reference_id: id.to_string(),
            content: content.to_string(),
            similarity,
            metadata: json!({}),
        }
    }

    #[test]
    fn test_generation_prompt_truncates_reference() {
        let limits = PromptLimits::local();
        let reference = "r".repeat(limits.reference_chars + 100);
        let parties = vec!["Acme".to_string(), "Globex".to_string()];
        let prompt = GenerationPrompt {
            query: "mutual confidentiality",
            title: "Pilot NDA",
            document_type: "nda",
            parties: &parties,
            reference: &reference,
        }
        .render(&limits);

        assert!(prompt.contains("Draft a nda titled \"Pilot NDA\""));
        assert!(prompt.contains("- Acme\n- Globex\n"));
        assert!(prompt.contains("[... truncated]"));
        assert!(!prompt.contains(&reference));
    }

    #[test]
    fn test_generation_prompt_without_parties() {
        let prompt = GenerationPrompt {
            query: "q",
            title: "t",
            document_type: "letter",
            parties: &[],
            reference: "Dear Sir",
        }
        .render(&PromptLimits::cloud());

        assert!(prompt.contains("Reference document:\n---\nDear Sir\n---\n"));
        assert!(!prompt.contains("Parties:"));
    }

    #[test]
    fn test_validation_prompt_bounds_every_part() {
        let limits = PromptLimits::local();
        let target = "t".repeat(50_000);
        let requirements = "q".repeat(50_000);
        let context = vec![retrieved("a", 0.9, &"c".repeat(50_000))];

        let prompt = ValidationPrompt {
            target: &target,
            baseline: BaselineText::Requirements(&requirements),
            context: &context,
        }
        .render(&limits);

        let budget = limits.target_chars + limits.requirements_chars + limits.context_chars;
        assert!(prompt.chars().count() < budget + 1_000);
    }

    #[test]
    fn test_context_summary() {
        let summary = summarize_context(
            &[retrieved("a", 0.91, "alpha"), retrieved("b", 0.5, "beta")],
            1_000,
        );
        assert_eq!(
            summary,
            "[a] (similarity 0.91) alpha\n[b] (similarity 0.50) beta"
        );
        assert_eq!(summarize_context(&[], 1_000), "");
    }

    #[test]
    fn test_join_clause_sections() {
        let joined = join_clause_sections(
            [
                ("Standard NDA", "Term\nTwo years...".to_string()),
                ("MSA", "Payment\nNet 30...".to_string()),
            ],
            1_000,
        );
        assert_eq!(
            joined,
            "### Standard NDA\nTerm\nTwo years...\n\n### MSA\nPayment\nNet 30..."
        );
        assert_eq!(join_clause_sections([("A", "x".repeat(20))], 5).len(), 5);
    }
}

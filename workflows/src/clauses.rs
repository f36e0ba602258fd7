//! Key-clause extraction for compressing long reference documents.
//!
//! This is a heuristic, not a parser. Lines that look like section headings
//! for well-known contract sections are kept together with the start of their
//! body; everything else is dropped. Missed clauses and false headings are
//! acceptable. The output length ceiling is the only hard guarantee.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::text::truncate_chars;

static HEADING: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:\d+(?:\.\d+)*\.?[ \t]*)?(?:definitions?|termination|term|payment|compensation|confidentiality|non-disclosure|intellectual[ \t]+property|warrant(?:y|ies)|liability|indemnification|dispute(?:[ \t]+resolution)?|governing[ \t]+law|amendments?|signatures?)\b[^\n]*",
    )
    .ok()
});

const ELLIPSIS: &str = "...";

/// Clause extraction budgets, in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClauseConfig {
    /// Body characters kept after each heading.
    pub clause_body_chars: usize,

    /// Characters returned when no heading is found.
    pub fallback_chars: usize,

    /// Hard ceiling on the output.
    pub max_output_chars: usize,
}

impl Default for ClauseConfig {
    fn default() -> Self {
        Self {
            clause_body_chars: 500,
            fallback_chars: 2_000,
            max_output_chars: 4_000,
        }
    }
}

/// Pulls well-known contract sections out of a document.
#[derive(Debug, Clone, Default)]
pub struct ClauseExtractor {
    config: ClauseConfig,
}

impl ClauseExtractor {
    pub fn new(config: ClauseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClauseConfig {
        &self.config
    }

    /// Compress `text` to its key clauses.
    ///
    /// Falls back to the first `fallback_chars` characters when no heading is
    /// recognised. Never longer than `max_output_chars`.
    pub fn extract_key_clauses(&self, text: &str) -> String {
        let headings: Vec<(usize, usize)> = HEADING
            .as_ref()
            .map(|re| re.find_iter(text).map(|m| (m.start(), m.end())).collect())
            .unwrap_or_default();

        let ceiling = self.config.max_output_chars;
        if headings.is_empty() {
            let fallback = self.config.fallback_chars.min(ceiling);
            return truncate_chars(text, fallback).to_string();
        }

        let clauses: Vec<String> = headings
            .iter()
            .enumerate()
            .map(|(i, &(start, end))| {
                let heading = text[start..end].trim();
                let body_end = headings.get(i + 1).map_or(text.len(), |next| next.0);
                let body =
                    truncate_chars(text[end..body_end].trim(), self.config.clause_body_chars);
                if body.is_empty() {
                    format!("{heading}{ELLIPSIS}")
                } else {
                    format!("{heading}\n{body}{ELLIPSIS}")
                }
            })
            .collect();

        debug!("Extracted {} clauses", clauses.len());
        truncate_chars(&clauses.join("\n\n"), ceiling).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONTRACT: &str = "MUTUAL NON-DISCLOSURE AGREEMENT\n\
        This agreement is made between Acme and Globex.\n\
        \n\
        1. Definitions\n\
        \"Confidential Information\" means any non-public information.\n\
        \n\
        2. Term\n\
        This agreement lasts two years.\n\
        \n\
        3. Governing Law\n\
        The laws of Delaware apply.\n";

    #[test]
    fn test_extracts_numbered_headings_with_bodies() {
        let extractor = ClauseExtractor::default();

        let output = extractor.extract_key_clauses(CONTRACT);

        assert_eq!(
            output,
            "1. Definitions\n\"Confidential Information\" means any non-public information....\n\n\
             2. Term\nThis agreement lasts two years....\n\n\
             3. Governing Law\nThe laws of Delaware apply...."
        );
    }

    #[test]
    fn test_headings_are_case_insensitive() {
        let extractor = ClauseExtractor::default();
        let output = extractor.extract_key_clauses("LIMITATION\nLIABILITY\nCapped at fees paid.");
        assert_eq!(output, "LIABILITY\nCapped at fees paid....");
    }

    #[test]
    fn test_body_is_capped() {
        let extractor = ClauseExtractor::new(ClauseConfig {
            clause_body_chars: 10,
            ..ClauseConfig::default()
        });
        let text = format!("Termination\n{}", "x".repeat(100));

        let output = extractor.extract_key_clauses(&text);

        assert_eq!(output, format!("Termination\n{}...", "x".repeat(10)));
    }

    #[test]
    fn test_fallback_is_prefix_of_input() {
        let extractor = ClauseExtractor::default();
        let text = "lorem ipsum ".repeat(500);

        let output = extractor.extract_key_clauses(&text);

        assert_eq!(output.chars().count(), 2_000);
        assert!(text.starts_with(&output));
    }

    #[test]
    fn test_short_input_without_headings_is_returned_whole() {
        let extractor = ClauseExtractor::default();
        assert_eq!(extractor.extract_key_clauses("just a note"), "just a note");
    }

    #[test]
    fn test_output_never_exceeds_ceiling() {
        let extractor = ClauseExtractor::default();
        let section = format!("Payment\n{}\n", "y".repeat(600));
        let text = section.repeat(50);

        let output = extractor.extract_key_clauses(&text);

        assert!(output.chars().count() <= extractor.config().max_output_chars);
        assert!(output.starts_with("Payment\n"));
    }

    #[test]
    fn test_word_prefix_is_not_a_heading() {
        let extractor = ClauseExtractor::default();
        // "Terms" is not the "Term" heading.
        let output = extractor.extract_key_clauses("Terms of service apply.");
        assert_eq!(output, "Terms of service apply.");
    }
}

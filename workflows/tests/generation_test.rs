//! Integration tests for the generation workflow.

mod common;

use std::sync::Arc;

use common::{FakeCompleter, FakeEmbedder, FixedIndex, Harness, Reply, matched, reference};
use lexrag_llm::ProviderKind;
use lexrag_retrieval::InMemoryVectorIndex;
use lexrag_workflows::{
    ArtifactStatus, ArtifactStore, GenerationRequest, GenerationWorkflow, ReferenceStore,
    WorkflowError,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn library() -> Vec<lexrag_workflows::Reference> {
    vec![
        reference("lease", "Office Lease", "1. Term\nFive years.", 4),
        reference(
            "nda",
            "Standard NDA",
            "1. Confidentiality\nEach party keeps the other's information secret.",
            0,
        ),
    ]
}

fn pilot_request() -> GenerationRequest {
    GenerationRequest::new(
        "mutual confidentiality for a two-year pilot",
        "Pilot NDA",
        "nda",
    )
    .with_party("Acme Corp")
    .with_party("Globex")
}

#[tokio::test]
async fn test_matching_reference_is_used() {
    let harness = Harness::new(
        library(),
        FakeEmbedder::new(),
        FixedIndex::with_rows(vec![matched("nda", 0.82), matched("lease", 0.41)]),
        FakeCompleter::replying("MUTUAL NON-DISCLOSURE AGREEMENT ..."),
    );
    let workflow = GenerationWorkflow::new(harness.services(), harness.config.clone());

    let output = workflow.run(&pilot_request()).await.unwrap();

    assert!(output.rag_used);
    assert_eq!(output.reference_id, "nda");
    assert_eq!(output.candidate_count, 2);
    assert_eq!(output.content, "MUTUAL NON-DISCLOSURE AGREEMENT ...");

    let artifact = harness
        .store
        .get_artifact(&output.artifact_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(artifact.status, ArtifactStatus::Draft);
    assert_eq!(artifact.title, "Pilot NDA");
    assert_eq!(artifact.metadata["ragEnabled"], true);
    assert_eq!(artifact.metadata["referenceId"], "nda");
    assert_eq!(artifact.metadata["candidateCount"], 2);
    assert_eq!(
        artifact.metadata["parties"],
        serde_json::json!(["Acme Corp", "Globex"])
    );

    let nda = harness.store.get_reference("nda").await.unwrap().unwrap();
    assert_eq!(nda.usage_count, 1);

    let prompts = harness.completer.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Each party keeps the other's information secret."));
    assert!(prompts[0].contains("mutual confidentiality for a two-year pilot"));
}

#[tokio::test]
async fn test_in_memory_index_ranks_by_cosine_similarity() {
    let pilot = pilot_request();
    let harness = Harness::new(
        library(),
        FakeEmbedder::with_vectors(vec![(pilot.query.as_str(), vec![0.82, 0.5724, 0.0])]),
        FixedIndex::unconfigured(),
        FakeCompleter::replying("MUTUAL NON-DISCLOSURE AGREEMENT ..."),
    );
    let index = Arc::new(InMemoryVectorIndex::new(3));
    for (id, vector) in [
        ("lease", vec![0.0, 1.0, 0.0]),
        ("nda", vec![1.0, 0.0, 0.0]),
        ("archive", vec![0.0, 0.0, 1.0]),
    ] {
        index
            .add(id, format!("content of {id}"), vector, json!({}))
            .await
            .unwrap();
    }
    let workflow = GenerationWorkflow::new(harness.services_over(index), harness.config.clone());

    let output = workflow.run(&pilot).await.unwrap();

    // nda scores ~0.82 and lease ~0.57; archive is orthogonal and falls below the threshold.
    assert!(output.rag_used);
    assert_eq!(output.reference_id, "nda");
    assert_eq!(output.candidate_count, 2);
    assert_eq!(harness.embedder.texts(), vec![pilot.query.clone()]);
    assert_eq!(harness.index.calls(), 0);

    let artifact = harness
        .store
        .get_artifact(&output.artifact_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(artifact.metadata["ragEnabled"], true);
    assert_eq!(artifact.metadata["referenceId"], "nda");

    let nda = harness.store.get_reference("nda").await.unwrap().unwrap();
    assert_eq!(nda.usage_count, 1);
    let prompt = &harness.completer.prompts()[0];
    assert!(prompt.contains("Each party keeps the other's information secret."));
}

#[tokio::test]
async fn test_empty_library_fails_without_artifact() {
    let harness = Harness::new(
        Vec::new(),
        FakeEmbedder::new(),
        FixedIndex::with_rows(vec![matched("nda", 0.9)]),
        FakeCompleter::replying("unused"),
    );
    let workflow = GenerationWorkflow::new(harness.services(), harness.config.clone());

    let err = workflow.run(&pilot_request()).await.unwrap_err();

    assert!(matches!(err, WorkflowError::NoReferences));
    assert_eq!(err.to_string(), "no references available");
    assert_eq!(harness.store.artifact_count().await, 0);
    assert!(harness.completer.prompts().is_empty());
}

#[tokio::test]
async fn test_no_match_falls_back_to_first_reference() {
    let harness = Harness::new(
        library(),
        FakeEmbedder::new(),
        FixedIndex::with_rows(vec![matched("nda", 0.2)]),
        FakeCompleter::replying("draft"),
    );
    let workflow = GenerationWorkflow::new(harness.services(), harness.config.clone());

    let output = workflow.run(&pilot_request()).await.unwrap();

    assert!(!output.rag_used);
    assert_eq!(output.reference_id, "lease");
    assert_eq!(output.candidate_count, 0);

    let artifact = harness
        .store
        .get_artifact(&output.artifact_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(artifact.metadata["ragEnabled"], false);

    // Fallback does not count as usage.
    let lease = harness.store.get_reference("lease").await.unwrap().unwrap();
    assert_eq!(lease.usage_count, 4);
}

#[tokio::test]
async fn test_unconfigured_index_skips_embedding() {
    let harness = Harness::new(
        library(),
        FakeEmbedder::new(),
        FixedIndex::unconfigured(),
        FakeCompleter::replying("draft"),
    );
    let workflow = GenerationWorkflow::new(harness.services(), harness.config.clone());

    let output = workflow.run(&pilot_request()).await.unwrap();

    assert!(!output.rag_used);
    assert_eq!(output.reference_id, "lease");
    assert_eq!(harness.embedder.calls(), 0);
    assert_eq!(harness.index.calls(), 0);
}

#[tokio::test]
async fn test_embedding_quota_falls_back() {
    let harness = Harness::new(
        library(),
        FakeEmbedder::quota_exhausted(),
        FixedIndex::with_rows(vec![matched("nda", 0.9)]),
        FakeCompleter::replying("draft"),
    );
    let workflow = GenerationWorkflow::new(harness.services(), harness.config.clone());

    let output = workflow.run(&pilot_request()).await.unwrap();

    assert!(!output.rag_used);
    assert_eq!(harness.embedder.calls(), 1);
    assert_eq!(harness.index.calls(), 0);
}

#[tokio::test]
async fn test_search_failure_falls_back() {
    let harness = Harness::new(
        library(),
        FakeEmbedder::new(),
        FixedIndex::failing(),
        FakeCompleter::replying("draft"),
    );
    let workflow = GenerationWorkflow::new(harness.services(), harness.config.clone());

    let output = workflow.run(&pilot_request()).await.unwrap();

    assert!(!output.rag_used);
    assert_eq!(output.reference_id, "lease");
}

#[tokio::test]
async fn test_unknown_top_candidate_keeps_candidates() {
    let harness = Harness::new(
        library(),
        FakeEmbedder::new(),
        FixedIndex::with_rows(vec![matched("deleted", 0.95), matched("nda", 0.8)]),
        FakeCompleter::replying("draft"),
    );
    let workflow = GenerationWorkflow::new(harness.services(), harness.config.clone());

    let output = workflow.run(&pilot_request()).await.unwrap();

    assert!(!output.rag_used);
    assert_eq!(output.reference_id, "lease");
    assert_eq!(output.candidate_count, 2);
}

#[tokio::test]
async fn test_completion_failure_is_terminal() {
    let harness = Harness::new(
        library(),
        FakeEmbedder::new(),
        FixedIndex::with_rows(vec![matched("nda", 0.9)]),
        FakeCompleter::with(Reply::Refused, ProviderKind::Local),
    );
    let workflow = GenerationWorkflow::new(harness.services(), harness.config.clone());

    let err = workflow.run(&pilot_request()).await.unwrap_err();

    assert!(matches!(err, WorkflowError::ProviderUnavailable { .. }));
    assert!(err.to_string().contains("ollama serve"));
    assert_eq!(harness.store.artifact_count().await, 0);
}

#[tokio::test]
async fn test_local_provider_gets_smaller_reference() {
    let long_reference = format!("1. Term\n{}", "z".repeat(20_000));
    let harness = Harness::new(
        vec![reference("long", "Long Form", &long_reference, 0)],
        FakeEmbedder::new(),
        FixedIndex::with_rows(vec![matched("long", 0.9)]),
        FakeCompleter::with(Reply::Text("draft".to_string()), ProviderKind::Local),
    );
    let workflow = GenerationWorkflow::new(harness.services(), harness.config.clone());

    workflow.run(&pilot_request()).await.unwrap();

    let prompt = &harness.completer.prompts()[0];
    assert!(prompt.contains("[... truncated]"));
    assert!(prompt.chars().count() < harness.config.local_limits.reference_chars + 1_000);
}

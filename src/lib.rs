//! Verified BRD Orchestrator.
//!
//! Reverse-engineers an existing codebase into a Business Requirements
//! Document, section by section: generate prose from an [`AggregatedContext`],
//! extract verifiable claims from it, check each claim directly against a
//! code graph, and regenerate with targeted feedback until the section's
//! confidence clears the acceptance threshold or iterations run out.
//!
//! The full requirements this crate implements live in SPEC_FULL.md at the
//! repository root; the grounding for each module is in DESIGN.md.
//!
//! ## Layout
//! - [`services`] — the three external collaborator traits (code graph,
//!   filesystem, LLM session) and the [`Services`] bundle that carries them.
//! - [`aggregator`] — builds and compresses the context handed to every
//!   section's generation prompt.
//! - [`prompt`] — composes the generation prompt for one section.
//! - [`llm`] — wraps an [`LlmSession`] with timeout/fallback handling and
//!   normalizes its event envelope.
//! - [`claims`] — extracts claims from generated prose and verifies each
//!   one against the code graph.
//! - [`feedback`] — turns a failed section's issues into the next prompt's
//!   feedback block.
//! - [`assembler`] — collates accepted sections into the final document.
//! - [`skills`] — loads trigger-phrase-indexed skill definitions.
//! - [`orchestrator`] — the per-section generate/verify/regenerate loop.

pub mod aggregator;
pub mod assembler;
pub mod claims;
pub mod config;
pub mod error;
pub mod feedback;
pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod services;
pub mod skills;
pub mod types;

pub use aggregator::ContextAggregator;
pub use assembler::{BrdDocument, SectionAssembler, SectionParser};
pub use config::{default_sections, AggregatorConfig, DetailLevel, VerificationConfig, VerificationLimits};
pub use error::{AggregationError, FsError, GraphError, LlmError, OrchestratorError};
pub use llm::LlmAdapter;
pub use orchestrator::{BrdMetadata, BrdRunResult, Cancellation, CancellationFlag, Orchestrator, ProgressFn};
pub use services::{CodeGraphService, FilesystemService, GraphNode, GraphQueryResult, LlmSession, Services};
pub use skills::{SkillDefinition, SkillLoader};
pub use types::*;

/// End-to-end convenience entry point: aggregate context for `request` and
/// run the full generate/verify/regenerate loop over it with no streaming
/// progress and no cancellation support.
///
/// Callers that need either should drive [`ContextAggregator`] and
/// [`Orchestrator`] directly; this is the no-frills one-shot path.
pub async fn generate_brd(
    services: Services,
    request: &str,
    aggregator_config: AggregatorConfig,
    verification_config: VerificationConfig,
) -> Result<BrdRunResult, OrchestratorError> {
    if request.trim().is_empty() {
        return Err(OrchestratorError::Aggregation(AggregationError::EmptyRequest));
    }
    if let Some(sections) = &verification_config.section_configs {
        if sections.is_empty() {
            return Err(OrchestratorError::NoSections);
        }
    }

    let aggregator = ContextAggregator::new(services.clone(), aggregator_config);
    let context = aggregator
        .build_context(request, &[], true, orchestrator::silent_progress())
        .await;

    let run = Orchestrator::new(services, verification_config);
    Ok(run.generate_verified_brd(&context, None, orchestrator::silent_progress()).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FsError, GraphError, LlmError};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct EmptyGraph;
    #[async_trait]
    impl CodeGraphService for EmptyGraph {
        async fn query(&self, _cypher_like: &str) -> Result<GraphQueryResult, GraphError> {
            Ok(GraphQueryResult::default())
        }
    }

    struct EmptyFs;
    #[async_trait]
    impl FilesystemService for EmptyFs {
        async fn read_file(&self, path: &str) -> Result<String, FsError> {
            Err(FsError::NotFound(path.to_string()))
        }
        async fn search_files(&self, _glob: &str) -> Result<Vec<String>, FsError> {
            Ok(Vec::new())
        }
        async fn exists(&self, _path: &str) -> bool {
            false
        }
    }

    struct MockLlm;
    #[async_trait]
    impl LlmSession for MockLlm {
        async fn send_and_wait(&self, _prompt: &str, _timeout: Duration) -> Result<String, LlmError> {
            Ok("## Section\n\nNothing verifiable here.".to_string())
        }
    }

    fn services() -> Services {
        Services::new(Arc::new(EmptyGraph), Arc::new(EmptyFs), Arc::new(MockLlm))
    }

    #[tokio::test]
    async fn empty_request_is_rejected_before_any_generation() {
        let err = generate_brd(services(), "   ", AggregatorConfig::default(), VerificationConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Aggregation(AggregationError::EmptyRequest)));
    }

    #[tokio::test]
    async fn empty_section_list_is_rejected() {
        let mut config = VerificationConfig::default();
        config.section_configs = Some(Vec::new());
        let err = generate_brd(services(), "a feature", AggregatorConfig::default(), config)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::NoSections));
    }

    #[tokio::test]
    async fn end_to_end_run_produces_a_brd_for_every_default_section() {
        let result = generate_brd(services(), "password reset", AggregatorConfig::default(), VerificationConfig::default())
            .await
            .unwrap();

        assert_eq!(result.evidence.sections.len(), default_sections().len());
        assert!(!result.metadata.cancelled);
    }
}

//! Orchestrator (SPEC_FULL.md §4.1): drives the per-section
//! generate -> verify -> regenerate loop, tracks the best result per
//! section, and assembles the final artifact. Grounded in
//! `MultiAgentOrchestrator.generate_verified_brd` /
//! `_process_section`.

use crate::assembler::{BrdDocument, SectionAssembler};
use crate::claims::{build_extraction_prompt, extract_claims, strip_reasoning_and_fences, ClaimVerifier};
use crate::config::VerificationConfig;
use crate::feedback::build_feedback;
use crate::llm::LlmAdapter;
use crate::prompt::build_generation_prompt;
use crate::services::Services;
use crate::types::{AggregatedContext, ClaimStatus, EvidenceBundle, HallucinationRisk, SectionConfig, SectionResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use uuid::Uuid;

const LLM_GENERATION_TIMEOUT: Duration = Duration::from_secs(300);
const LLM_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(120);

/// External cancellation signal, checked at every suspension point.
pub trait Cancellation: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

/// A simple `Arc<AtomicBool>`-backed cancellation flag a caller can flip
/// from another task.
#[derive(Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl Cancellation for CancellationFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress callback signature: `(step_code, detail)`, matching the
/// stable enumeration in SPEC_FULL.md §6. Emission is best-effort; the
/// orchestrator never propagates a callback panic/error — Rust closures
/// can't fail here by construction, so this is enforced by the type.
pub type ProgressFn<'a> = dyn Fn(&str, &str) + Send + Sync + 'a;

fn noop_progress(_step: &str, _detail: &str) {}

/// Run-level metrics returned alongside the BRD and evidence bundle.
#[derive(Debug, Clone)]
pub struct BrdMetadata {
    /// Correlates this run's log lines and progress events for a caller
    /// juggling several concurrent `generate_verified_brd` invocations.
    pub run_id: Uuid,
    pub iterations: u32,
    pub regenerations: u32,
    pub claims_verified: usize,
    pub claims_failed: usize,
    pub generation_time_ms: u64,
    pub overall_confidence: f32,
    pub hallucination_risk: HallucinationRisk,
    pub cancelled: bool,
}

/// The complete return value of `generate_verified_brd`.
#[derive(Debug, Clone)]
pub struct BrdRunResult {
    pub brd: BrdDocument,
    pub evidence: EvidenceBundle,
    pub metadata: BrdMetadata,
}

pub struct Orchestrator {
    services: Services,
    config: VerificationConfig,
    llm: LlmAdapter,
}

impl Orchestrator {
    pub fn new(services: Services, config: VerificationConfig) -> Self {
        let llm = LlmAdapter::new(services.llm.clone());
        Self { services, config, llm }
    }

    pub fn with_llm_adapter(services: Services, config: VerificationConfig, llm: LlmAdapter) -> Self {
        Self { services, config, llm }
    }

    fn sections(&self) -> Vec<SectionConfig> {
        self.config.section_configs.clone().unwrap_or_else(crate::config::default_sections)
    }

    /// Run the full section-by-section generate/verify/regenerate loop.
    /// Always returns a `BrdRunResult` — no error condition aborts the
    /// run short of the caller's own cancellation signal.
    pub async fn generate_verified_brd(
        &self,
        context: &AggregatedContext,
        cancellation: Option<&dyn Cancellation>,
        progress: &ProgressFn<'_>,
    ) -> BrdRunResult {
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        let sections = self.sections();

        info!(%run_id, count = sections.len(), "starting section-by-section BRD generation");
        // Run-level start event uses the `context` step code, not `generator` —
        // `generator` is reserved for per-section-iteration generation (see
        // `process_section`), so the first `generator` event a caller observes
        // always follows that section's `section` event, per spec.md §6/§8.
        progress("context", &format!("Starting generation: {} sections to process", sections.len()));

        let mut accepted_sections: Vec<SectionResult> = Vec::new();
        let mut previous_text: Vec<(String, String)> = Vec::new();
        let mut total_iterations = 0u32;
        let mut total_regenerations = 0u32;
        let mut cancelled = false;

        for (idx, section_config) in sections.iter().enumerate() {
            progress(
                "section",
                &format!("Section {}/{}: {}", idx + 1, sections.len(), section_config.name),
            );

            if cancellation.map(Cancellation::is_cancelled).unwrap_or(false) {
                cancelled = true;
                break;
            }

            let outcome = self
                .process_section(section_config, context, &previous_text, cancellation, progress)
                .await;

            let Some((result, iterations, regenerations)) = outcome else {
                cancelled = true;
                break;
            };

            total_iterations += iterations;
            total_regenerations += regenerations;

            let status_icon = if result.overall_confidence >= self.config.min_confidence_for_approval {
                "accepted"
            } else {
                "partial"
            };
            progress(
                "section_complete",
                &format!(
                    "{status_icon} {}: {}/{} claims verified ({:.0}% confidence)",
                    result.name,
                    result.claims.iter().filter(|c| c.status() == ClaimStatus::Verified).count(),
                    result.claims.len(),
                    result.overall_confidence * 100.0
                ),
            );

            previous_text.push((result.name.clone(), result.generated_text.clone()));
            accepted_sections.push(result);
        }

        let brd = SectionAssembler::assemble(&context.request, &accepted_sections);
        let evidence = EvidenceBundle::from_sections(accepted_sections);

        let claims_verified = evidence.verified_claims;
        let claims_failed = evidence.total_claims - evidence.verified_claims;

        let metadata = BrdMetadata {
            run_id,
            iterations: total_iterations,
            regenerations: total_regenerations,
            claims_verified,
            claims_failed,
            generation_time_ms: start.elapsed().as_millis() as u64,
            overall_confidence: evidence.overall_confidence,
            hallucination_risk: evidence.hallucination_risk,
            cancelled,
        };

        info!(
            %run_id,
            confidence = metadata.overall_confidence,
            risk = ?metadata.hallucination_risk,
            sections = evidence.sections.len(),
            "BRD generation complete"
        );

        BrdRunResult { brd, evidence, metadata }
    }

    /// Process one section end-to-end: up to `max_iterations` rounds of
    /// generate -> extract -> verify, tracking the best result seen.
    /// Returns `None` if cancellation fires at a suspension point — the
    /// caller discards any partial work for this section in that case.
    async fn process_section(
        &self,
        section_config: &SectionConfig,
        context: &AggregatedContext,
        previous_sections: &[(String, String)],
        cancellation: Option<&dyn Cancellation>,
        progress: &ProgressFn<'_>,
    ) -> Option<(SectionResult, u32, u32)> {
        let mut best: Option<SectionResult> = None;
        let mut feedback: Option<String> = None;
        let mut iterations = 0u32;
        let mut regenerations = 0u32;

        for iteration in 1..=self.config.max_iterations {
            if cancellation.map(Cancellation::is_cancelled).unwrap_or(false) {
                return None;
            }

            if iteration > 1 {
                progress(
                    "feedback",
                    &format!("Regenerating {} (attempt {iteration}/{})", section_config.name, self.config.max_iterations),
                );
            }

            progress("generator", &format!("Generating content for: {}", section_config.name));
            let prompt = build_generation_prompt(
                &section_config.name,
                section_config.description.as_deref(),
                section_config.target_words,
                context,
                previous_sections,
                feedback.as_deref(),
                self.config.detail_level,
            );
            let raw_response = self.llm.complete(&prompt, LLM_GENERATION_TIMEOUT).await;
            let generated_text = strip_reasoning_and_fences(&raw_response);
            iterations += 1;

            if cancellation.map(Cancellation::is_cancelled).unwrap_or(false) {
                return None;
            }

            progress("verifier", &format!("Verifying claims in: {}", section_config.name));
            let extraction_prompt = build_extraction_prompt(&section_config.name, &generated_text);
            let extraction_response = self.llm.complete(&extraction_prompt, LLM_EXTRACTION_TIMEOUT).await;
            let mut claims = extract_claims(&section_config.name, &extraction_response);
            progress("claims", &format!("Extracted {} claims from {}", claims.len(), section_config.name));

            let verifier = ClaimVerifier::new(self.services.graph.clone());
            let total = claims.len();
            for (i, claim) in claims.iter_mut().enumerate() {
                verifier.verify(claim, &self.config.verification_limits, self.config.min_confidence_for_approval).await;
                if (i + 1) == total || (i + 1) % 3 == 0 {
                    let verified_so_far = i + 1; // progress heartbeat, not a correctness signal
                    progress(
                        "verifying",
                        &format!("Verifying claims: {}/{total} ({verified_so_far} processed)", i + 1),
                    );
                }
            }

            let mut result = SectionResult {
                name: section_config.name.clone(),
                generated_text,
                claims,
                overall_confidence: 0.0,
                issues: Vec::new(),
                suggestions: Vec::new(),
            };
            result.recompute_confidence();

            if result.overall_confidence < self.config.min_confidence_for_approval {
                result.issues.push(format!(
                    "Section confidence {:.0}% below the {:.0}% acceptance threshold",
                    result.overall_confidence * 100.0,
                    self.config.min_confidence_for_approval * 100.0
                ));
            }

            let is_better = match &best {
                None => true,
                Some(current_best) => result.overall_confidence > current_best.overall_confidence,
            };
            if is_better {
                best = Some(result.clone());
            }

            if result.overall_confidence >= self.config.min_confidence_for_approval {
                return Some((result, iterations, regenerations));
            }

            if iteration < self.config.max_iterations {
                feedback = Some(build_feedback(&section_config.name, &result));
                regenerations += 1;
            }
        }

        Some((best.unwrap_or_else(|| SectionResult::empty(&section_config.name)), iterations, regenerations))
    }
}

/// Convenience no-op progress callback for callers that don't need
/// streaming updates.
pub fn silent_progress() -> &'static ProgressFn<'static> {
    &noop_progress
}

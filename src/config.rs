//! Run configuration: acceptance thresholds, iteration/verification limits,
//! detail level, and section configuration. Plain structs with `Default`
//! impls, mirroring the teacher's plain-config-struct style rather than
//! the full encrypted-settings machinery `agent-agency-config` carries (no
//! secrets cross this boundary, so that machinery has no use here).

use crate::types::SectionConfig;
use serde::{Deserialize, Serialize};

/// Output verbosity directive passed into the Prompt Composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    Concise,
    Standard,
    Detailed,
}

impl Default for DetailLevel {
    fn default() -> Self {
        DetailLevel::Standard
    }
}

/// Bounds on how many entities/patterns the verifier probes per claim, and
/// how many rows/refs a single query may contribute.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VerificationLimits {
    pub max_entities_per_claim: usize,
    pub max_patterns_per_claim: usize,
    pub results_per_query: usize,
    pub code_refs_per_evidence: usize,
}

impl Default for VerificationLimits {
    fn default() -> Self {
        Self {
            max_entities_per_claim: 10,
            max_patterns_per_claim: 5,
            results_per_query: 20,
            code_refs_per_evidence: 10,
        }
    }
}

/// Per-run acceptance and iteration policy.
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    pub max_iterations: u32,
    pub min_confidence_for_approval: f32,
    pub detail_level: DetailLevel,
    pub verification_limits: VerificationLimits,
    pub section_configs: Option<Vec<SectionConfig>>,
    /// Confidence assigned to a claim when the LLM-parsed verification
    /// path cannot be parsed at all. Defaults to 0.0, deliberately not the
    /// hallucination-masking 0.5 fallback the original sometimes used —
    /// see SPEC_FULL.md §9 Open Question.
    pub confidence_when_unparseable: f32,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            min_confidence_for_approval: 0.7,
            detail_level: DetailLevel::Standard,
            verification_limits: VerificationLimits::default(),
            section_configs: None,
            confidence_when_unparseable: 0.0,
        }
    }
}

/// Aggregator-specific configuration (token budget, per-component probing
/// caps).
#[derive(Debug, Clone, Copy)]
pub struct AggregatorConfig {
    pub max_context_tokens: usize,
    pub max_components_probed: usize,
    pub max_files_per_component: usize,
    pub file_byte_cap: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: 100_000,
            max_components_probed: 5,
            max_files_per_component: 3,
            file_byte_cap: 5_000,
        }
    }
}

/// Default section template used when the caller supplies none, grounded
/// in `DEFAULT_BRD_SECTIONS` from the original `brd_best_practices.py`.
pub fn default_sections() -> Vec<SectionConfig> {
    [
        ("executive_summary", "High-level overview of the feature and its business value."),
        ("business_context", "Why this feature exists and what business problem it solves."),
        ("functional_requirements", "What the system does, as observable behavior."),
        ("non_functional_requirements", "Performance, security, and reliability characteristics."),
        ("technical_specifications", "Architecture, components, and integration points."),
        ("dependencies_and_risks", "External dependencies and risks to completion or operation."),
    ]
    .into_iter()
    .map(|(name, description)| SectionConfig {
        name: name.to_string(),
        description: Some(description.to_string()),
        target_words: None,
        required: true,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let cfg = VerificationConfig::default();
        assert_eq!(cfg.max_iterations, 3);
        assert!((cfg.min_confidence_for_approval - 0.7).abs() < 1e-6);
        assert_eq!(cfg.confidence_when_unparseable, 0.0);
        assert_eq!(cfg.verification_limits.max_entities_per_claim, 10);
        assert_eq!(cfg.verification_limits.max_patterns_per_claim, 5);
        assert_eq!(cfg.verification_limits.results_per_query, 20);
        assert_eq!(cfg.verification_limits.code_refs_per_evidence, 10);
    }

    #[test]
    fn default_sections_has_six_entries_all_required() {
        let sections = default_sections();
        assert_eq!(sections.len(), 6);
        assert!(sections.iter().all(|s| s.required));
    }
}

//! Core data model: `AggregatedContext`, `Claim`, `EvidenceItem`,
//! `SectionResult`, `EvidenceBundle` and their supporting enums.
//!
//! Implements SPEC_FULL.md §3 exactly. The invariant
//! `claim.evidence.is_empty() <=> claim.status == Unverified && claim.confidence == 0.0`
//! is enforced structurally: evidence can only be attached through
//! [`Claim::add_evidence`], which recomputes status and confidence
//! together. There is no public path that can desync them.

use serde::{Deserialize, Serialize};

/// One discovered code component (service, module, class, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentInfo {
    pub name: String,
    pub kind: String,
    pub path: String,
    pub dependencies: Vec<String>,
    pub dependents: Vec<String>,
}

/// A source file pulled into context, possibly truncated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyFile {
    pub path: String,
    pub truncated_content: String,
    pub relevance: f32,
}

/// Discovered code-graph vocabulary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SchemaInfo {
    pub node_labels: Vec<String>,
    pub relationship_types: Vec<String>,
}

/// Immutable, per-run aggregated context handed to every downstream stage
/// by shared reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedContext {
    pub request: String,
    pub components: Vec<ComponentInfo>,
    pub key_files: Vec<KeyFile>,
    pub schema: SchemaInfo,
    pub similar_features: Vec<String>,
    /// Config surfaces discovered on the filesystem (`path -> "present"`),
    /// carried as ambient context; see SPEC_FULL.md §4.2.
    pub discovered_configs: Vec<String>,
    pub estimated_tokens: usize,
}

impl AggregatedContext {
    /// Rough token estimate: ~4 characters per token, computed over the
    /// serialized form so every field (including nested structures)
    /// contributes, matching the original's `len(model_dump_json()) // 4`.
    pub fn estimate_tokens(&self) -> usize {
        let json_len = serde_json::to_string(self).map(|s| s.len()).unwrap_or(0);
        json_len / 4
    }
}

/// Per-run section configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionConfig {
    pub name: String,
    pub description: Option<String>,
    pub target_words: Option<u32>,
    pub required: bool,
}

/// Classification of an extracted claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Technical,
    Functional,
    Integration,
    General,
}

impl Default for ClaimKind {
    fn default() -> Self {
        ClaimKind::General
    }
}

/// Verification state of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Unverified,
    Verified,
    Contradicted,
}

impl Default for ClaimStatus {
    fn default() -> Self {
        ClaimStatus::Unverified
    }
}

/// Which backend produced a piece of evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    Graph,
    Filesystem,
}

/// A single pointer into source for one matched entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeReference {
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub entity_name: String,
    pub entity_type: String,
}

/// One piece of evidence supporting (or failing to support) a claim.
/// Immutable once constructed — there is deliberately no setter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceItem {
    pub source: EvidenceSource,
    pub kind: String,
    pub description: String,
    pub query: String,
    pub code_refs: Vec<CodeReference>,
    pub weight: f32,
}

/// One verifiable statement extracted from generated prose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub text: String,
    pub section: String,
    pub kind: ClaimKind,
    pub mentioned_entities: Vec<String>,
    pub search_patterns: Vec<String>,
    evidence: Vec<EvidenceItem>,
    status: ClaimStatus,
    confidence: f32,
}

impl Claim {
    pub fn new(text: impl Into<String>, section: impl Into<String>, kind: ClaimKind) -> Self {
        Self {
            text: text.into(),
            section: section.into(),
            kind,
            mentioned_entities: Vec::new(),
            search_patterns: Vec::new(),
            evidence: Vec::new(),
            status: ClaimStatus::Unverified,
            confidence: 0.0,
        }
    }

    pub fn evidence(&self) -> &[EvidenceItem] {
        &self.evidence
    }

    pub fn status(&self) -> ClaimStatus {
        self.status
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Append evidence and recompute `confidence`/`status` together so the
    /// invariant `evidence.is_empty() <=> (confidence == 0.0 && status ==
    /// Unverified)` can never be violated by partial updates.
    pub fn add_evidence(&mut self, item: EvidenceItem, min_confidence_for_approval: f32) {
        self.evidence.push(item);
        self.recompute(min_confidence_for_approval);
    }

    /// Recompute confidence as the max evidence weight, per SPEC_FULL.md
    /// §4.5. Safe to call redundantly; never lowers evidence count.
    fn recompute(&mut self, min_confidence_for_approval: f32) {
        self.confidence = self
            .evidence
            .iter()
            .map(|e| e.weight)
            .fold(0.0_f32, f32::max);

        self.status = if self.evidence.is_empty() {
            ClaimStatus::Unverified
        } else if self.confidence >= min_confidence_for_approval {
            ClaimStatus::Verified
        } else {
            ClaimStatus::Unverified
        };
    }

    /// Mark contradicted explicitly (not reachable through direct-query
    /// verification in this implementation; reserved for a future
    /// semantic-conflict detector — see DESIGN.md Open Questions).
    pub fn mark_contradicted(&mut self) {
        self.status = ClaimStatus::Contradicted;
        self.confidence = 0.0;
    }
}

/// The outcome of generating + verifying one BRD section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionResult {
    pub name: String,
    pub generated_text: String,
    pub claims: Vec<Claim>,
    pub overall_confidence: f32,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

impl SectionResult {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generated_text: String::new(),
            claims: Vec::new(),
            overall_confidence: 0.0,
            issues: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Arithmetic mean of claim confidences; 0.0 (not 1.0) when there are
    /// no claims, per spec.md §4.5's "partial" contract.
    pub fn recompute_confidence(&mut self) {
        self.overall_confidence = mean_confidence(&self.claims);
    }
}

pub(crate) fn mean_confidence(claims: &[Claim]) -> f32 {
    if claims.is_empty() {
        return 0.0;
    }
    let sum: f32 = claims.iter().map(|c| c.confidence()).sum();
    sum / claims.len() as f32
}

/// Tri-state hallucination-risk rollup for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HallucinationRisk {
    Low,
    Medium,
    High,
}

impl HallucinationRisk {
    /// `>= 0.8 -> Low`, `>= 0.5 -> Medium`, else `High`, per SPEC_FULL §4.5.
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence >= 0.8 {
            HallucinationRisk::Low
        } else if confidence >= 0.5 {
            HallucinationRisk::Medium
        } else {
            HallucinationRisk::High
        }
    }
}

/// Run-level rollup of every section's verification result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub sections: Vec<SectionResult>,
    pub total_claims: usize,
    pub verified_claims: usize,
    pub overall_confidence: f32,
    pub hallucination_risk: HallucinationRisk,
}

impl EvidenceBundle {
    pub fn from_sections(sections: Vec<SectionResult>) -> Self {
        let total_claims: usize = sections.iter().map(|s| s.claims.len()).sum();
        let verified_claims: usize = sections
            .iter()
            .map(|s| s.claims.iter().filter(|c| c.status() == ClaimStatus::Verified).count())
            .sum();
        let overall_confidence = if sections.is_empty() {
            0.0
        } else {
            sections.iter().map(|s| s.overall_confidence).sum::<f32>() / sections.len() as f32
        };
        let hallucination_risk = HallucinationRisk::from_confidence(overall_confidence);

        Self {
            sections,
            total_claims,
            verified_claims,
            overall_confidence,
            hallucination_risk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(weight: f32) -> EvidenceItem {
        EvidenceItem {
            source: EvidenceSource::Graph,
            kind: "entity".into(),
            description: "found".into(),
            query: "MATCH (n) ...".into(),
            code_refs: vec![],
            weight,
        }
    }

    #[test]
    fn empty_evidence_means_unverified_and_zero_confidence() {
        let claim = Claim::new("X does Y", "section", ClaimKind::Technical);
        assert!(claim.evidence().is_empty());
        assert_eq!(claim.status(), ClaimStatus::Unverified);
        assert_eq!(claim.confidence(), 0.0);
    }

    #[test]
    fn single_strong_evidence_item_verifies_at_threshold() {
        let mut claim = Claim::new("X does Y", "section", ClaimKind::Technical);
        claim.add_evidence(evidence(0.95), 0.7);
        assert_eq!(claim.confidence(), 0.95);
        assert_eq!(claim.status(), ClaimStatus::Verified);
    }

    #[test]
    fn confidence_is_max_not_sum_of_weights() {
        let mut claim = Claim::new("X does Y", "section", ClaimKind::Technical);
        claim.add_evidence(evidence(0.90), 0.7);
        claim.add_evidence(evidence(0.95), 0.7);
        assert_eq!(claim.confidence(), 0.95);
        assert_eq!(claim.evidence().len(), 2);
    }

    #[test]
    fn section_confidence_is_zero_with_no_claims_not_one() {
        let section = SectionResult::empty("Functional Requirements");
        assert_eq!(section.overall_confidence, 0.0);
    }

    #[test]
    fn section_confidence_is_mean_of_claim_confidences() {
        let mut claim_a = Claim::new("a", "s", ClaimKind::Technical);
        claim_a.add_evidence(evidence(0.9), 0.7);
        let claim_b = Claim::new("b", "s", ClaimKind::Technical); // unverified, 0.0

        let mut section = SectionResult::empty("s");
        section.claims = vec![claim_a, claim_b];
        section.recompute_confidence();

        assert!((section.overall_confidence - 0.45).abs() < 1e-6);
    }

    #[test]
    fn hallucination_risk_thresholds_match_spec() {
        assert_eq!(HallucinationRisk::from_confidence(0.8), HallucinationRisk::Low);
        assert_eq!(HallucinationRisk::from_confidence(0.79), HallucinationRisk::Medium);
        assert_eq!(HallucinationRisk::from_confidence(0.5), HallucinationRisk::Medium);
        assert_eq!(HallucinationRisk::from_confidence(0.49), HallucinationRisk::High);
    }

    #[test]
    fn evidence_bundle_rolls_up_claim_counts_across_sections() {
        let mut claim_a = Claim::new("a", "s1", ClaimKind::Technical);
        claim_a.add_evidence(evidence(0.95), 0.7);
        let claim_b = Claim::new("b", "s2", ClaimKind::Technical);

        let mut s1 = SectionResult::empty("s1");
        s1.claims = vec![claim_a];
        s1.recompute_confidence();

        let mut s2 = SectionResult::empty("s2");
        s2.claims = vec![claim_b];
        s2.recompute_confidence();

        let bundle = EvidenceBundle::from_sections(vec![s1, s2]);
        assert_eq!(bundle.total_claims, 2);
        assert_eq!(bundle.verified_claims, 1);
        assert!((bundle.overall_confidence - 0.475).abs() < 1e-6);
        assert_eq!(bundle.hallucination_risk, HallucinationRisk::High);
    }
}

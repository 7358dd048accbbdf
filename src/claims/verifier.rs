//! Claim Verifier (SPEC_FULL.md §4.5): issues direct graph queries per
//! claim — never through the LLM — and attaches evidence. Confidence is
//! derived solely from the evidence attached here; this is the one
//! canonical confidence path (see SPEC_FULL.md §9 on confidence drift).

use crate::config::VerificationLimits;
use crate::services::CodeGraphService;
use crate::types::{Claim, CodeReference, EvidenceItem, EvidenceSource};
use std::sync::Arc;
use tracing::debug;

const ENTITY_EVIDENCE_WEIGHT: f32 = 0.95;
const PATTERN_EVIDENCE_WEIGHT: f32 = 0.90;

pub struct ClaimVerifier {
    graph: Arc<dyn CodeGraphService>,
}

impl ClaimVerifier {
    pub fn new(graph: Arc<dyn CodeGraphService>) -> Self {
        Self { graph }
    }

    /// Verify one claim, mutating its evidence list and recomputed
    /// status/confidence in place. Query failures reduce evidence for that
    /// entity/pattern but never abort verification of the claim.
    pub async fn verify(&self, claim: &mut Claim, limits: &VerificationLimits, min_confidence_for_approval: f32) {
        let entities: Vec<String> = claim
            .mentioned_entities
            .iter()
            .take(limits.max_entities_per_claim)
            .cloned()
            .collect();

        for entity in entities {
            let query = format!(
                "MATCH (n) WHERE n.name CONTAINS '{entity}' OR n.qualifiedName CONTAINS '{entity}' \
                 RETURN n.name as name, labels(n) as labels, n.filePath as filePath LIMIT {limit}",
                limit = limits.results_per_query
            );

            match self.graph.query(&query).await {
                Ok(result) if !result.nodes.is_empty() => {
                    let code_refs = result
                        .nodes
                        .iter()
                        .take(limits.code_refs_per_evidence)
                        .map(|node| CodeReference {
                            file_path: node.file_path.clone().unwrap_or_default(),
                            start_line: 1,
                            end_line: 1,
                            entity_name: if node.name.is_empty() { entity.clone() } else { node.name.clone() },
                            entity_type: node.labels.first().cloned().unwrap_or_else(|| "Unknown".to_string()),
                        })
                        .collect();

                    claim.add_evidence(
                        EvidenceItem {
                            source: EvidenceSource::Graph,
                            kind: "entity".to_string(),
                            description: format!("Found {entity} in codebase"),
                            query,
                            code_refs,
                            weight: ENTITY_EVIDENCE_WEIGHT,
                        },
                        min_confidence_for_approval,
                    );
                }
                Ok(_) => {}
                Err(e) => debug!(error = %e, entity, "entity verification query failed"),
            }
        }

        let patterns: Vec<String> = claim
            .search_patterns
            .iter()
            .take(limits.max_patterns_per_claim)
            .cloned()
            .collect();

        for pattern in patterns {
            let query = format!(
                "MATCH (n) WHERE n.name =~ '(?i).*{pattern}.*' OR n.qualifiedName =~ '(?i).*{pattern}.*' \
                 RETURN n.name as name, labels(n) as labels, n.filePath as filePath LIMIT {limit}",
                limit = limits.results_per_query
            );

            match self.graph.query(&query).await {
                Ok(result) if !result.nodes.is_empty() => {
                    claim.add_evidence(
                        EvidenceItem {
                            source: EvidenceSource::Graph,
                            kind: "pattern".to_string(),
                            description: format!("Pattern '{pattern}' found in codebase"),
                            query,
                            code_refs: Vec::new(),
                            weight: PATTERN_EVIDENCE_WEIGHT,
                        },
                        min_confidence_for_approval,
                    );
                }
                Ok(_) => {}
                Err(e) => debug!(error = %e, pattern, "pattern verification query failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::services::{GraphNode, GraphQueryResult};
    use crate::types::{ClaimKind, ClaimStatus};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeGraph {
        hits: Vec<String>,
        call_count: AtomicUsize,
    }

    #[async_trait]
    impl CodeGraphService for FakeGraph {
        async fn query(&self, cypher_like: &str) -> Result<GraphQueryResult, GraphError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            let hit = self.hits.iter().any(|h| cypher_like.contains(h));
            if hit {
                Ok(GraphQueryResult {
                    nodes: vec![GraphNode {
                        name: "BRDGenerator".to_string(),
                        labels: vec!["Class".to_string()],
                        file_path: Some("src/brd.rs".to_string()),
                        qualified_name: None,
                    }],
                })
            } else {
                Ok(GraphQueryResult::default())
            }
        }
    }

    #[tokio::test]
    async fn single_found_entity_yields_high_confidence_verified() {
        let graph = Arc::new(FakeGraph { hits: vec!["BRDGenerator".to_string()], call_count: AtomicUsize::new(0) });
        let verifier = ClaimVerifier::new(graph);
        let mut claim = Claim::new("Uses BRDGenerator", "s", ClaimKind::Technical);
        claim.mentioned_entities = vec!["BRDGenerator".to_string()];

        verifier.verify(&mut claim, &VerificationLimits::default(), 0.7).await;

        assert_eq!(claim.confidence(), 0.95);
        assert_eq!(claim.status(), ClaimStatus::Verified);
        assert_eq!(claim.evidence().len(), 1);
    }

    #[tokio::test]
    async fn unmatched_entity_yields_zero_confidence_unverified() {
        let graph = Arc::new(FakeGraph { hits: vec![], call_count: AtomicUsize::new(0) });
        let verifier = ClaimVerifier::new(graph);
        let mut claim = Claim::new("Uses NonexistentService", "s", ClaimKind::Technical);
        claim.mentioned_entities = vec!["NonexistentService".to_string()];

        verifier.verify(&mut claim, &VerificationLimits::default(), 0.7).await;

        assert!(claim.evidence().is_empty());
        assert_eq!(claim.confidence(), 0.0);
        assert_eq!(claim.status(), ClaimStatus::Unverified);
    }

    #[tokio::test]
    async fn respects_max_entities_per_claim_limit() {
        let graph = Arc::new(FakeGraph { hits: vec!["E0".into()], call_count: AtomicUsize::new(0) });
        let verifier = ClaimVerifier::new(graph.clone());
        let mut claim = Claim::new("many entities", "s", ClaimKind::Technical);
        claim.mentioned_entities = (0..5).map(|i| format!("E{i}")).collect();

        let limits = VerificationLimits { max_entities_per_claim: 2, ..VerificationLimits::default() };
        verifier.verify(&mut claim, &limits, 0.7).await;

        assert_eq!(graph.call_count.load(Ordering::SeqCst), 2);
    }

    struct FailingGraph;

    #[async_trait]
    impl CodeGraphService for FailingGraph {
        async fn query(&self, _cypher_like: &str) -> Result<GraphQueryResult, GraphError> {
            Err(GraphError::Unavailable)
        }
    }

    #[tokio::test]
    async fn graph_failure_does_not_abort_verification() {
        let verifier = ClaimVerifier::new(Arc::new(FailingGraph));
        let mut claim = Claim::new("Uses X", "s", ClaimKind::Technical);
        claim.mentioned_entities = vec!["X".to_string()];
        claim.search_patterns = vec!["x.*pattern".to_string()];

        verifier.verify(&mut claim, &VerificationLimits::default(), 0.7).await;

        assert!(claim.evidence().is_empty());
        assert_eq!(claim.status(), ClaimStatus::Unverified);
    }
}

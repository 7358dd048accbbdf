//! Feedback Builder (SPEC_FULL.md §4.6): turns a failed section's issues,
//! unverified claims, and suggestions into plain-English feedback embedded
//! verbatim in the next generation prompt. Grounded in
//! `_build_section_feedback`.

use crate::types::{ClaimStatus, SectionResult};

const MAX_ISSUES: usize = 5;
const MAX_UNVERIFIED_CLAIMS: usize = 5;
const MAX_SUGGESTIONS: usize = 3;
const CLAIM_PREVIEW_CHARS: usize = 80;

pub fn build_feedback(section_name: &str, result: &SectionResult) -> String {
    let mut parts = vec![format!("Issues found in {section_name}:")];

    for issue in result.issues.iter().take(MAX_ISSUES) {
        parts.push(format!("  - {issue}"));
    }

    let unverified: Vec<&_> = result
        .claims
        .iter()
        .filter(|c| c.status() != ClaimStatus::Verified)
        .take(MAX_UNVERIFIED_CLAIMS)
        .collect();

    if !unverified.is_empty() {
        parts.push("\nClaims that couldn't be verified (remove or fix):".to_string());
        for claim in unverified {
            let preview: String = claim.text.chars().take(CLAIM_PREVIEW_CHARS).collect();
            parts.push(format!("  - {preview}..."));
        }
    }

    if !result.suggestions.is_empty() {
        parts.push("\nSuggestions:".to_string());
        for suggestion in result.suggestions.iter().take(MAX_SUGGESTIONS) {
            parts.push(format!("  - {suggestion}"));
        }
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Claim, ClaimKind};

    #[test]
    fn feedback_lists_unverified_claims_for_removal() {
        let mut section = SectionResult::empty("Functional Requirements");
        section.claims = vec![Claim::new("NonexistentService handles X", "s", ClaimKind::Technical)];
        section.issues = vec!["Low overall confidence".to_string()];

        let feedback = build_feedback("Functional Requirements", &section);

        assert!(feedback.contains("Low overall confidence"));
        assert!(feedback.contains("NonexistentService"));
        assert!(feedback.contains("remove or fix"));
    }

    #[test]
    fn feedback_truncates_to_first_five_issues() {
        let mut section = SectionResult::empty("s");
        section.issues = (0..10).map(|i| format!("issue-{i}")).collect();
        let feedback = build_feedback("s", &section);
        assert_eq!(feedback.matches("issue-").count(), 5);
    }
}

//! Section Assembler (SPEC_FULL.md §4.7): collates accepted section texts
//! into one Markdown document with a stable header order, and derives the
//! structural by-products (FR-/TR- lists, dependencies/risks) from that
//! Markdown. The authoritative content is always the raw Markdown; these
//! lists are convenience extracts, grounded in
//! `_combine_sections_to_brd`/`_extract_list`.
//!
//! All extraction regexes live behind [`SectionParser`] so they are not
//! scattered through prompt or orchestrator code, per SPEC_FULL.md §9.

use crate::types::SectionResult;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

/// BRD artifact returned to the caller.
#[derive(Debug, Clone)]
pub struct BrdDocument {
    pub title: String,
    pub version: String,
    pub created_at: chrono::DateTime<Utc>,
    pub business_context: String,
    pub objectives: Vec<String>,
    pub functional_requirements: Vec<String>,
    pub technical_requirements: Vec<String>,
    pub dependencies: Vec<String>,
    pub risks: Vec<String>,
    pub raw_markdown: String,
}

/// Canonical section ordering and display titles for the assembled
/// document, grounded in the original's `section_titles` map.
const SECTION_ORDER: &[(&str, &str)] = &[
    ("executive_summary", "Executive Summary"),
    ("business_context", "Business Context"),
    ("functional_requirements", "Functional Requirements"),
    ("non_functional_requirements", "Non-Functional Requirements"),
    ("technical_specifications", "Technical Specifications"),
    ("dependencies_and_risks", "Dependencies and Risks"),
];

/// Matches a requirement-bullet marker at the start of a trimmed line:
/// a plain dash/star bullet, or an `FR-`/`REQ-`/`TR-`/`NFR-` prefix in any
/// case (LLM output inconsistently capitalizes these).
static REQUIREMENT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:[-*]\s+|(?:FR|REQ|TR|NFR)-)").expect("static regex is valid"));

/// Isolates the regex/string-matching used to pull structural by-products
/// out of generated Markdown prose.
pub struct SectionParser;

impl SectionParser {
    /// Lines starting with a bullet or an `FR-`/`REQ-`/`TR-`/`NFR-` marker
    /// (case-insensitive) become one requirement each, numbered
    /// `{id_prefix}-001`, `{id_prefix}-002`, ...
    pub fn extract_requirements(content: &str, id_prefix: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut seq = 1u32;

        for line in content.lines() {
            let trimmed = line.trim();
            let Some(m) = REQUIREMENT_MARKER.find(trimmed) else {
                continue;
            };
            let body = trimmed[m.end()..].trim();
            if body.is_empty() {
                continue;
            }
            out.push(format!("{id_prefix}-{seq:03}: {body}"));
            seq += 1;
        }

        out
    }

    /// Bullet-point extraction (`- `, `* `) used for dependencies/risks.
    pub fn extract_bullets(content: &str) -> Vec<String> {
        content
            .lines()
            .map(str::trim)
            .filter_map(|line| {
                line.strip_prefix("- ")
                    .or_else(|| line.strip_prefix("* "))
                    .map(str::to_string)
            })
            .take(10)
            .collect()
    }
}

pub struct SectionAssembler;

impl SectionAssembler {
    /// Build the final [`BrdDocument`] from accepted section results,
    /// keyed by section name.
    pub fn assemble(request: &str, sections: &[SectionResult]) -> BrdDocument {
        let by_name = |name: &str| sections.iter().find(|s| s.name == name);

        let functional_requirements = by_name("functional_requirements")
            .map(|s| SectionParser::extract_requirements(&s.generated_text, "FR"))
            .unwrap_or_default();

        let mut technical_source = String::new();
        if let Some(s) = by_name("technical_specifications") {
            technical_source.push_str(&s.generated_text);
            technical_source.push('\n');
        }
        if let Some(s) = by_name("non_functional_requirements") {
            technical_source.push_str(&s.generated_text);
        }
        let technical_requirements = SectionParser::extract_requirements(&technical_source, "TR");

        let dep_risk_text = by_name("dependencies_and_risks").map(|s| s.generated_text.as_str()).unwrap_or("");
        let dependencies = SectionParser::extract_bullets(dep_risk_text);
        let risks = dependencies.clone();

        let business_context = by_name("business_context")
            .or_else(|| by_name("executive_summary"))
            .map(|s| s.generated_text.clone())
            .unwrap_or_else(|| "No business context provided.".to_string());

        let mut raw_markdown = format!(
            "# Business Requirements Document: {}\n\n**Version:** 1.0\n**Status:** Draft (Verified)\n\n---\n\n",
            truncate_title(request)
        );

        for (key, title) in SECTION_ORDER {
            if let Some(section) = by_name(key) {
                if !section.generated_text.is_empty() {
                    raw_markdown.push_str(&format!("## {title}\n\n{}\n\n", section.generated_text));
                }
            }
        }

        BrdDocument {
            title: format!("BRD: {}", truncate_title(request)),
            version: "1.0".to_string(),
            created_at: Utc::now(),
            business_context,
            objectives: vec![request.to_string()],
            functional_requirements,
            technical_requirements,
            dependencies,
            risks,
            raw_markdown,
        }
    }
}

fn truncate_title(request: &str) -> String {
    request.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fr_ids_from_dash_bullets() {
        let content = "- FR: Generate BRD from request\n- FR: Verify claims against code";
        let reqs = SectionParser::extract_requirements(content, "FR");
        assert_eq!(reqs, vec!["FR-001: FR: Generate BRD from request", "FR-002: FR: Verify claims against code"]);
    }

    #[test]
    fn matches_lowercase_and_mixed_case_prefixes() {
        let content = "fr-001: Users can request a reset\nReq-2: Email is sent within 60 seconds";
        let reqs = SectionParser::extract_requirements(content, "FR");
        assert_eq!(reqs.len(), 2);
        assert!(reqs[0].ends_with("Users can request a reset"));
        assert!(reqs[1].ends_with("Email is sent within 60 seconds"));
    }

    #[test]
    fn assembles_stable_header_order_and_skips_empty_sections() {
        let mut exec = SectionResult::empty("executive_summary");
        exec.generated_text = "This feature lets users reset passwords.".to_string();
        let mut func = SectionResult::empty("functional_requirements");
        func.generated_text = "- FR: Generate BRD from request".to_string();
        let deps = SectionResult::empty("dependencies_and_risks"); // empty, should be skipped

        let doc = SectionAssembler::assemble("password reset", &[exec, func, deps]);

        let exec_idx = doc.raw_markdown.find("## Executive Summary").unwrap();
        let func_idx = doc.raw_markdown.find("## Functional Requirements").unwrap();
        assert!(exec_idx < func_idx);
        assert!(!doc.raw_markdown.contains("## Dependencies and Risks"));
        assert_eq!(doc.functional_requirements, vec!["FR-001: FR: Generate BRD from request"]);
    }

    #[test]
    fn three_section_scenario_yields_exactly_three_headers() {
        let mut exec = SectionResult::empty("executive_summary");
        exec.generated_text = "Summary mentioning BRDGenerator.".to_string();
        let mut func = SectionResult::empty("functional_requirements");
        func.generated_text = "- FR: Generate BRD from request".to_string();
        let mut deps = SectionResult::empty("dependencies_and_risks");
        deps.generated_text = "- Depends on graph service".to_string();

        let doc = SectionAssembler::assemble("a request", &[exec, func, deps]);
        let header_count = doc.raw_markdown.matches("## ").count();
        assert_eq!(header_count, 3);
        assert_eq!(doc.functional_requirements, vec!["FR-001: FR: Generate BRD from request"]);
    }
}

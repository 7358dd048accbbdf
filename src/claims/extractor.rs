//! Claim Extractor (SPEC_FULL.md §4.4): asks the LLM to decompose
//! generated section prose into a JSON array of verifiable claims, then
//! parses that array defensively. Parse failures and empty-text claims
//! are dropped, never raised — this module always returns a `Vec<Claim>`.

use crate::types::{Claim, ClaimKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

/// Matches a bare CamelCase identifier (`BRDGenerator`, `ContextAggregator`),
/// used as a fallback when the LLM's claim JSON omits `mentioned_entities`
/// for a claim whose text plainly references one. Per spec.md §3,
/// `mentioned_entities` is defined as "CamelCase identifiers referenced" —
/// this keeps the verifier from starving on a claim the model forgot to
/// annotate.
static CAMEL_CASE_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z0-9]+(?:[A-Z][a-z0-9]+)+\b").expect("static regex is valid"));

/// Scan `text` for CamelCase identifiers, in order of first appearance,
/// without duplicates.
fn camel_case_entities(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    CAMEL_CASE_ENTITY
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|entity| seen.insert(entity.clone()))
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawClaim {
    #[serde(default)]
    text: String,
    #[serde(rename = "type", alias = "kind", default)]
    kind: String,
    #[serde(default)]
    mentioned_entities: Vec<String>,
    #[serde(default)]
    search_patterns: Vec<String>,
}

fn parse_kind(s: &str) -> ClaimKind {
    match s {
        "technical" => ClaimKind::Technical,
        "functional" => ClaimKind::Functional,
        "integration" => ClaimKind::Integration,
        _ => ClaimKind::General,
    }
}

/// Build the prompt asking the LLM to extract claims from one section's
/// generated text, grounded in the original's `_extract_claims` prompt.
pub fn build_extraction_prompt(section_name: &str, content: &str) -> String {
    format!(
        "Extract verifiable technical claims from this BRD section.\n\n\
## Section: {section_name}\n\n\
## Content:\n{content}\n\n\
## Instructions:\n\
Extract specific, verifiable claims about:\n\
- Component names mentioned\n\
- File paths referenced\n\
- Technical behaviors described\n\
- Integration points\n\
- Data flows\n\n\
Return as a JSON array:\n\
```json\n\
[\n  {{\"text\": \"The exact claim text\", \"type\": \"technical|functional|integration\", \"mentioned_entities\": [\"ComponentName\"], \"search_patterns\": [\"pattern\"]}}\n]\n\
```\n\n\
Only extract claims that can be verified against code. Skip vague or subjective statements.\n"
    )
}

/// Strip `<thinking>...</thinking>` blocks and a surrounding fenced
/// wrapper from a generated response, leaving the section body.
pub fn strip_reasoning_and_fences(response: &str) -> String {
    let mut content = response.trim().to_string();

    while let Some(start) = content.find("<thinking>") {
        if let Some(end_rel) = content[start..].find("</thinking>") {
            let end = start + end_rel + "</thinking>".len();
            content.replace_range(start..end, "");
        } else {
            break;
        }
    }
    let content = content.trim().to_string();

    if let Some(stripped) = content.strip_prefix("```") {
        let stripped = stripped.strip_prefix("json").unwrap_or(stripped);
        let stripped = stripped.trim_start_matches('\n');
        if let Some(end) = stripped.rfind("```") {
            return stripped[..end].trim().to_string();
        }
        return stripped.trim().to_string();
    }

    content.trim().to_string()
}

/// Extract the JSON payload from an LLM response: first fenced ```json
/// block, else the longest balanced-braces/brackets substring.
fn extract_json_array(text: &str) -> Option<String> {
    if let Some(start) = text.find("```json") {
        let after = &text[start + "```json".len()..];
        if let Some(end) = after.find("```") {
            return Some(after[..end].trim().to_string());
        }
    }
    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        if let Some(end) = after.find("```") {
            return Some(after[..end].trim().to_string());
        }
    }

    longest_balanced_substring(text, '[', ']').or_else(|| longest_balanced_substring(text, '{', '}'))
}

fn longest_balanced_substring(text: &str, open: char, close: char) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut best: Option<(usize, usize)> = None;
    let mut stack: Vec<usize> = Vec::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == open {
            stack.push(i);
        } else if c == close {
            if let Some(start) = stack.pop() {
                if stack.is_empty() {
                    let len = i - start;
                    let best_len = best.map(|(s, e)| e - s).unwrap_or(0);
                    if len > best_len {
                        best = Some((start, i));
                    }
                }
            }
        }
    }

    best.map(|(s, e)| chars[s..=e].iter().collect())
}

/// Parse the LLM's claim-extraction response into claims for `section_name`.
/// Never panics or returns `Err`: malformed JSON or a missing payload
/// yields an empty `Vec`, logged at `warn`.
pub fn extract_claims(section_name: &str, response: &str) -> Vec<Claim> {
    let Some(json_str) = extract_json_array(response) else {
        warn!(section = section_name, "no JSON payload found in claim extraction response");
        return Vec::new();
    };

    let raw_claims: Vec<RawClaim> = match serde_json::from_str(&json_str) {
        Ok(claims) => claims,
        Err(e) => {
            warn!(section = section_name, error = %e, "failed to parse claim extraction JSON");
            return Vec::new();
        }
    };

    raw_claims
        .into_iter()
        .filter(|c| !c.text.trim().is_empty())
        .map(|c| {
            let mentioned_entities = if c.mentioned_entities.is_empty() {
                camel_case_entities(&c.text)
            } else {
                c.mentioned_entities
            };
            let mut claim = Claim::new(c.text, section_name, parse_kind(&c.kind));
            claim.mentioned_entities = mentioned_entities;
            claim.search_patterns = c.search_patterns;
            claim
        })
        .collect()
}

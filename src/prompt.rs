//! Prompt Composer: builds the generation prompt for one BRD section.
//! Grounded in `_build_section_generation_prompt` from the original
//! orchestrator. Never embeds skill instruction bodies — only the trigger
//! phrase the LLM session's skill registry matches against.

use crate::config::DetailLevel;
use crate::types::AggregatedContext;

/// Trigger phrase that activates the generate-brd skill on the LLM
/// session, per SPEC_FULL.md §4.3/§4.8.
pub const GENERATE_TRIGGER: &str = "generate brd";

/// Trigger phrase that activates the verify-brd skill, used by the claim
/// extraction prompt (SPEC_FULL.md §4.4).
pub const VERIFY_TRIGGER: &str = "verify brd";

const PREVIOUS_SECTION_PREVIEW_CHARS: usize = 500;

/// Per-section writing guidance, grounded in
/// `brd_best_practices.get_section_guidelines`.
pub fn section_guidelines(section_name: &str) -> &'static str {
    match section_name {
        "executive_summary" => {
            "Summarize what the feature does and why it matters in 2-3 sentences a non-technical stakeholder can act on."
        }
        "business_context" => {
            "Explain the business problem this feature addresses and who benefits, without describing implementation."
        }
        "functional_requirements" => {
            "List each distinct capability as its own bullet, starting with 'FR-' or a plain '-'. Describe outcomes, not code paths."
        }
        "non_functional_requirements" => {
            "Capture performance, security, and reliability characteristics observable from the code (timeouts, retries, auth checks)."
        }
        "technical_specifications" => {
            "Describe the architecture: components involved, how they communicate, and any external integrations."
        }
        "dependencies_and_risks" => {
            "List external dependencies (services, libraries) and risks to correctness or availability as bullet points."
        }
        _ => "Document what the existing code does for this section, in plain business language.",
    }
}

fn detail_level_instructions(level: DetailLevel) -> &'static str {
    match level {
        DetailLevel::Concise => {
            "## OUTPUT DETAIL LEVEL: CONCISE\n- Keep this section brief: 1-2 short paragraphs maximum.\n- Use bullet points instead of prose.\n- Focus only on key points."
        }
        DetailLevel::Standard => {
            "## OUTPUT DETAIL LEVEL: STANDARD\n- Provide balanced coverage: 2-4 paragraphs.\n- Mix prose and bullet points."
        }
        DetailLevel::Detailed => {
            "## OUTPUT DETAIL LEVEL: DETAILED\n- Provide comprehensive coverage with full explanations.\n- Include code references and file paths.\n- Note edge cases and considerations."
        }
    }
}

fn format_components(context: &AggregatedContext) -> String {
    if context.components.is_empty() {
        return "No components found.".to_string();
    }
    context
        .components
        .iter()
        .take(10)
        .map(|c| format!("- {} ({}) @ {}", c.name, c.kind, c.path))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_files(context: &AggregatedContext) -> String {
    if context.key_files.is_empty() {
        return "No key files found.".to_string();
    }
    context
        .key_files
        .iter()
        .take(10)
        .map(|f| format!("- {} (relevance {:.2})", f.path, f.relevance))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_previous_sections(previous: &[(String, String)]) -> String {
    if previous.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n\n## Previously Generated Sections\n");
    for (name, content) in previous {
        let preview: String = content.chars().take(PREVIOUS_SECTION_PREVIEW_CHARS).collect();
        out.push_str(&format!("\n### {name}\n{preview}...\n"));
    }
    out
}

fn format_feedback(feedback: Option<&str>) -> String {
    match feedback {
        Some(text) => format!("\n## Issues from verification \u{2014} MUST address\n{text}\n"),
        None => String::new(),
    }
}

/// Build the section generation prompt: reverse-engineering framing,
/// section heading + guidelines, rendered context summary, previously
/// accepted sections (truncated), feedback block, detail-level directives,
/// and the trailing `<thinking>` instruction.
pub fn build_generation_prompt(
    section_name: &str,
    section_description: Option<&str>,
    target_words: Option<u32>,
    context: &AggregatedContext,
    previous_sections: &[(String, String)],
    feedback: Option<&str>,
    detail_level: DetailLevel,
) -> String {
    let title = section_name.replace('_', " ");
    let target_words_line = target_words
        .map(|w| format!(" (target ~{w} words)"))
        .unwrap_or_default();
    let section_focus = section_description
        .map(|d| format!("\n**Section Focus:** {d}\n"))
        .unwrap_or_default();

    format!(
        "{trigger}\n\n\
You are an expert Business Analyst reverse engineering EXISTING code to create a BRD.\n\n\
## CRITICAL: REVERSE ENGINEERING MODE\n\n\
The feature \"{request}\" ALREADY EXISTS in this codebase. Document what the code DOES, not what should be built.\n\n\
## Current Section: {title}{target_words_line}\n\
{section_focus}\n\
{detail_instructions}\n\n\
## Section Guidelines\n\
{guidelines}\n\n\
## Codebase Context\n\n\
**Components Found ({n_components}):**\n\
{components}\n\n\
**Key Source Files ({n_files}):**\n\
{files}\n\
{previous}\n\
{feedback_block}\n\
## Writing Instructions\n\
- Use plain English; translate code behavior to business language.\n\
- Be deterministic \u{2014} avoid \"may\" or \"might\"; describe exact behavior.\n\
- Capture business rules visible in the code.\n\n\
First show your analysis (wrapped in <thinking> tags, discarded downstream), then the section body:\n\n\
<thinking>\n[Analyze the code: what do these components do? how do they work together?]\n</thinking>\n\n\
## {title}\n\n\
[Document what the EXISTING code does based on your analysis]\n",
        trigger = GENERATE_TRIGGER,
        request = context.request,
        detail_instructions = detail_level_instructions(detail_level),
        guidelines = section_guidelines(section_name),
        n_components = context.components.len(),
        components = format_components(context),
        n_files = context.key_files.len(),
        files = format_files(context),
        previous = format_previous_sections(previous_sections),
        feedback_block = format_feedback(feedback),
    )
}

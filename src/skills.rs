//! Skill Loader (SPEC_FULL.md §4.8): indexes skill definitions by trigger
//! phrase so the Prompt Composer's literal trigger strings cause the LLM
//! session to auto-inject the matching instructions. The loader's own
//! content is never read by the composer — only registered with the
//! session once, at startup.
//!
//! Skills are defined one-per-file in TOML (the teacher's and pack's
//! ecosystem reach for `toml`/`serde` over `serde_yaml` for this kind of
//! config; see DESIGN.md), grounded in shape on `skills/loader.py`'s
//! `SkillDefinition`.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct SkillDefinition {
    pub name: String,
    pub trigger_phrases: Vec<String>,
    pub instructions: String,
    #[serde(default)]
    pub tools_hint: Vec<String>,
}

#[derive(Debug, Default)]
pub struct SkillLoader {
    by_trigger: HashMap<String, SkillDefinition>,
    skills: Vec<SkillDefinition>,
}

impl SkillLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.toml` skill definition from a directory. Missing or
    /// unreadable directories yield an empty loader rather than an error —
    /// skill registration is best-effort ambient setup, not load-bearing
    /// for correctness.
    pub fn load_from_dir(dir: &Path) -> Self {
        let mut loader = Self::new();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skills directory unreadable, continuing with no skills");
                return loader;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            match std::fs::read_to_string(&path).ok().and_then(|s| toml::from_str::<SkillDefinition>(&s).ok()) {
                Some(skill) => loader.register(skill),
                None => warn!(path = %path.display(), "failed to parse skill definition, skipping"),
            }
        }

        loader
    }

    pub fn register(&mut self, skill: SkillDefinition) {
        for trigger in &skill.trigger_phrases {
            self.by_trigger.insert(trigger.clone(), skill.clone());
        }
        self.skills.push(skill);
    }

    pub fn lookup(&self, trigger_phrase: &str) -> Option<&SkillDefinition> {
        self.by_trigger.get(trigger_phrase)
    }

    /// The full set to register with the LLM session at startup.
    pub fn skills_for_session(&self) -> &[SkillDefinition] {
        &self.skills
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_skill_under_each_trigger_phrase() {
        let mut loader = SkillLoader::new();
        loader.register(SkillDefinition {
            name: "generate-brd".to_string(),
            trigger_phrases: vec!["generate brd".to_string()],
            instructions: "...".to_string(),
            tools_hint: vec![],
        });

        assert!(loader.lookup("generate brd").is_some());
        assert!(loader.lookup("verify brd").is_none());
        assert_eq!(loader.skills_for_session().len(), 1);
    }

    #[test]
    fn missing_directory_yields_empty_loader_not_error() {
        let loader = SkillLoader::load_from_dir(Path::new("/nonexistent/skills/dir"));
        assert!(loader.skills_for_session().is_empty());
    }
}

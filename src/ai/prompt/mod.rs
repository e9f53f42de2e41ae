//! Prompt Templates
//!
//! Plain-text templates with `{{placeholder}}` tokens. The analysis template
//! is rendered once per chunk, the note template once per module.
//!
//! Rendering substitutes values in a single pass over the template text, so
//! placeholder-like text inside a value (source code, JSON) is never expanded.

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

use crate::config::PromptConfig;
use crate::types::{NoteError, Result};

const DEFAULT_ANALYSIS: &str = include_str!("../../../prompts/analysis.txt");
const DEFAULT_NOTE: &str = include_str!("../../../prompts/note.txt");

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid placeholder regex")
});

// =============================================================================
// PromptTemplate
// =============================================================================

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    name: String,
    text: String,
    /// Distinct placeholder names in order of first appearance
    placeholders: Vec<String>,
}

impl PromptTemplate {
    pub fn parse(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut placeholders: Vec<String> = Vec::new();
        for caps in PLACEHOLDER_RE.captures_iter(&text) {
            let key = &caps[1];
            if !placeholders.iter().any(|p| p == key) {
                placeholders.push(key.to_string());
            }
        }
        Self {
            name: name.into(),
            text,
            placeholders,
        }
    }

    /// Load a template file, or the built-in text when no path is given
    pub fn load(name: &str, path: Option<&Path>, builtin: &str) -> Result<Self> {
        let text = match path {
            Some(path) => {
                debug!("Loading {} template from {}", name, path.display());
                std::fs::read_to_string(path).map_err(|e| {
                    NoteError::config(format!(
                        "Cannot read {} template {}: {}",
                        name,
                        path.display(),
                        e
                    ))
                })?
            }
            None => builtin.to_string(),
        };
        Ok(Self::parse(name, text))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Fail with a configuration error unless `placeholder` appears in the text
    pub fn require(&self, placeholder: &str) -> Result<()> {
        if self.placeholders.iter().any(|p| p == placeholder) {
            Ok(())
        } else {
            Err(NoteError::config(format!(
                "{} template must contain the {{{{{}}}}} placeholder",
                self.name, placeholder
            )))
        }
    }

    /// Substitute every placeholder; an unbound placeholder is a `TemplateBinding` error
    pub fn render(&self, bindings: &BTreeMap<&str, String>) -> Result<String> {
        if let Some(missing) = self
            .placeholders
            .iter()
            .find(|p| !bindings.contains_key(p.as_str()))
        {
            return Err(NoteError::template_binding(&self.name, missing));
        }

        let rendered = PLACEHOLDER_RE.replace_all(&self.text, |caps: &Captures| {
            bindings.get(&caps[1]).cloned().unwrap_or_default()
        });
        Ok(rendered.into_owned())
    }
}

// =============================================================================
// PromptTemplates
// =============================================================================

/// The analysis and note templates used by one run
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    pub analysis: PromptTemplate,
    pub note: PromptTemplate,
}

impl PromptTemplates {
    pub fn load(config: &PromptConfig) -> Result<Self> {
        let analysis =
            PromptTemplate::load("analysis", config.analysis.as_deref(), DEFAULT_ANALYSIS)?;
        analysis.require("payload")?;

        let note = PromptTemplate::load("note", config.note.as_deref(), DEFAULT_NOTE)?;
        note.require("analysis")?;

        Ok(Self { analysis, note })
    }

    pub fn builtin() -> Self {
        Self {
            analysis: PromptTemplate::parse("analysis", DEFAULT_ANALYSIS),
            note: PromptTemplate::parse("note", DEFAULT_NOTE),
        }
    }

    /// Render the analysis prompt for one chunk; `chunk_index` is 0-based
    pub fn render_analysis(
        &self,
        module: &str,
        chunk_index: usize,
        chunk_count: usize,
        payload: &str,
    ) -> Result<String> {
        let bindings = BTreeMap::from([
            ("module", module.to_string()),
            ("chunk_index", (chunk_index + 1).to_string()),
            ("chunk_count", chunk_count.to_string()),
            ("payload", payload.to_string()),
        ]);
        self.analysis.render(&bindings)
    }

    /// Render the note prompt; a missing or empty analysis is a binding error
    pub fn render_note(&self, module: &str, analysis: Option<&str>, modules: &str) -> Result<String> {
        let analysis = analysis
            .map(str::trim)
            .filter(|a| !a.is_empty() && *a != "{}")
            .ok_or_else(|| NoteError::template_binding(self.note.name(), "analysis"))?;

        let bindings = BTreeMap::from([
            ("module", module.to_string()),
            ("analysis", analysis.to_string()),
            ("modules", modules.to_string()),
        ]);
        self.note.render(&bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_placeholders() {
        let t = PromptTemplate::parse("t", "{{module}} {{ payload }} {{module}} {not_one}");
        assert_eq!(t.placeholders(), &["module".to_string(), "payload".to_string()]);
    }

    #[test]
    fn test_render_does_not_expand_values() {
        let t = PromptTemplate::parse("t", "A={{a}} B={{b}}");
        let bindings = BTreeMap::from([("a", "{{b}}".to_string()), ("b", "x".to_string())]);
        assert_eq!(t.render(&bindings).unwrap(), "A={{b}} B=x");
    }

    #[test]
    fn test_unbound_placeholder_is_binding_error() {
        let t = PromptTemplate::parse("note", "{{module}} {{extra}}");
        let bindings = BTreeMap::from([("module", "auth".to_string())]);
        match t.render(&bindings) {
            Err(NoteError::TemplateBinding {
                template,
                placeholder,
            }) => {
                assert_eq!(template, "note");
                assert_eq!(placeholder, "extra");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_builtin_templates_have_required_placeholders() {
        let templates = PromptTemplates::load(&PromptConfig::default()).unwrap();
        assert!(templates.analysis.placeholders().contains(&"payload".to_string()));
        assert!(templates.note.placeholders().contains(&"analysis".to_string()));

        let prompt = templates
            .render_analysis("auth", 0, 3, "{\"snippets\": []}")
            .unwrap();
        assert!(prompt.contains("part 1 of 3"));
        assert!(prompt.contains("\"auth\""));
        assert!(prompt.contains("{\"snippets\": []}"));
    }

    #[test]
    fn test_template_without_required_placeholder_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("analysis.txt");
        std::fs::write(&path, "Analyze {{module}}").unwrap();

        let config = PromptConfig {
            analysis: Some(path),
            note: None,
        };
        let err = PromptTemplates::load(&config).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_render_note_requires_analysis() {
        let templates = PromptTemplates::builtin();
        assert!(matches!(
            templates.render_note("core", None, "- auth"),
            Err(NoteError::TemplateBinding { .. })
        ));
        assert!(templates.render_note("core", Some("{}"), "").is_err());

        let prompt = templates
            .render_note("core", Some("{\"summary\": \"engine\"}"), "- auth")
            .unwrap();
        assert!(prompt.contains("# core"));
        assert!(prompt.contains("\"engine\""));
    }
}

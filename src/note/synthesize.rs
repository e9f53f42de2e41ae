//! Note Synthesizer
//!
//! Writes module pages and builds the `System-Architecture.md` overview.
//! Module pages come from the model; when it fails the page degrades to a
//! fallback (raw analysis embedded) or a TBD page (nothing to render from).
//! The overview is assembled locally from the run's module reports and
//! analyses.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

use super::artifact::atomic_write;
use super::graph::ModuleGraph;
use super::mermaid::MermaidValidator;
use super::types::{ModuleAnalysis, ModuleReport, ModuleState};
use crate::types::{Result, TBD};

/// Placeholder page for a module whose note could not be rendered
pub fn tbd_page(module: &str, reason: &str) -> String {
    let mut content = String::new();
    content.push_str(&format!("# {}\n\n", module));
    content.push_str(&format!("> Note could not be generated: {}\n\n", reason));
    for section in ["Summary", "Responsibilities", "Key Symbols", "Dependencies"] {
        content.push_str(&format!("## {}\n\n{}\n\n", section, TBD));
    }
    content
}

/// Page embedding the raw analysis when the note pass failed
pub fn fallback_page(module: &str, reason: &str, analysis: &ModuleAnalysis) -> Result<String> {
    let json = serde_json::to_string_pretty(&analysis.analysis)?;

    let mut content = String::new();
    content.push_str(&format!("# {}\n\n", module));
    content.push_str(&format!(
        "> **Fallback page.** The note pass failed ({}). The merged module analysis is shown as is.\n\n",
        reason
    ));
    if !analysis.is_complete() {
        content.push_str(&format!(
            "> {} of {} chunks could not be analyzed; their content is {}.\n\n",
            analysis.tbd_chunks.len(),
            analysis.chunk_count,
            TBD
        ));
    }
    content.push_str("## Analysis\n\n");
    content.push_str(&format!("```json\n{}\n```\n", json));
    Ok(content)
}

/// Markdown list of the other modules, bound to the note template's `modules`
pub fn modules_context(current: &str, analyses: &BTreeMap<String, ModuleAnalysis>) -> String {
    let lines: Vec<String> = analyses
        .iter()
        .filter(|(name, _)| name.as_str() != current)
        .map(|(name, analysis)| {
            let summary = analysis.summary().unwrap_or_else(|| TBD.to_string());
            format!("- {}: {}", name, summary.replace('\n', " "))
        })
        .collect();

    if lines.is_empty() {
        "- (no other modules)".to_string()
    } else {
        lines.join("\n")
    }
}

/// Validate Mermaid blocks and write the page atomically
pub async fn write_page(path: &Path, markdown: &str) -> Result<()> {
    let validation = MermaidValidator::validate(markdown);
    for issue in &validation.issues {
        warn!("{}: Mermaid {}", path.display(), issue);
    }

    let mut body = markdown.trim().to_string();
    body.push('\n');
    atomic_write(path, body.as_bytes()).await
}

// =============================================================================
// Overview
// =============================================================================

/// Build the overview page from every module's terminal state
pub fn render_overview(
    reports: &[ModuleReport],
    analyses: &BTreeMap<String, ModuleAnalysis>,
    edge_fields: &[String],
) -> String {
    let mut content = String::new();
    content.push_str("# System Architecture\n\n");

    let analyzed: Vec<&ModuleReport> = reports.iter().filter(|r| !r.is_skipped()).collect();
    let skipped: Vec<&ModuleReport> = reports.iter().filter(|r| r.is_skipped()).collect();

    content.push_str(&format!(
        "{} modules documented, {} skipped.\n\n",
        analyzed.len(),
        skipped.len()
    ));

    content.push_str("## Modules\n\n");
    if analyzed.is_empty() {
        content.push_str(&format!("{}\n\n", TBD));
    } else {
        content.push_str("| Module | Summary | Files | Chunks | Analysis | Page |\n");
        content.push_str("|---|---|---|---|---|---|\n");
        for report in &analyzed {
            let ModuleState::Analyzed { analysis, page } = &report.state else {
                continue;
            };
            let link = match &report.page_file {
                Some(file) => format!("[{}]({})", report.module, file),
                None => report.module.clone(),
            };
            let summary = analyses
                .get(&report.module)
                .and_then(ModuleAnalysis::summary)
                .unwrap_or_else(|| TBD.to_string());
            content.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                link,
                table_cell(&summary),
                report.files,
                report.chunks,
                analysis,
                page
            ));
        }
        content.push('\n');
    }

    if !skipped.is_empty() {
        content.push_str("## Skipped Modules\n\n");
        for report in &skipped {
            if let ModuleState::Skipped { reason } = &report.state {
                content.push_str(&format!("- **{}**: {}\n", report.module, reason));
            }
        }
        content.push('\n');
    }

    let mut graph = ModuleGraph::new(analyzed.iter().map(|r| r.module.clone()));
    for (module, analysis) in analyses {
        graph.add_analysis(module, &analysis.analysis, edge_fields);
    }

    content.push_str("## Module Graph\n\n");
    content.push_str(&format!("```mermaid\n{}```\n\n", graph.to_mermaid()));
    if graph.edge_count() == 0 {
        content.push_str(&format!(
            "No inter-module relations were found; edges are {}.\n\n",
            TBD
        ));
    }

    content.push_str("## Generation Notes\n\n");
    content.push_str(
        "- Two-pass generation: source chunks were analyzed into per-module JSON, \
         then each module page was written from its merged analysis.\n",
    );
    content.push_str(&format!(
        "- Facts the model could not establish are marked `{}`.\n",
        TBD
    ));
    content.push_str(&format!(
        "- Graph edges are read from the analysis fields: {}.\n",
        edge_fields
            .iter()
            .map(|f| format!("`{}`", f))
            .collect::<Vec<_>>()
            .join(", ")
    ));
    let degraded = analyzed.iter().filter(|r| r.is_degraded()).count();
    if degraded > 0 {
        content.push_str(&format!(
            "- {} module(s) were documented from partial analyses or fallback pages.\n",
            degraded
        ));
    }

    content
}

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::TokenUsage;
    use crate::note::types::{AnalysisStatus, PageStatus};
    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;

    fn analysis(module: &str, value: serde_json::Value, tbd: Vec<usize>) -> ModuleAnalysis {
        ModuleAnalysis {
            module: module.to_string(),
            fingerprint: "fp".to_string(),
            generated_at: Utc::now(),
            chunk_count: 3,
            tbd_chunks: tbd,
            analysis: value.as_object().cloned().unwrap(),
        }
    }

    fn analyzed(module: &str, page: PageStatus) -> ModuleReport {
        ModuleReport {
            module: module.to_string(),
            page_file: Some(format!("{}.md", module)),
            files: 2,
            chunks: 1,
            tbd_chunks: vec![],
            state: ModuleState::Analyzed {
                analysis: AnalysisStatus::Complete,
                page,
            },
            errors: vec![],
            usage: TokenUsage::default(),
        }
    }

    #[test]
    fn test_tbd_page_sections() {
        let page = tbd_page("auth", "no analysis");
        assert!(page.starts_with("# auth\n"));
        assert!(page.contains("no analysis"));
        assert_eq!(page.matches("TBD").count(), 4);
    }

    #[test]
    fn test_fallback_page_embeds_analysis() {
        let a = analysis("core", json!({"summary": "Engine"}), vec![1]);
        let page = fallback_page("core", "HTTP 500", &a).unwrap();
        assert!(page.contains("Fallback page"));
        assert!(page.contains("HTTP 500"));
        assert!(page.contains("```json"));
        assert!(page.contains("\"summary\": \"Engine\""));
        assert!(page.contains("1 of 3 chunks"));
    }

    #[test]
    fn test_modules_context_excludes_current() {
        let analyses = BTreeMap::from([
            ("auth".to_string(), analysis("auth", json!({"summary": "Login"}), vec![])),
            ("core".to_string(), analysis("core", json!({}), vec![])),
        ]);
        assert_eq!(modules_context("auth", &analyses), "- core: TBD");
        assert_eq!(modules_context("core", &analyses), "- auth: Login");
    }

    #[tokio::test]
    async fn test_write_page_normalizes_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.md");
        write_page(&path, "\n# auth\n\nBody\n\n\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# auth\n\nBody\n");
    }

    #[test]
    fn test_overview_contents() {
        let reports = vec![
            analyzed("auth", PageStatus::Generated),
            analyzed("core", PageStatus::Fallback),
            ModuleReport::skipped("lib", "No matching files for module 'lib'"),
        ];
        let analyses = BTreeMap::from([
            (
                "auth".to_string(),
                analysis("auth", json!({"summary": "Login | tokens", "calls": ["core.run"]}), vec![]),
            ),
            ("core".to_string(), analysis("core", json!({"summary": "Engine"}), vec![])),
        ]);
        let fields = vec!["calls".to_string()];

        let page = render_overview(&reports, &analyses, &fields);
        assert!(page.starts_with("# System Architecture"));
        assert!(page.contains("[auth](auth.md)"));
        assert!(page.contains("Login \\| tokens"));
        assert!(page.contains("| fallback |"));
        assert!(page.contains("- **lib**: No matching files"));
        assert!(page.contains("flowchart LR"));
        assert!(page.contains("m0 --> m1"));
        assert!(page.contains("1 module(s) were documented from partial"));
        assert!(MermaidValidator::validate(&page).is_valid());
    }
}

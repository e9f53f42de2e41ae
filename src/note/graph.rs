//! Module Graph
//!
//! Inter-module relations for the overview page. Relations come from the
//! configured edge fields of every module analysis. Entries may be plain
//! strings or objects:
//!
//! ```json
//! {"dependencies": ["core", {"to": "db", "from": "auth"}], "calls": "core.run"}
//! ```
//!
//! Targets are resolved against the known module names, case-insensitively.
//! A reference matches exactly, or through its root: the first directory of
//! a path (or the one after a `src`/`lib`-style anchor), or the leading
//! segment of a qualified name. Unresolved entries and self-edges are
//! dropped.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::constants::scan::MODULE_ANCHORS;

const TARGET_KEYS: &[&str] = &["to", "callee", "target", "module", "name"];
const SOURCE_KEYS: &[&str] = &["from", "caller"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleGraph {
    nodes: Vec<String>,
    /// (caller, callee), deduplicated and ordered
    edges: BTreeSet<(String, String)>,
}

impl ModuleGraph {
    /// Graph over `nodes` (sorted, deduplicated) with no edges
    pub fn new(nodes: impl IntoIterator<Item = String>) -> Self {
        let nodes: BTreeSet<String> = nodes.into_iter().collect();
        Self {
            nodes: nodes.into_iter().collect(),
            edges: BTreeSet::new(),
        }
    }

    /// Collect the relations found in one module's analysis
    pub fn add_analysis(&mut self, module: &str, analysis: &Map<String, Value>, edge_fields: &[String]) {
        for field in edge_fields {
            let Some(value) = analysis.get(field) else {
                continue;
            };
            match value {
                Value::Array(items) => {
                    for item in items {
                        self.add_entry(module, item);
                    }
                }
                other => self.add_entry(module, other),
            }
        }
    }

    fn add_entry(&mut self, module: &str, entry: &Value) {
        let (source, target) = match entry {
            Value::String(s) => (Some(module.to_string()), self.resolve(s)),
            Value::Object(obj) => {
                let target = first_string(obj, TARGET_KEYS).and_then(|t| self.resolve(t));
                let source = match first_string(obj, SOURCE_KEYS) {
                    Some(from) => self.resolve(from),
                    None => Some(module.to_string()),
                };
                (source, target)
            }
            _ => (None, None),
        };

        if let (Some(from), Some(to)) = (source, target)
            && from != to
        {
            self.edges.insert((from, to));
        }
    }

    /// Known module a free-form reference points at
    pub fn resolve(&self, reference: &str) -> Option<String> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }

        if let Some(exact) = self
            .nodes
            .iter()
            .find(|n| n.eq_ignore_ascii_case(reference))
        {
            return Some(exact.clone());
        }

        let candidates: Vec<&str> = if reference.contains(['/', '\\']) {
            let dirs: Vec<&str> = reference
                .split(['/', '\\'])
                .filter(|seg| !seg.is_empty() && *seg != ".")
                .collect();
            let anchored = dirs
                .iter()
                .position(|seg| MODULE_ANCHORS.contains(seg))
                .and_then(|i| dirs.get(i + 1));
            dirs.first().into_iter().chain(anchored).copied().collect()
        } else {
            reference
                .split(['.', ':'])
                .find(|seg| !seg.is_empty() && !matches!(*seg, "crate" | "self" | "super"))
                .into_iter()
                .collect()
        };

        candidates
            .into_iter()
            .find_map(|seg| self.nodes.iter().find(|n| n.eq_ignore_ascii_case(seg)))
            .cloned()
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().map(|(a, b)| (a.as_str(), b.as_str()))
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Render as a `flowchart LR` Mermaid diagram body (without fences)
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("flowchart LR\n");
        for (i, node) in self.nodes.iter().enumerate() {
            out.push_str(&format!("    {}[\"{}\"]\n", node_id(i), escape_label(node)));
        }
        for (from, to) in &self.edges {
            if let (Some(a), Some(b)) = (self.index_of(from), self.index_of(to)) {
                out.push_str(&format!("    {} --> {}\n", node_id(a), node_id(b)));
            }
        }
        out
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.nodes.binary_search_by(|n| n.as_str().cmp(name)).ok()
    }
}

fn first_string<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
}

fn node_id(index: usize) -> String {
    format!("m{}", index)
}

fn escape_label(name: &str) -> String {
    name.replace('"', "#quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields() -> Vec<String> {
        crate::constants::graph::DEFAULT_EDGE_FIELDS
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn graph() -> ModuleGraph {
        ModuleGraph::new(["auth", "core", "db"].map(String::from))
    }

    #[test]
    fn test_resolve_exact_and_segments() {
        let g = graph();
        assert_eq!(g.resolve("Core").as_deref(), Some("core"));
        assert_eq!(g.resolve("db/session.py").as_deref(), Some("db"));
        assert_eq!(g.resolve("auth.login").as_deref(), Some("auth"));
        assert_eq!(g.resolve("crate::db::pool").as_deref(), Some("db"));
        assert_eq!(g.resolve("src/core/engine.rs").as_deref(), Some("core"));
        assert_eq!(g.resolve("requests"), None);
        assert_eq!(g.resolve("  "), None);
    }

    #[test]
    fn test_external_paths_do_not_match_inner_segments() {
        let g = ModuleGraph::new(["io", "lib", "auth"].map(String::from));
        assert_eq!(g.resolve("tokio::io"), None);
        assert_eq!(g.resolve("std/lib"), None);
        assert_eq!(g.resolve("pkg.auth.login"), None);
        assert_eq!(g.resolve("lib/auth/token.py").as_deref(), Some("lib"));
    }

    #[test]
    fn test_edges_from_strings_and_objects() {
        let mut g = graph();
        let analysis = json!({
            "dependencies": ["core", "requests", "auth"],
            "calls": [
                {"callee": "db.query"},
                {"from": "core", "to": "db"},
                {"caller": "unknown", "callee": "db"}
            ],
            "imports": "core.utils"
        });
        g.add_analysis("auth", analysis.as_object().unwrap(), &fields());

        let edges: Vec<_> = g.edges().collect();
        assert_eq!(
            edges,
            vec![("auth", "core"), ("auth", "db"), ("core", "db")]
        );
    }

    #[test]
    fn test_mermaid_rendering() {
        let mut g = ModuleGraph::new(["web \"ui\"", "api"].map(String::from));
        let analysis = json!({"calls": ["api"]});
        g.add_analysis("web \"ui\"", analysis.as_object().unwrap(), &fields());

        let mermaid = g.to_mermaid();
        assert!(mermaid.starts_with("flowchart LR\n"));
        assert!(mermaid.contains("m0[\"api\"]"));
        assert!(mermaid.contains("m1[\"web #quot;ui#quot;\"]"));
        assert!(mermaid.contains("m1 --> m0"));

        let page = format!("```mermaid\n{}```\n", mermaid);
        assert!(crate::note::MermaidValidator::validate(&page).is_valid());
    }

    #[test]
    fn test_custom_edge_fields() {
        let mut g = graph();
        let analysis = json!({"dependencies": ["core"], "links": ["db"]});
        g.add_analysis("auth", analysis.as_object().unwrap(), &["links".to_string()]);
        let edges: Vec<_> = g.edges().collect();
        assert_eq!(edges, vec![("auth", "db")]);
    }
}

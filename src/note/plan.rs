//! Dry-run plan
//!
//! Scan, load, and chunk without calling the model or touching the output
//! and analysis directories.

use serde::Serialize;
use std::path::Path;
use tracing::debug;

use super::chunk::ChunkPlanner;
use crate::analyzer::{ScanResult, SkippedModule};
use crate::types::{NoteError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct ModulePlan {
    pub module: String,
    pub files: usize,
    pub chunks: usize,
    /// Files split across several chunks
    pub sliced_files: usize,
    pub chars: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unreadable: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub max_files_per_module: usize,
    pub max_chars_per_file: usize,
    pub modules: Vec<ModulePlan>,
    pub skipped: Vec<SkippedModule>,
}

impl PlanReport {
    pub fn build(root: &Path, scan: &ScanResult, planner: &ChunkPlanner) -> Result<Self> {
        let mut modules = Vec::with_capacity(scan.modules.len());
        let mut skipped = scan.skipped.clone();

        for module in &scan.modules {
            let loaded = module.load(root);
            if loaded.files.is_empty() {
                skipped.push(SkippedModule {
                    name: module.name.clone(),
                    reason: NoteError::NoReadableFiles {
                        module: module.name.clone(),
                    }
                    .to_string(),
                });
                continue;
            }
            let files = loaded.files;
            let chunks = planner.plan(&module.name, &files);
            let sliced_files = files
                .iter()
                .filter(|f| f.char_count > planner.limits().max_chars())
                .count();
            let chars = files.iter().map(|f| f.char_count).sum();

            debug!(
                "Planned '{}': {} files, {} chunks",
                module.name,
                files.len(),
                chunks.len()
            );

            modules.push(ModulePlan {
                module: module.name.clone(),
                files: files.len(),
                chunks: chunks.len(),
                sliced_files,
                chars,
                unreadable: loaded.unreadable,
            });
        }

        Ok(Self {
            max_files_per_module: planner.limits().max_files(),
            max_chars_per_file: planner.limits().max_chars(),
            modules,
            skipped,
        })
    }

    pub fn total_chunks(&self) -> usize {
        self.modules.iter().map(|m| m.chunks).sum()
    }

    pub fn total_files(&self) -> usize {
        self.modules.iter().map(|m| m.files).sum()
    }

    /// Model calls a real run would make: one per chunk plus one note per module
    pub fn estimated_calls(&self) -> usize {
        self.total_chunks() + self.modules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::FileScanner;
    use crate::note::ChunkLimits;
    use tempfile::TempDir;

    #[test]
    fn test_plan_counts_and_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("auth")).unwrap();
        std::fs::write(root.join("auth/a.py"), "a".repeat(25)).unwrap();
        std::fs::write(root.join("auth/b.py"), "b = 1\n").unwrap();
        std::fs::write(root.join("main.go"), "package main\n").unwrap();

        let before: Vec<_> = walk(root);
        let scan = FileScanner::new(root).scan().unwrap();
        let planner = ChunkPlanner::new(ChunkLimits::new(40, 10).unwrap());
        let report = PlanReport::build(root, &scan, &planner).unwrap();

        assert_eq!(report.modules.len(), 2);
        let auth = report.modules.iter().find(|m| m.module == "auth").unwrap();
        assert_eq!(auth.files, 2);
        assert_eq!(auth.sliced_files, 1);
        assert_eq!(auth.chunks, 4);
        assert_eq!(auth.chars, 31);
        assert_eq!(report.total_files(), 3);
        assert_eq!(report.estimated_calls(), report.total_chunks() + 2);

        assert_eq!(walk(root), before);
    }

    #[test]
    fn test_unreadable_files_do_not_abort_plan() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("net")).unwrap();
        std::fs::create_dir_all(root.join("ui")).unwrap();
        std::fs::write(root.join("net/a.c"), "int a;").unwrap();
        std::fs::write(root.join("net/b.c"), "int b;").unwrap();
        std::fs::write(root.join("ui/view.ts"), "export {}").unwrap();

        let scan = FileScanner::new(root).scan().unwrap();
        std::fs::remove_file(root.join("net/b.c")).unwrap();
        std::fs::remove_file(root.join("ui/view.ts")).unwrap();

        let planner = ChunkPlanner::new(ChunkLimits::new(40, 100).unwrap());
        let report = PlanReport::build(root, &scan, &planner).unwrap();

        assert_eq!(report.modules.len(), 1);
        let net = &report.modules[0];
        assert_eq!(net.files, 1);
        assert_eq!(net.unreadable.len(), 1);
        assert!(net.unreadable[0].starts_with("net/b.c"));
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].name, "ui");
    }

    fn walk(root: &Path) -> Vec<std::path::PathBuf> {
        let mut paths: Vec<_> = ignore::WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(false)
            .build()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .collect();
        paths.sort();
        paths
    }
}

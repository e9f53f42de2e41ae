use glob::Pattern;
use ignore::WalkBuilder;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::module::{ScanResult, SkippedModule, SourceFile, module_for, module_inside};
use crate::analyzer::language::Language;
use crate::config::{ModuleStrategy, ScanConfig};
use crate::constants::scan::MAX_FILE_SIZE;
use crate::types::{NoteError, Result};

pub struct FileScanner {
    root: PathBuf,
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    /// Exclude patterns ending in `/**` with that suffix removed
    exclude_dirs: Vec<Pattern>,
    strategy: ModuleStrategy,
    respect_gitignore: bool,
    max_file_size: u64,
}

impl FileScanner {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            include: Vec::new(),
            exclude: Vec::new(),
            exclude_dirs: Vec::new(),
            strategy: ModuleStrategy::default(),
            respect_gitignore: true,
            max_file_size: MAX_FILE_SIZE,
        }
    }

    /// Build a scanner from the `[scan]` config section
    pub fn from_config<P: AsRef<Path>>(root: P, config: &ScanConfig) -> Result<Self> {
        Ok(Self::new(root)
            .with_include(&config.include)?
            .with_exclude(&config.exclude)?
            .with_strategy(config.module_strategy)
            .respect_gitignore(config.respect_gitignore)
            .with_max_file_size(config.max_file_size))
    }

    pub fn with_include(mut self, patterns: &[String]) -> Result<Self> {
        self.include = compile(patterns)?;
        Ok(self)
    }

    pub fn with_exclude(mut self, patterns: &[String]) -> Result<Self> {
        self.exclude = compile(patterns)?;
        let dir_patterns: Vec<String> = patterns
            .iter()
            .filter_map(|p| p.strip_suffix("/**"))
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();
        self.exclude_dirs = compile(&dir_patterns)?;
        Ok(self)
    }

    pub fn with_strategy(mut self, strategy: ModuleStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn respect_gitignore(mut self, enabled: bool) -> Self {
        self.respect_gitignore = enabled;
        self
    }

    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Walk the repository and partition supported files into modules
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root.is_dir() {
            return Err(NoteError::config(format!(
                "Repository path is not a directory: {}",
                self.root.display()
            )));
        }

        let pruned: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let walker = {
            let root = self.root.clone();
            let exclude = self.exclude.clone();
            let exclude_dirs = self.exclude_dirs.clone();
            let pruned = Arc::clone(&pruned);

            WalkBuilder::new(&self.root)
                .hidden(false)
                .git_ignore(self.respect_gitignore)
                .git_global(self.respect_gitignore)
                .git_exclude(self.respect_gitignore)
                .require_git(false)
                .follow_links(false) // Security: prevent symlink traversal attacks
                .filter_entry(move |entry| {
                    if !entry.file_type().is_some_and(|t| t.is_dir()) {
                        return true;
                    }
                    let Some(rel) = relative_path(&root, entry.path()) else {
                        return true;
                    };
                    if rel.is_empty() {
                        return true;
                    }
                    let prune = exclude.iter().chain(&exclude_dirs).any(|p| p.matches(&rel));
                    if prune && let Ok(mut dirs) = pruned.lock() {
                        dirs.push(rel);
                    }
                    !prune
                })
                .build()
        };

        let mut groups: BTreeMap<String, Vec<SourceFile>> = BTreeMap::new();
        let mut present: BTreeSet<String> = BTreeSet::new();
        let mut oversized: BTreeSet<String> = BTreeSet::new();

        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            let Some(language) = Language::from_path(path) else {
                continue;
            };
            let Some(rel) = relative_path(&self.root, path) else {
                continue;
            };
            let module = module_for(&rel, self.strategy);

            if !self.accepts(&rel) {
                present.insert(module);
                continue;
            }

            let size_bytes = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    warn!("Skipping {}: {}", rel, e);
                    present.insert(module);
                    continue;
                }
            };
            if size_bytes > self.max_file_size {
                debug!(
                    "Skipping {} ({} bytes exceeds {} byte limit)",
                    rel, size_bytes, self.max_file_size
                );
                oversized.insert(module.clone());
                present.insert(module);
                continue;
            }

            groups.entry(module.clone()).or_default().push(SourceFile {
                path: rel,
                language,
                size_bytes,
                module,
            });
        }

        if let Ok(dirs) = pruned.lock() {
            for dir in dirs.iter() {
                debug!("Pruned directory {}", dir);
                if let Some(module) = module_inside(dir, self.strategy) {
                    present.insert(module);
                }
            }
        }

        let mut result = ScanResult::from_groups(groups);
        result.skipped = present
            .into_iter()
            .filter(|module| !result.modules.iter().any(|m| &m.name == module))
            .map(|module| {
                let reason = if oversized.contains(&module) {
                    NoteError::OversizedFiles {
                        module: module.clone(),
                        limit: self.max_file_size,
                    }
                } else {
                    NoteError::NoMatchingFiles {
                        module: module.clone(),
                    }
                };
                SkippedModule {
                    reason: reason.to_string(),
                    name: module,
                }
            })
            .collect();

        debug!(
            "Scanned {} files in {} modules ({} skipped)",
            result.total_files(),
            result.modules.len(),
            result.skipped.len()
        );

        Ok(result)
    }

    /// Include/exclude decision for a relative file path; exclude wins
    fn accepts(&self, rel: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| p.matches(rel));
        included && !self.exclude.iter().any(|p| p.matches(rel))
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| NoteError::config(format!("Invalid glob '{}': {}", p, e)))
        })
        .collect()
}

/// `/`-separated path relative to `root`
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::scan::DEFAULT_EXCLUDES;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn defaults() -> Vec<String> {
        DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_scan_groups_and_orders() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "core/z.rs", "fn z() {}");
        write(dir.path(), "core/a.rs", "fn a() {}");
        write(dir.path(), "auth/login.py", "def login(): pass");
        write(dir.path(), "auth/README.md", "# docs");
        write(dir.path(), "main.go", "package main");

        let result = FileScanner::new(dir.path())
            .with_exclude(&defaults())
            .unwrap()
            .scan()
            .unwrap();

        assert_eq!(result.module_names(), vec!["auth", "core", "root"]);
        let core = &result.modules[1];
        let paths: Vec<_> = core.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["core/a.rs", "core/z.rs"]);
        assert_eq!(result.modules[0].files.len(), 1);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_default_excludes_prune_build_dirs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "app/main.ts", "export {}");
        write(dir.path(), "app/node_modules/dep/index.js", "module.exports = 1");
        write(dir.path(), "target/debug/build.rs", "fn main() {}");

        let result = FileScanner::new(dir.path())
            .with_exclude(&defaults())
            .unwrap()
            .scan()
            .unwrap();

        assert_eq!(result.module_names(), vec!["app"]);
        assert_eq!(result.total_files(), 1);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_excluded_module_reported_as_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "lib/vendor/zlib.c", "int inflate();");
        write(dir.path(), "lib/vendor/zlib.h", "int inflate();");
        write(dir.path(), "core/engine.c", "int run();");

        let mut exclude = defaults();
        exclude.push("**/vendor/**".to_string());
        let result = FileScanner::new(dir.path())
            .with_exclude(&exclude)
            .unwrap()
            .scan()
            .unwrap();

        assert_eq!(result.module_names(), vec!["core"]);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].name, "lib");
        assert!(result.skipped[0].reason.contains("No matching files"));
    }

    #[test]
    fn test_include_restricts_and_exclude_wins() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "net/socket.c", "");
        write(dir.path(), "net/socket_test.c", "");
        write(dir.path(), "ui/view.ts", "");

        let result = FileScanner::new(dir.path())
            .with_include(&["net/*".to_string()])
            .unwrap()
            .with_exclude(&["*_test.c".to_string()])
            .unwrap()
            .scan()
            .unwrap();

        assert_eq!(result.module_names(), vec!["net"]);
        assert_eq!(result.modules[0].files[0].path, "net/socket.c");
        assert_eq!(result.skipped[0].name, "ui");
    }

    #[test]
    fn test_max_file_size() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "big/huge.py", &"x".repeat(64));
        write(dir.path(), "big/small.py", "x");

        let result = FileScanner::new(dir.path())
            .with_max_file_size(10)
            .scan()
            .unwrap();

        assert_eq!(result.total_files(), 1);
        assert_eq!(result.modules[0].files[0].path, "big/small.py");
    }

    #[test]
    fn test_module_with_only_oversized_files_is_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "assets/blob.js", &"x".repeat(64));
        write(dir.path(), "core/run.py", "x");

        let result = FileScanner::new(dir.path())
            .with_max_file_size(10)
            .scan()
            .unwrap();

        assert_eq!(result.module_names(), vec!["core"]);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].name, "assets");
        assert!(result.skipped[0].reason.contains("10 byte size limit"));
    }

    #[test]
    fn test_missing_repo_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = FileScanner::new(dir.path().join("nope")).scan().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_glob_rejected() {
        let result = FileScanner::new(".").with_exclude(&["[".to_string()]);
        assert!(result.is_err());
    }
}

//! Module partitioning and scanned file types

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

use crate::analyzer::language::Language;
use crate::config::ModuleStrategy;
use crate::constants::scan::{MODULE_ANCHORS, ROOT_MODULE};
use crate::types::Result;

/// A supported source file discovered by the scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    /// Path relative to the repository root, `/`-separated
    pub path: String,
    pub language: Language,
    pub size_bytes: u64,
    pub module: String,
}

impl SourceFile {
    /// Read the file as UTF-8, replacing invalid sequences
    pub fn load(&self, root: &Path) -> Result<LoadedFile> {
        let bytes = std::fs::read(root.join(&self.path))?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let char_count = content.chars().count();
        Ok(LoadedFile {
            file: self.clone(),
            content,
            char_count,
        })
    }
}

/// File content loaded for chunk planning
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub file: SourceFile,
    pub content: String,
    pub char_count: usize,
}

impl LoadedFile {
    pub fn path(&self) -> &str {
        &self.file.path
    }
}

/// A named group of files documented by one page
#[derive(Debug, Clone, Serialize)]
pub struct Module {
    pub name: String,
    /// Sorted lexicographically by relative path
    pub files: Vec<SourceFile>,
}

impl Module {
    /// Load member files in order. Unreadable files are left out and
    /// recorded instead of failing the module.
    pub fn load(&self, root: &Path) -> LoadedModule {
        let mut loaded = LoadedModule::default();
        for file in &self.files {
            match file.load(root) {
                Ok(f) => loaded.files.push(f),
                Err(e) => {
                    warn!("Skipping unreadable file {}: {}", file.path, e);
                    loaded.unreadable.push(format!("{}: {}", file.path, e));
                }
            }
        }
        loaded
    }
}

#[derive(Debug, Default)]
pub struct LoadedModule {
    pub files: Vec<LoadedFile>,
    /// `path: error` for each file that could not be read
    pub unreadable: Vec<String>,
}

/// A module that was detected but has nothing left to document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedModule {
    pub name: String,
    pub reason: String,
}

/// Scanner output: modules in lexicographic order plus skipped modules
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    pub modules: Vec<Module>,
    pub skipped: Vec<SkippedModule>,
}

impl ScanResult {
    pub fn total_files(&self) -> usize {
        self.modules.iter().map(|m| m.files.len()).sum()
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    pub(super) fn from_groups(groups: BTreeMap<String, Vec<SourceFile>>) -> Self {
        let modules = groups
            .into_iter()
            .map(|(name, mut files)| {
                files.sort_by(|a, b| a.path.cmp(&b.path));
                Module { name, files }
            })
            .collect();
        Self {
            modules,
            skipped: Vec::new(),
        }
    }
}

/// Module name for a relative file path
pub fn module_for(rel_path: &str, strategy: ModuleStrategy) -> String {
    let parts: Vec<&str> = rel_path.split('/').filter(|p| !p.is_empty()).collect();
    if parts.len() < 2 {
        return ROOT_MODULE.to_string();
    }

    if strategy == ModuleStrategy::Anchored {
        let dirs = &parts[..parts.len() - 1];
        if let Some(idx) = dirs.iter().position(|p| MODULE_ANCHORS.contains(p))
            && idx + 1 < dirs.len()
        {
            return dirs[idx + 1].to_string();
        }
    }

    parts[0].to_string()
}

/// Module a pruned directory belongs to, if the directory lies strictly
/// inside that module's root
pub fn module_inside(dir_rel: &str, strategy: ModuleStrategy) -> Option<String> {
    let module = module_for(&format!("{}/_", dir_rel), strategy);
    let parent = match dir_rel.rsplit_once('/') {
        Some((parent, _)) => format!("{}/_", parent),
        None => "_".to_string(),
    };
    (module_for(&parent, strategy) == module).then_some(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_modules() {
        let s = ModuleStrategy::TopLevel;
        assert_eq!(module_for("auth/login.py", s), "auth");
        assert_eq!(module_for("core/src/engine/run.rs", s), "core");
        assert_eq!(module_for("setup.py", s), "root");
    }

    #[test]
    fn test_anchored_modules() {
        let s = ModuleStrategy::Anchored;
        assert_eq!(module_for("src/net/socket.c", s), "net");
        assert_eq!(module_for("pkg/lib/util/strings.go", s), "util");
        assert_eq!(module_for("src/main.rs", s), "src");
        assert_eq!(module_for("tools/gen.sh", s), "tools");
        assert_eq!(module_for("main.go", s), "root");
    }

    #[test]
    fn test_module_inside() {
        let s = ModuleStrategy::TopLevel;
        assert_eq!(module_inside("lib/vendor", s), Some("lib".to_string()));
        assert_eq!(module_inside("lib/a/vendor", s), Some("lib".to_string()));
        assert_eq!(module_inside("target", s), None);

        let a = ModuleStrategy::Anchored;
        assert_eq!(module_inside("src/core/vendor", a), Some("core".to_string()));
        assert_eq!(module_inside("src/core", a), None);
    }

    #[test]
    fn test_lossy_load() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.c"), b"int x;\xff\xfe\n").unwrap();
        let file = SourceFile {
            path: "bad.c".to_string(),
            language: Language::C,
            size_bytes: 9,
            module: "root".to_string(),
        };
        let loaded = file.load(dir.path()).unwrap();
        assert!(loaded.content.starts_with("int x;"));
        assert!(loaded.content.contains('\u{FFFD}'));
        assert_eq!(loaded.char_count, loaded.content.chars().count());
    }

    #[test]
    fn test_unreadable_file_left_out() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("net")).unwrap();
        std::fs::write(dir.path().join("net/a.c"), "int a;").unwrap();
        let source = |path: &str| SourceFile {
            path: path.to_string(),
            language: Language::C,
            size_bytes: 6,
            module: "net".to_string(),
        };
        let module = Module {
            name: "net".to_string(),
            files: vec![source("net/a.c"), source("net/gone.c")],
        };

        let loaded = module.load(dir.path());
        assert_eq!(loaded.files.len(), 1);
        assert_eq!(loaded.files[0].path(), "net/a.c");
        assert_eq!(loaded.unreadable.len(), 1);
        assert!(loaded.unreadable[0].starts_with("net/gone.c: "));
    }
}

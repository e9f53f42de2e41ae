//! Analysis Artifact Store
//!
//! Persists merged module analyses as `<analysis_dir>/<stem>.json` and the
//! run summary next to them. Every write goes to a temporary sibling first and
//! is renamed into place, so an interrupted run never leaves a half-written
//! file behind.
//!
//! ## Re-use
//!
//! An artifact carries a fingerprint over everything that shaped it: module
//! name, chunk limits, analysis template text, and each member file's path and
//! content. A later run re-uses it only when the fingerprint matches and no
//! chunk ended as `TBD`.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::chunk::ChunkLimits;
use super::types::{ModuleAnalysis, RunSummary};
use crate::analyzer::LoadedFile;
use crate::constants::output;
use crate::types::Result;

/// SHA-256 fingerprint of a module's analysis inputs
pub fn fingerprint(
    module: &str,
    limits: ChunkLimits,
    template_text: &str,
    files: &[LoadedFile],
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(module.as_bytes());
    hasher.update(b"\0");
    hasher.update(limits.max_files().to_le_bytes());
    hasher.update(limits.max_chars().to_le_bytes());
    hasher.update(b"\0");
    hasher.update(template_text.as_bytes());
    for file in files {
        hasher.update(b"\0");
        hasher.update(file.path().as_bytes());
        hasher.update(b"\0");
        hasher.update(file.content.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Write through a temporary sibling and rename into place
pub async fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub fn path_for(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{}.json", stem))
    }

    /// Load a persisted analysis; unreadable or malformed artifacts count as
    /// absent
    pub async fn load(&self, stem: &str) -> Option<ModuleAnalysis> {
        let path = self.path_for(stem);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read artifact {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<ModuleAnalysis>(&content) {
            Ok(analysis) => {
                debug!("Loaded artifact {}", path.display());
                Some(analysis)
            }
            Err(e) => {
                warn!("Ignoring malformed artifact {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Stored analysis that may stand in for a fresh one
    pub async fn reusable(&self, stem: &str, fingerprint: &str) -> Option<ModuleAnalysis> {
        self.load(stem)
            .await
            .filter(|a| a.fingerprint == fingerprint && a.is_complete())
    }

    pub async fn save(&self, stem: &str, analysis: &ModuleAnalysis) -> Result<PathBuf> {
        let path = self.path_for(stem);
        let content = serde_json::to_string_pretty(analysis)?;
        atomic_write(&path, content.as_bytes()).await?;
        info!(
            "Saved analysis for '{}' ({} chunks, {} TBD)",
            analysis.module,
            analysis.chunk_count,
            analysis.tbd_chunks.len()
        );
        Ok(path)
    }

    pub async fn save_summary(&self, summary: &RunSummary) -> Result<PathBuf> {
        let path = self.dir.join(output::RUN_SUMMARY_FILE);
        let content = serde_json::to_string_pretty(summary)?;
        atomic_write(&path, content.as_bytes()).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{Language, SourceFile};
    use chrono::Utc;
    use serde_json::{Map, json};
    use tempfile::TempDir;

    fn loaded(path: &str, content: &str) -> LoadedFile {
        LoadedFile {
            file: SourceFile {
                path: path.to_string(),
                language: Language::Python,
                size_bytes: content.len() as u64,
                module: "auth".to_string(),
            },
            content: content.to_string(),
            char_count: content.chars().count(),
        }
    }

    fn analysis(fingerprint: &str, tbd: Vec<usize>) -> ModuleAnalysis {
        let mut map = Map::new();
        map.insert("summary".to_string(), json!("Token handling"));
        ModuleAnalysis {
            module: "auth".to_string(),
            fingerprint: fingerprint.to_string(),
            generated_at: Utc::now(),
            chunk_count: 2,
            tbd_chunks: tbd,
            analysis: map,
        }
    }

    #[test]
    fn test_fingerprint_tracks_inputs() {
        let limits = ChunkLimits::new(40, 10_000).unwrap();
        let files = vec![loaded("auth/a.py", "x = 1"), loaded("auth/b.py", "y = 2")];
        let base = fingerprint("auth", limits, "tmpl", &files);

        assert_eq!(base, fingerprint("auth", limits, "tmpl", &files));
        assert_eq!(base.len(), 64);

        let edited = vec![loaded("auth/a.py", "x = 2"), loaded("auth/b.py", "y = 2")];
        assert_ne!(base, fingerprint("auth", limits, "tmpl", &edited));
        assert_ne!(base, fingerprint("auth", limits, "tmpl v2", &files));
        assert_ne!(
            base,
            fingerprint("auth", ChunkLimits::new(2, 10_000).unwrap(), "tmpl", &files)
        );
        assert_ne!(base, fingerprint("core", limits, "tmpl", &files));
    }

    #[tokio::test]
    async fn test_atomic_write_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("page.md");
        atomic_write(&target, b"first").await.unwrap();
        atomic_write(&target, b"second").await.unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "second");
        let entries: Vec<_> = std::fs::read_dir(target.parent().unwrap())
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_save_and_reuse() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("analysis"));

        store.save("auth", &analysis("fp1", vec![])).await.unwrap();
        assert!(store.path_for("auth").exists());
        assert!(store.reusable("auth", "fp1").await.is_some());
        assert!(store.reusable("auth", "fp2").await.is_none());

        store.save("auth", &analysis("fp1", vec![1])).await.unwrap();
        assert!(store.reusable("auth", "fp1").await.is_none());
        assert_eq!(store.load("auth").await.unwrap().tbd_chunks, vec![1]);
    }

    #[tokio::test]
    async fn test_malformed_artifact_is_absent() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        std::fs::write(store.path_for("core"), "{not json").unwrap();
        assert!(store.load("core").await.is_none());
        assert!(store.load("missing").await.is_none());
    }
}

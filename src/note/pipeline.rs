//! Two-pass generation pipeline
//!
//! ```text
//! scan → load → chunk ─┬─ analysis pass (chunks ∥) → merge → <module>.json
//!                      └─ note pass → <module>.md
//!                                       ↓ (all modules done)
//!                              System-Architecture.md + run-summary.json
//! ```
//!
//! Every module is analyzed and persisted before any note is requested, so
//! the note prompt can list the summaries of all other modules. Model and
//! parse failures never abort the run: chunks degrade to `TBD`, pages degrade
//! to fallback or TBD pages, and the errors are collected in the run summary.

use chrono::Utc;
use futures::StreamExt;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use super::aggregate::merge_records;
use super::artifact::{ArtifactStore, fingerprint};
use super::chunk::{Chunk, ChunkLimits, ChunkPlanner};
use super::synthesize::{fallback_page, modules_context, render_overview, tbd_page, write_page};
use super::types::{
    AnalysisStatus, ChunkOutcome, ModuleAnalysis, ModuleReport, ModuleState, PageStatus,
    RunSummary,
};
use crate::ai::{PromptTemplates, SharedClient, TokenUsage, clean_markdown, parse_json_object};
use crate::analyzer::{FileScanner, Module};
use crate::config::Config;
use crate::constants::output;
use crate::types::{NoteError, Result, safe_file_stem};

/// Analysis pass result of one module
#[derive(Debug, Clone)]
struct ModuleRun {
    stem: String,
    files: usize,
    status: AnalysisStatus,
    analysis: ModuleAnalysis,
    errors: Vec<String>,
    usage: TokenUsage,
}

#[derive(Debug)]
struct ChunkResult {
    index: usize,
    outcome: ChunkOutcome,
    usage: TokenUsage,
}

pub struct NotePipeline {
    config: Config,
    client: SharedClient,
    templates: PromptTemplates,
    repo: PathBuf,
    out: PathBuf,
    force: bool,
}

impl NotePipeline {
    pub fn new(
        config: Config,
        client: SharedClient,
        templates: PromptTemplates,
        repo: impl Into<PathBuf>,
        out: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            client,
            templates,
            repo: repo.into(),
            out: out.into(),
            force: false,
        }
    }

    /// Ignore persisted analyses even when their fingerprint matches
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[instrument(skip(self), fields(repo = %self.repo.display(), out = %self.out.display()))]
    pub async fn run(&self) -> Result<RunSummary> {
        let started_at = Utc::now();
        let planner = ChunkPlanner::new(ChunkLimits::from_config(&self.config.chunking)?);

        let scan = FileScanner::from_config(&self.repo, &self.config.scan)?.scan()?;
        if scan.modules.is_empty() {
            return Err(NoteError::config(format!(
                "No supported source files found under {}",
                self.repo.display()
            )));
        }
        info!(
            "Scanned {} files in {} modules ({} skipped)",
            scan.total_files(),
            scan.modules.len(),
            scan.skipped.len()
        );

        tokio::fs::create_dir_all(&self.out).await.map_err(|e| {
            NoteError::config(format!(
                "Cannot create output directory {}: {}",
                self.out.display(),
                e
            ))
        })?;
        let store = ArtifactStore::new(&self.config.output.analysis_dir);
        store.ensure_dir().await.map_err(|e| {
            NoteError::config(format!(
                "Cannot create analysis directory {}: {}",
                store.dir().display(),
                e
            ))
        })?;

        let stems = assign_stems(scan.modules.iter().map(|m| m.name.as_str()));
        let mut reports: Vec<ModuleReport> = scan
            .skipped
            .iter()
            .map(|s| ModuleReport::skipped(&s.name, &s.reason))
            .collect();

        // Pass 1: analysis
        info!("Analysis pass: {} modules", scan.modules.len());
        let analyzed: Vec<(String, Result<ModuleRun>)> = futures::stream::iter(&scan.modules)
            .map(|module| {
                let stem = stems.get(&module.name).cloned().unwrap_or_default();
                let planner = &planner;
                let store = &store;
                async move {
                    let result = self.analyze_module(module, stem, planner, store).await;
                    (module.name.clone(), result)
                }
            })
            .buffer_unordered(self.config.concurrency.modules)
            .collect()
            .await;

        let mut runs = Vec::new();
        for (module, result) in analyzed {
            match result {
                Ok(run) => runs.push(run),
                Err(e) => {
                    warn!("Skipping module '{}': {}", module, e);
                    reports.push(ModuleReport::skipped(module, e.to_string()));
                }
            }
        }
        runs.sort_by(|a, b| a.analysis.module.cmp(&b.analysis.module));

        let analyses: BTreeMap<String, ModuleAnalysis> = runs
            .iter()
            .map(|r| (r.analysis.module.clone(), r.analysis.clone()))
            .collect();

        // Pass 2: notes
        info!("Note pass: {} modules", runs.len());
        let noted: Vec<ModuleReport> = futures::stream::iter(runs)
            .map(|run| self.note_module(run, &analyses))
            .buffer_unordered(self.config.concurrency.modules)
            .collect()
            .await;
        reports.extend(noted);
        reports.sort_by(|a, b| a.module.cmp(&b.module));

        // Join point: every module is terminal
        let overview = render_overview(&reports, &analyses, &self.config.output.edge_fields);
        let mut errors = Vec::new();
        let overview_path = self.out.join(output::OVERVIEW_PAGE);
        let overview_file = match write_page(&overview_path, &overview).await {
            Ok(()) => {
                info!("Wrote {}", output::OVERVIEW_PAGE);
                Some(output::OVERVIEW_PAGE.to_string())
            }
            Err(e) => {
                warn!("Failed to write {}: {}", output::OVERVIEW_PAGE, e);
                errors.push(format!("overview: {}", e));
                None
            }
        };

        let mut usage = TokenUsage::default();
        for report in &reports {
            usage.add(report.usage);
        }

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            repo: self.repo.clone(),
            out: self.out.clone(),
            model: self.client.model().to_string(),
            overview: overview_file,
            modules: reports,
            usage,
            errors,
        };
        if let Err(e) = store.save_summary(&summary).await {
            warn!("Failed to write run summary: {}", e);
        }

        Ok(summary)
    }

    // =========================================================================
    // Analysis pass
    // =========================================================================

    #[instrument(skip_all, fields(module = %module.name))]
    async fn analyze_module(
        &self,
        module: &Module,
        stem: String,
        planner: &ChunkPlanner,
        store: &ArtifactStore,
    ) -> Result<ModuleRun> {
        let loaded = module.load(&self.repo);
        if loaded.files.is_empty() {
            return Err(NoteError::NoReadableFiles {
                module: module.name.clone(),
            });
        }
        let mut errors: Vec<String> = loaded
            .unreadable
            .iter()
            .map(|u| format!("unreadable {}", u))
            .collect();
        let files = loaded.files;
        let chunks = planner.plan(&module.name, &files);
        let fp = fingerprint(
            &module.name,
            planner.limits(),
            self.templates.analysis.text(),
            &files,
        );

        if !self.force
            && let Some(existing) = store.reusable(&stem, &fp).await
        {
            info!("Re-using persisted analysis for '{}'", module.name);
            return Ok(ModuleRun {
                stem,
                files: files.len(),
                status: AnalysisStatus::Reused,
                analysis: existing,
                errors,
                usage: TokenUsage::default(),
            });
        }

        info!(
            "Analyzing '{}': {} files in {} chunks",
            module.name,
            files.len(),
            chunks.len()
        );

        let chunk_count = chunks.len();
        let mut results: Vec<ChunkResult> = futures::stream::iter(&chunks)
            .map(|chunk| self.analyze_chunk(chunk, chunk_count))
            .buffer_unordered(self.config.concurrency.chunks)
            .collect()
            .await;
        results.sort_by_key(|r| r.index);

        let mut usage = TokenUsage::default();
        let mut records = Vec::with_capacity(results.len());
        let mut tbd_chunks = Vec::new();
        for result in results {
            usage.add(result.usage);
            match result.outcome {
                ChunkOutcome::Analyzed(record) => records.push(record),
                ChunkOutcome::Tbd { reason } => {
                    errors.push(format!("chunk {}: {}", result.index + 1, reason));
                    tbd_chunks.push(result.index);
                }
            }
        }

        let status = if tbd_chunks.is_empty() {
            AnalysisStatus::Complete
        } else {
            AnalysisStatus::Degraded
        };
        let analysis = ModuleAnalysis {
            module: module.name.clone(),
            fingerprint: fp,
            generated_at: Utc::now(),
            chunk_count,
            tbd_chunks,
            analysis: merge_records(records),
        };

        if let Err(e) = store.save(&stem, &analysis).await {
            warn!("Failed to persist analysis for '{}': {}", module.name, e);
            errors.push(format!("persist analysis: {}", e));
        }

        Ok(ModuleRun {
            stem,
            files: files.len(),
            status,
            analysis,
            errors,
            usage,
        })
    }

    async fn analyze_chunk(&self, chunk: &Chunk, chunk_count: usize) -> ChunkResult {
        let tbd = |reason: String| {
            warn!(
                "Chunk {}/{} of '{}' is TBD: {}",
                chunk.index + 1,
                chunk_count,
                chunk.module,
                reason
            );
            ChunkOutcome::Tbd { reason }
        };

        let payload = chunk.payload(chunk_count).to_string();
        let prompt = match self.templates.render_analysis(
            &chunk.module,
            chunk.index,
            chunk_count,
            &payload,
        ) {
            Ok(prompt) => prompt,
            Err(e) => {
                return ChunkResult {
                    index: chunk.index,
                    outcome: tbd(e.to_string()),
                    usage: TokenUsage::default(),
                };
            }
        };

        debug!(
            "Submitting chunk {}/{} of '{}' ({} parts, {} chars)",
            chunk.index + 1,
            chunk_count,
            chunk.module,
            chunk.parts.len(),
            chunk.char_count()
        );

        match self.client.complete(&prompt).await {
            Ok(response) => {
                let outcome = match parse_json_object(&response.content) {
                    Ok(record) => ChunkOutcome::Analyzed(record),
                    Err(e) => tbd(e.to_string()),
                };
                ChunkResult {
                    index: chunk.index,
                    outcome,
                    usage: response.usage,
                }
            }
            Err(e) => ChunkResult {
                index: chunk.index,
                outcome: tbd(e.to_string()),
                usage: TokenUsage::default(),
            },
        }
    }

    // =========================================================================
    // Note pass
    // =========================================================================

    #[instrument(skip_all, fields(module = %run.analysis.module))]
    async fn note_module(
        &self,
        mut run: ModuleRun,
        analyses: &BTreeMap<String, ModuleAnalysis>,
    ) -> ModuleReport {
        let module = run.analysis.module.clone();
        let page_file = format!("{}.md", run.stem);
        let path = self.out.join(&page_file);

        let analysis_json = if run.analysis.analysis.is_empty() {
            None
        } else {
            serde_json::to_string_pretty(&run.analysis.analysis).ok()
        };
        let context = modules_context(&module, analyses);

        let (markdown, page_status) = match self.templates.render_note(
            &module,
            analysis_json.as_deref(),
            &context,
        ) {
            Err(e) => {
                warn!("Writing TBD page for '{}': {}", module, e);
                run.errors.push(format!("note: {}", e));
                (tbd_page(&module, &e.to_string()), PageStatus::Tbd)
            }
            Ok(prompt) => match self.request_note(&prompt, &mut run.usage).await {
                Ok(markdown) => (markdown, PageStatus::Generated),
                Err(e) => {
                    warn!("Writing fallback page for '{}': {}", module, e);
                    run.errors.push(format!("note: {}", e));
                    match fallback_page(&module, &e.to_string(), &run.analysis) {
                        Ok(page) => (page, PageStatus::Fallback),
                        Err(e) => (tbd_page(&module, &e.to_string()), PageStatus::Tbd),
                    }
                }
            },
        };

        let written = match write_page(&path, &markdown).await {
            Ok(()) => {
                info!("Wrote {} ({})", page_file, page_status);
                Some(page_file)
            }
            Err(e) => {
                warn!("Failed to write {}: {}", path.display(), e);
                run.errors.push(format!("write page: {}", e));
                None
            }
        };

        ModuleReport {
            module,
            page_file: written,
            files: run.files,
            chunks: run.analysis.chunk_count,
            tbd_chunks: run.analysis.tbd_chunks.clone(),
            state: ModuleState::Analyzed {
                analysis: run.status,
                page: page_status,
            },
            errors: run.errors,
            usage: run.usage,
        }
    }

    async fn request_note(&self, prompt: &str, usage: &mut TokenUsage) -> Result<String> {
        let response = self.client.complete(prompt).await?;
        usage.add(response.usage);
        clean_markdown(&response.content)
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    pub fn out(&self) -> &Path {
        &self.out
    }
}

/// File stems for module names, unique and never the overview's stem.
/// Names are taken in the given order; later collisions get `-2`, `-3`, ...
fn assign_stems<'a>(names: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, String> {
    let reserved = output::OVERVIEW_PAGE.trim_end_matches(".md").to_lowercase();
    let mut used: HashSet<String> = HashSet::from([reserved]);
    let mut stems = BTreeMap::new();

    for name in names {
        let base = safe_file_stem(name);
        let mut stem = base.clone();
        let mut n = 2;
        // case-insensitive filesystems
        while used.contains(&stem.to_lowercase()) {
            stem = format!("{}-{}", base, n);
            n += 1;
        }
        used.insert(stem.to_lowercase());
        stems.insert(name.to_string(), stem);
    }
    stems
}

//! Generate Command
//!
//! Runs the two-pass note generation, or only the chunk plan with
//! `--dry-run`.
//!
//! Usage:
//!   codenote --repo <path> --out <dir> [--include <glob>]... [--exclude <glob>]...
//!   codenote --repo <path> --dry-run [--format json]
//!   codenote --repo <path> --print-config

use std::path::{Path, PathBuf};

use tokio::runtime::Runtime;
use tracing::info;

use crate::ai::{PromptTemplates, create_client};
use crate::analyzer::FileScanner;
use crate::cli::ui::Output;
use crate::config::{Config, ConfigLoader, ModuleStrategy};
use crate::note::{ChunkLimits, ChunkPlanner, ModuleState, NotePipeline, PlanReport, RunSummary};
use crate::types::{NoteError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Generate run options (consolidated parameters)
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub repo: PathBuf,
    /// Required unless `dry_run`
    pub out: Option<PathBuf>,
    /// Explicit config file, layered over global and project config
    pub config: Option<PathBuf>,
    pub max_files_per_module: Option<usize>,
    pub max_chars_per_file: Option<usize>,
    /// Added to the configured include globs
    pub include: Vec<String>,
    /// Added to the configured exclude globs
    pub exclude: Vec<String>,
    pub analysis_dir: Option<PathBuf>,
    pub module_strategy: Option<ModuleStrategy>,
    pub dry_run: bool,
    /// Re-analyze even when a persisted analysis matches
    pub force: bool,
    pub format: OutputFormat,
    pub print_config: bool,
    pub quiet: bool,
}

/// Fold command-line overrides into the loaded configuration
pub fn apply_overrides(config: &mut Config, options: &GenerateOptions) {
    if let Some(max_files) = options.max_files_per_module {
        config.chunking.max_files_per_module = max_files;
    }
    if let Some(max_chars) = options.max_chars_per_file {
        config.chunking.max_chars_per_file = max_chars;
    }
    config.scan.include.extend(options.include.iter().cloned());
    config.scan.exclude.extend(options.exclude.iter().cloned());
    if let Some(strategy) = options.module_strategy {
        config.scan.module_strategy = strategy;
    }
    if let Some(dir) = &options.analysis_dir {
        config.output.analysis_dir = dir.clone();
    }
}

pub fn run(options: GenerateOptions) -> Result<()> {
    let output = Output::new(options.quiet);

    let mut config = ConfigLoader::load(options.config.as_deref())?;
    apply_overrides(&mut config, &options);
    config.validate()?;

    if options.print_config {
        println!("{}", ConfigLoader::render(&config)?);
        return Ok(());
    }

    if !options.repo.is_dir() {
        return Err(NoteError::config(format!(
            "Repository path is not a directory: {}",
            options.repo.display()
        )));
    }

    let templates = PromptTemplates::load(&config.prompts)?;

    if options.dry_run {
        return run_dry(&config, &options.repo, options.format, &output);
    }

    let out = options
        .out
        .clone()
        .ok_or_else(|| NoteError::config("--out is required unless --dry-run is given"))?;

    let client = create_client(&config.llm)?;
    info!("Using model '{}' via {}", client.model(), client.name());

    let pipeline = NotePipeline::new(config, client, templates, &options.repo, out)
        .with_force(options.force);

    let rt = Runtime::new()?;
    let summary = rt.block_on(async {
        tokio::select! {
            result = pipeline.run() => result,
            _ = tokio::signal::ctrl_c() => Err(NoteError::Interrupted),
        }
    })?;

    match options.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => print_summary(&summary, &output),
    }
    Ok(())
}

/// Scan and plan without model calls or writes
fn run_dry(config: &Config, repo: &Path, format: OutputFormat, output: &Output) -> Result<()> {
    let planner = ChunkPlanner::new(ChunkLimits::from_config(&config.chunking)?);
    let scan = FileScanner::from_config(repo, &config.scan)?.scan()?;
    let report = PlanReport::build(repo, &scan, &planner)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_plan(&report, output),
    }
    Ok(())
}

fn print_plan(report: &PlanReport, output: &Output) {
    output.header("Dry run: chunk plan");
    output.field("max files", report.max_files_per_module);
    output.field("max chars", report.max_chars_per_file);

    output.section("Modules");
    for module in &report.modules {
        output.line(&format!(
            "  {:<24} {:>5} files {:>5} chunks {:>4} sliced {:>10} chars",
            module.module, module.files, module.chunks, module.sliced_files, module.chars
        ));
        for unreadable in &module.unreadable {
            output.warning(&format!("unreadable {}", unreadable));
        }
    }

    for skipped in &report.skipped {
        output.warning(&format!("{} skipped: {}", skipped.name, skipped.reason));
    }

    output.info(&format!(
        "{} modules, {} files, {} chunks, {} model calls in a full run",
        report.modules.len(),
        report.total_files(),
        report.total_chunks(),
        report.estimated_calls()
    ));
}

fn print_summary(summary: &RunSummary, output: &Output) {
    output.header("Generation summary");
    output.field("output", summary.out.display());
    output.field("model", &summary.model);
    output.field(
        "tokens",
        format!(
            "{} in / {} out",
            summary.usage.input_tokens, summary.usage.output_tokens
        ),
    );
    output.field(
        "elapsed",
        format!(
            "{}s",
            (summary.finished_at - summary.started_at).num_seconds()
        ),
    );

    output.section("Modules");
    for report in &summary.modules {
        match &report.state {
            ModuleState::Analyzed { analysis, page } => {
                let line = format!(
                    "{:<24} {} files, {} chunks, analysis {}, page {}",
                    report.module, report.files, report.chunks, analysis, page
                );
                if report.is_degraded() {
                    output.warning(&line);
                } else {
                    output.success(&line);
                }
                for error in &report.errors {
                    output.line(&format!("    {}", error));
                }
            }
            ModuleState::Skipped { reason } => {
                output.warning(&format!("{:<24} skipped: {}", report.module, reason));
            }
        }
    }

    for error in &summary.errors {
        output.error(error);
    }

    let overview = match &summary.overview {
        Some(file) => summary.out.join(file).display().to_string(),
        None => "not written".to_string(),
    };
    output.info(&format!(
        "{} documented ({} degraded), {} skipped. Overview: {}",
        summary.analyzed(),
        summary.degraded(),
        summary.skipped(),
        overview
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_extend_defaults() {
        let mut config = Config::default();
        let options = GenerateOptions {
            max_files_per_module: Some(5),
            include: vec!["**/*.py".to_string()],
            exclude: vec!["**/vendor/**".to_string()],
            module_strategy: Some(ModuleStrategy::Anchored),
            analysis_dir: Some(PathBuf::from("/tmp/analysis")),
            ..Default::default()
        };
        apply_overrides(&mut config, &options);

        assert_eq!(config.chunking.max_files_per_module, 5);
        assert_eq!(config.chunking.max_chars_per_file, 10_000);
        assert_eq!(config.scan.include, vec!["**/*.py"]);
        assert_eq!(config.scan.exclude.len(), 5);
        assert!(config.scan.exclude.contains(&"**/node_modules/**".to_string()));
        assert_eq!(config.scan.module_strategy, ModuleStrategy::Anchored);
        assert_eq!(config.output.analysis_dir, PathBuf::from("/tmp/analysis"));
    }

    #[test]
    fn test_zero_limit_rejected_after_overrides() {
        let mut config = Config::default();
        let options = GenerateOptions {
            max_chars_per_file: Some(0),
            ..Default::default()
        };
        apply_overrides(&mut config, &options);
        assert!(config.validate().unwrap_err().is_fatal());
    }
}

//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Every section can be set from global, project, or `--config` TOML files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{chunking, concurrency, graph, llm, output, scan};
use crate::types::{NoteError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// File discovery and module partitioning
    pub scan: ScanConfig,

    /// Chunk limits for the analysis pass
    pub chunking: ChunkingConfig,

    /// Model endpoint settings
    pub llm: LlmConfig,

    /// Prompt template locations
    pub prompts: PromptConfig,

    /// Bounded parallelism
    pub concurrency: ConcurrencyConfig,

    /// Artifact and page output
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            scan: ScanConfig::default(),
            chunking: ChunkingConfig::default(),
            llm: LlmConfig::default(),
            prompts: PromptConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `NoteError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_files_per_module == 0 {
            return Err(NoteError::config(
                "max_files_per_module must be greater than 0",
            ));
        }

        if self.chunking.max_chars_per_file == 0 {
            return Err(NoteError::config("max_chars_per_file must be greater than 0"));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(NoteError::config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(NoteError::config("LLM timeout_secs must be greater than 0"));
        }

        if self.llm.max_attempts == 0 {
            return Err(NoteError::config("LLM max_attempts must be at least 1"));
        }

        if self.concurrency.modules == 0 || self.concurrency.chunks == 0 {
            return Err(NoteError::config(
                "concurrency.modules and concurrency.chunks must be greater than 0",
            ));
        }

        url::Url::parse(&self.llm.base_url).map_err(|e| {
            NoteError::config(format!("Invalid LLM base URL '{}': {}", self.llm.base_url, e))
        })?;

        for pattern in self.scan.include.iter().chain(&self.scan.exclude) {
            glob::Pattern::new(pattern)
                .map_err(|e| NoteError::config(format!("Invalid glob '{}': {}", pattern, e)))?;
        }

        Ok(())
    }
}

// =============================================================================
// Scan Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Glob patterns a file must match (empty = every supported file)
    pub include: Vec<String>,

    /// Glob patterns that reject files and prune directories
    pub exclude: Vec<String>,

    /// How relative paths map onto module names
    pub module_strategy: ModuleStrategy,

    /// Skip files ignored by `.gitignore`
    pub respect_gitignore: bool,

    /// Maximum file size in bytes
    pub max_file_size: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: scan::DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            module_strategy: ModuleStrategy::default(),
            respect_gitignore: true,
            max_file_size: scan::MAX_FILE_SIZE,
        }
    }
}

/// Module partitioning strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleStrategy {
    /// First path segment; root-level files belong to `root`
    #[default]
    TopLevel,
    /// Segment after the first `src`/`include`/`lib`/`app` directory
    Anchored,
}

impl std::fmt::Display for ModuleStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleStrategy::TopLevel => write!(f, "top-level"),
            ModuleStrategy::Anchored => write!(f, "anchored"),
        }
    }
}

impl std::str::FromStr for ModuleStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "top-level" | "toplevel" | "top_level" => Ok(ModuleStrategy::TopLevel),
            "anchored" => Ok(ModuleStrategy::Anchored),
            _ => Err(format!(
                "Unknown module strategy: {}. Valid values: top-level, anchored",
                s
            )),
        }
    }
}

// =============================================================================
// Chunking Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum files per analysis chunk
    pub max_files_per_module: usize,

    /// Maximum characters per file before it is sliced
    pub max_chars_per_file: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_files_per_module: chunking::DEFAULT_MAX_FILES_PER_MODULE,
            max_chars_per_file: chunking::DEFAULT_MAX_CHARS_PER_FILE,
        }
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Gateway base URL (`/chat/completions` is resolved from it)
    pub base_url: String,

    /// Model name
    pub model: String,

    /// API key, never serialized
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for generation
    pub temperature: f32,

    /// Attempts per call, first try included
    pub max_attempts: usize,

    /// Base backoff delay in milliseconds
    pub backoff_base_ms: u64,

    /// Maximum backoff delay in seconds
    pub backoff_max_secs: u64,

    /// System message sent with every request
    pub system_prompt: String,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .field("backoff_max_secs", &self.backoff_max_secs)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: llm::DEFAULT_BASE_URL.to_string(),
            model: llm::DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: llm::DEFAULT_TIMEOUT_SECS,
            temperature: llm::DEFAULT_TEMPERATURE,
            max_attempts: llm::DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: llm::BACKOFF_BASE_MS,
            backoff_max_secs: llm::BACKOFF_MAX_SECS,
            system_prompt: "You are a precise software documentation assistant. \
                            Follow the output format requested by the user message exactly."
                .to_string(),
        }
    }
}

// =============================================================================
// Prompt Configuration
// =============================================================================

/// Template file overrides; built-in templates are used when unset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub analysis: Option<PathBuf>,
    pub note: Option<PathBuf>,
}

// =============================================================================
// Concurrency Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Modules in flight at once
    pub modules: usize,

    /// Chunk analyses in flight per module
    pub chunks: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            modules: concurrency::DEFAULT_MODULES,
            chunks: concurrency::DEFAULT_CHUNKS,
        }
    }
}

// =============================================================================
// Output Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where per-module analysis JSON is persisted
    pub analysis_dir: PathBuf,

    /// Analysis fields read when building the overview graph
    pub edge_fields: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            analysis_dir: PathBuf::from(output::DEFAULT_ANALYSIS_DIR),
            edge_fields: graph::DEFAULT_EDGE_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

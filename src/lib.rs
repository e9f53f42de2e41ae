//! codenote - Two-Pass LLM Documentation Generator
//!
//! Turns a source repository into Markdown note pages: one page per module
//! plus a `System-Architecture.md` overview with a Mermaid module graph.
//! Summarization is delegated to an OpenAI-compatible chat-completions
//! endpoint; no syntax tree is built and no code is executed.
//!
//! ## Pipeline
//!
//! 1. **Scan**: supported files grouped into modules
//! 2. **Chunk**: module files packed into prompt-sized chunks
//! 3. **Analysis pass**: one JSON record per chunk, merged and persisted per module
//! 4. **Note pass**: one Markdown page per module, then the overview
//!
//! ## Quick Start
//!
//! ```ignore
//! use codenote::{ConfigLoader, NotePipeline, PromptTemplates, create_client};
//!
//! let config = ConfigLoader::load(None)?;
//! let client = create_client(&config.llm)?;
//! let templates = PromptTemplates::load(&config.prompts)?;
//! let summary = NotePipeline::new(config, client, templates, "repo", "notes")
//!     .run()
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: prompt templates, model client, response validation
//! - [`analyzer`]: language detection, file scanning, module partitioning
//! - [`config`]: layered configuration
//! - [`note`]: chunking, aggregation, artifacts, page synthesis, pipeline

pub mod ai;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod constants;
pub mod note;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, ModuleStrategy};

// Error Types
pub use types::error::{ErrorCategory, LlmError, NoteError, Result};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use note::{
    ChunkPlanner, ModuleAnalysis, ModuleReport, NotePipeline, PlanReport, RunSummary,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{ModelClient, ModelResponse, PromptTemplates, SharedClient, create_client};

// =============================================================================
// Analyzer Re-exports
// =============================================================================

pub use analyzer::{FileScanner, Language, ScanResult};

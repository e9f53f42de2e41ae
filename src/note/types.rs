//! Pipeline result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::ai::TokenUsage;
use crate::types::is_unknown_value;

/// Result of analyzing one chunk
#[derive(Debug, Clone)]
pub enum ChunkOutcome {
    Analyzed(Map<String, Value>),
    /// Model or parse failure; the chunk contributes nothing to the merge
    Tbd { reason: String },
}

/// Merged analysis of one module, persisted as `<analysis_dir>/<module>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleAnalysis {
    pub module: String,
    pub fingerprint: String,
    pub generated_at: DateTime<Utc>,
    pub chunk_count: usize,
    /// 0-based indexes of chunks that failed
    #[serde(default)]
    pub tbd_chunks: Vec<usize>,
    pub analysis: Map<String, Value>,
}

impl ModuleAnalysis {
    /// Every chunk contributed to the merged analysis
    pub fn is_complete(&self) -> bool {
        self.tbd_chunks.is_empty()
    }

    pub fn summary(&self) -> Option<String> {
        self.analysis
            .get("summary")
            .filter(|v| !is_unknown_value(v))
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Every chunk analyzed in this run
    Complete,
    /// Some chunks ended as TBD
    Degraded,
    /// Loaded from a matching persisted artifact
    Reused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Written from the model's Markdown
    Generated,
    /// Model or parse failure; raw analysis embedded
    Fallback,
    /// Nothing to render from; placeholder sections
    Tbd,
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisStatus::Complete => write!(f, "complete"),
            AnalysisStatus::Degraded => write!(f, "degraded"),
            AnalysisStatus::Reused => write!(f, "reused"),
        }
    }
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageStatus::Generated => write!(f, "generated"),
            PageStatus::Fallback => write!(f, "fallback"),
            PageStatus::Tbd => write!(f, "tbd"),
        }
    }
}

/// Terminal state of a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModuleState {
    Analyzed {
        analysis: AnalysisStatus,
        page: PageStatus,
    },
    Skipped {
        reason: String,
    },
}

/// Per-module line of the run summary
#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub module: String,
    /// Page file name inside the output directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_file: Option<String>,
    pub files: usize,
    pub chunks: usize,
    pub tbd_chunks: Vec<usize>,
    #[serde(flatten)]
    pub state: ModuleState,
    /// Errors absorbed while processing the module
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub usage: TokenUsage,
}

impl ModuleReport {
    pub fn skipped(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            page_file: None,
            files: 0,
            chunks: 0,
            tbd_chunks: Vec::new(),
            state: ModuleState::Skipped {
                reason: reason.into(),
            },
            errors: Vec::new(),
            usage: TokenUsage::default(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.state, ModuleState::Skipped { .. })
    }

    pub fn is_degraded(&self) -> bool {
        matches!(
            self.state,
            ModuleState::Analyzed {
                analysis: AnalysisStatus::Degraded,
                ..
            } | ModuleState::Analyzed {
                page: PageStatus::Fallback | PageStatus::Tbd,
                ..
            }
        )
    }
}

/// Outcome of a full run, persisted as `run-summary.json`
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub repo: PathBuf,
    pub out: PathBuf,
    pub model: String,
    /// Overview page file, `None` when it could not be written
    pub overview: Option<String>,
    pub modules: Vec<ModuleReport>,
    pub usage: TokenUsage,
    /// Run-level failures outside any module
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl RunSummary {
    pub fn analyzed(&self) -> usize {
        self.modules.iter().filter(|m| !m.is_skipped()).count()
    }

    pub fn skipped(&self) -> usize {
        self.modules.iter().filter(|m| m.is_skipped()).count()
    }

    pub fn degraded(&self) -> usize {
        self.modules.iter().filter(|m| m.is_degraded()).count()
    }
}

//! Note Generation
//!
//! Chunk planning, the two model passes, artifact persistence, and page
//! synthesis.
//!
//! ## Modules
//!
//! - `chunk`: packs module files into prompt-sized chunks
//! - `aggregate`: merges per-chunk analysis records
//! - `artifact`: persisted module analyses and fingerprints
//! - `synthesize`: module pages, fallback pages, and the overview
//! - `graph`: inter-module relations for the overview diagram
//! - `mermaid`: structural validation of Mermaid blocks
//! - `plan`: dry-run report
//! - `pipeline`: orchestration of one run

pub mod aggregate;
pub mod artifact;
pub mod chunk;
pub mod graph;
pub mod mermaid;
pub mod pipeline;
pub mod plan;
pub mod synthesize;
pub mod types;

pub use aggregate::merge_records;
pub use artifact::{ArtifactStore, atomic_write, fingerprint};
pub use chunk::{Chunk, ChunkLimits, ChunkPart, ChunkPlanner, SliceInfo};
pub use graph::ModuleGraph;
pub use mermaid::{MermaidIssue, MermaidValidation, MermaidValidator};
pub use pipeline::NotePipeline;
pub use plan::{ModulePlan, PlanReport};
pub use types::{
    AnalysisStatus, ChunkOutcome, ModuleAnalysis, ModuleReport, ModuleState, PageStatus,
    RunSummary,
};

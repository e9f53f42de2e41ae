//! Source Analyzer Module
//!
//! Language-agnostic discovery of documentable source files:
//! - Extension-based language detection
//! - File scanning with gitignore and glob filtering
//! - Module partitioning

pub mod language;
pub mod scanner;

pub use language::Language;
pub use scanner::{
    FileScanner, LoadedFile, LoadedModule, Module, ScanResult, SkippedModule, SourceFile,
};

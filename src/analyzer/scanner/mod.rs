pub mod file_scanner;
pub mod module;

pub use file_scanner::FileScanner;
pub use module::{
    LoadedFile, LoadedModule, Module, ScanResult, SkippedModule, SourceFile, module_for,
};

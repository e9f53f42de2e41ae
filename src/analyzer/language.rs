//! Language Detection
//!
//! Single lookup table for every language the scanner accepts. A file whose
//! extension is not in this table is never considered for documentation.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

// =============================================================================
// Language Metadata Table
// =============================================================================

struct LanguageMeta {
    /// Display name (human-readable)
    display_name: &'static str,
    /// Identifier used in fenced code blocks and prompt payloads
    highlight_str: &'static str,
    /// Lowercase extensions that map to this language
    extensions: &'static [&'static str],
}

macro_rules! lang_meta {
    ($display:literal, $highlight:literal, [$($ext:literal),*]) => {
        LanguageMeta {
            display_name: $display,
            highlight_str: $highlight,
            extensions: &[$($ext),*],
        }
    };
}

/// Languages accepted by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cpp,
    Java,
    Go,
    Python,
    Bash,
    JavaScript,
    TypeScript,
    Rust,
}

impl Language {
    const ALL: &'static [Language] = &[
        Language::C,
        Language::Cpp,
        Language::Java,
        Language::Go,
        Language::Python,
        Language::Bash,
        Language::JavaScript,
        Language::TypeScript,
        Language::Rust,
    ];

    fn meta(&self) -> LanguageMeta {
        match self {
            Language::C => lang_meta!("C", "c", ["c", "h"]),
            Language::Cpp => lang_meta!("C++", "cpp", ["cpp", "cc", "cxx", "hpp", "hh", "hxx"]),
            Language::Java => lang_meta!("Java", "java", ["java"]),
            Language::Go => lang_meta!("Go", "go", ["go"]),
            Language::Python => lang_meta!("Python", "python", ["py", "pyi"]),
            Language::Bash => lang_meta!("Bash", "bash", ["sh", "bash"]),
            Language::JavaScript => {
                lang_meta!("JavaScript", "javascript", ["js", "mjs", "cjs", "jsx"])
            }
            Language::TypeScript => lang_meta!("TypeScript", "typescript", ["ts", "tsx"]),
            Language::Rust => lang_meta!("Rust", "rust", ["rs"]),
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.meta().display_name
    }

    /// Syntax highlighting identifier (lowercase)
    pub fn highlight_str(&self) -> &'static str {
        self.meta().highlight_str
    }

    /// Detect language from a file extension, case-insensitive
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext_lower = ext.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|lang| lang.meta().extensions.contains(&ext_lower.as_str()))
    }

    /// Detect language from a file path; `None` for unsupported files
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Every accepted extension, in table order
    pub fn supported_extensions() -> impl Iterator<Item = &'static str> {
        Self::ALL
            .iter()
            .flat_map(|lang| lang.meta().extensions.iter().copied())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(Language::from_extension("rs"), Some(Language::Rust));
        assert_eq!(Language::from_extension("RS"), Some(Language::Rust));
        assert_eq!(Language::from_extension("pyi"), Some(Language::Python));
        assert_eq!(Language::from_extension("tsx"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("jsx"), Some(Language::JavaScript));
        assert_eq!(Language::from_extension("hh"), Some(Language::Cpp));
        assert_eq!(Language::from_extension("h"), Some(Language::C));
        assert_eq!(Language::from_extension("kt"), None);
        assert_eq!(Language::from_extension("md"), None);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Language::from_path("src/main.rs"), Some(Language::Rust));
        assert_eq!(Language::from_path("scripts/build.SH"), Some(Language::Bash));
        assert_eq!(Language::from_path("Makefile"), None);
        assert_eq!(Language::from_path("README.md"), None);
    }

    #[test]
    fn test_supported_extensions_complete() {
        let exts: Vec<_> = Language::supported_extensions().collect();
        for ext in [
            "c", "h", "cpp", "cc", "cxx", "hpp", "hh", "hxx", "java", "go", "py", "pyi", "sh",
            "bash", "js", "mjs", "cjs", "jsx", "ts", "tsx", "rs",
        ] {
            assert!(exts.contains(&ext), "missing extension {}", ext);
        }
        assert_eq!(exts.len(), 21);
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&Language::Cpp).unwrap();
        assert_eq!(json, "\"cpp\"");
        assert_eq!(Language::Cpp.to_string(), "C++");
    }
}

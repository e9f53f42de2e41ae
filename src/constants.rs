//! Global Constants
//!
//! Centralized defaults for configuration and tuning.

/// Chunk planning defaults
pub mod chunking {
    /// Maximum files accumulated into one analysis chunk
    pub const DEFAULT_MAX_FILES_PER_MODULE: usize = 40;

    /// Maximum characters of one file (or file slice) per chunk
    pub const DEFAULT_MAX_CHARS_PER_FILE: usize = 10_000;
}

/// Scanner defaults
pub mod scan {
    /// Files larger than this are skipped (5MB)
    pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

    /// Excludes applied unless the config replaces them
    pub const DEFAULT_EXCLUDES: &[&str] = &[
        "**/.git/**",
        "**/target/**",
        "**/build/**",
        "**/node_modules/**",
    ];

    /// Module name for files directly under the repository root
    pub const ROOT_MODULE: &str = "root";

    /// Directory names that anchor module detection in the `anchored` strategy
    pub const MODULE_ANCHORS: &[&str] = &["src", "include", "lib", "app"];
}

/// Model endpoint defaults
pub mod llm {
    pub const DEFAULT_BASE_URL: &str = "https://litellm.com/v1";

    pub const DEFAULT_MODEL: &str = "ollama-gemini-3-flash-preview";

    pub const DEFAULT_TEMPERATURE: f32 = 0.1;

    /// Request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;

    /// Attempts per model call, first try included
    pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BACKOFF_BASE_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const BACKOFF_MAX_SECS: u64 = 30;

    /// Gateway environment variables
    pub const ENV_BASE_URL: &str = "LITELLM_BASE_URL";
    pub const ENV_API_KEY: &str = "LITELLM_API_KEY";
    pub const ENV_MODEL: &str = "LITELLM_MODEL";
}

/// Concurrency defaults
pub mod concurrency {
    /// Modules processed at the same time
    pub const DEFAULT_MODULES: usize = 2;

    /// Chunks of one module analyzed at the same time
    pub const DEFAULT_CHUNKS: usize = 4;
}

/// Output layout
pub mod output {
    /// Overview page file name
    pub const OVERVIEW_PAGE: &str = "System-Architecture.md";

    /// Project data directory
    pub const PROJECT_DIR: &str = ".codenote";

    /// Default analysis artifact directory (relative to the working directory)
    pub const DEFAULT_ANALYSIS_DIR: &str = ".codenote/analysis";

    /// Run summary file inside the analysis directory
    pub const RUN_SUMMARY_FILE: &str = "run-summary.json";
}

/// Overview graph defaults
pub mod graph {
    /// Analysis fields scanned for inter-module relations
    pub const DEFAULT_EDGE_FIELDS: &[&str] =
        &["dependencies", "calls", "depends_on", "imports", "uses"];
}

//! Unified Error Type System
//!
//! Centralized error types for the whole generator. Errors are split by the
//! level at which they are absorbed:
//!
//! - **Configuration**: fatal, aborts the run before any module work
//! - **Module level**: `NoMatchingFiles`, `OversizedFiles`, `NoReadableFiles`,
//!   `TemplateBinding` (module skipped or
//!   page degraded, run continues)
//! - **Chunk level**: model call failures and unparseable responses (content
//!   degrades to `TBD`, run continues)
//!
//! Model call failures carry an [`ErrorCategory`] so the retry layer can tell
//! transient failures from permanent ones.

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories for model call routing and retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry
    RateLimit,
    /// Context/token limit exceeded - retrying the same prompt won't help
    TokenLimit,
    /// Authentication failed - fail fast, don't retry
    Auth,
    /// Network/connectivity issues - retry with backoff
    Network,
    /// Endpoint or model not found
    Unavailable,
    /// Invalid request - don't retry
    BadRequest,
    /// Temporary server issues - retry
    Transient,
    /// Unknown error
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::TokenLimit => write!(f, "TOKEN_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Check if a failed call in this category is worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Network | Self::Transient)
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Model call error with category, endpoint context, and retry hints
#[derive(Debug, Clone)]
pub struct LlmError {
    pub category: ErrorCategory,
    pub message: String,
    /// Endpoint URL the request went to
    pub endpoint: Option<String>,
    /// Suggested wait before retrying (from `Retry-After`)
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.endpoint {
            Some(endpoint) => write!(f, "[{}] {} (url={})", self.category, self.message, endpoint),
            None => write!(f, "[{}] {}", self.category, self.message),
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            endpoint: None,
            retry_after: None,
        }
    }

    /// Attach the endpoint URL
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Add suggested retry delay
    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps transport failures and HTTP statuses onto [`ErrorCategory`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an HTTP status code returned by the endpoint
    pub fn classify_http_status(status: u16, message: &str) -> LlmError {
        match status {
            429 => LlmError::new(ErrorCategory::RateLimit, message),
            401 | 403 => LlmError::new(
                ErrorCategory::Auth,
                format!(
                    "{}. Check LITELLM_BASE_URL and LITELLM_API_KEY; for OpenAI-compatible gateways, \
                     use a base URL like https://host/v1 or https://host/openai",
                    message
                ),
            ),
            400 | 422 => {
                let lower = message.to_lowercase();
                if lower.contains("context length")
                    || lower.contains("maximum context")
                    || lower.contains("too many tokens")
                {
                    LlmError::new(ErrorCategory::TokenLimit, message)
                } else {
                    LlmError::new(ErrorCategory::BadRequest, message)
                }
            }
            404 => LlmError::new(ErrorCategory::Unavailable, message),
            408 | 500 | 502 | 503 | 504 => LlmError::new(ErrorCategory::Transient, message),
            _ => LlmError::new(ErrorCategory::Unknown, message),
        }
    }

    /// Classify a transport-level failure (no HTTP status available)
    pub fn classify_transport(err: &reqwest::Error) -> LlmError {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            LlmError::new(ErrorCategory::Network, err.to_string())
        } else if err.is_decode() || err.is_body() {
            LlmError::new(ErrorCategory::Transient, err.to_string())
        } else {
            LlmError::new(ErrorCategory::Unknown, err.to_string())
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum NoteError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Configuration (fatal)
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Module level (absorbed)
    // -------------------------------------------------------------------------
    #[error("No matching files for module '{module}' after include/exclude filtering")]
    NoMatchingFiles { module: String },

    #[error("No file of module '{module}' within the {limit} byte size limit")]
    OversizedFiles { module: String, limit: u64 },

    #[error("No readable files in module '{module}'")]
    NoReadableFiles { module: String },

    #[error("Template '{template}' has no binding for placeholder '{placeholder}'")]
    TemplateBinding {
        template: String,
        placeholder: String,
    },

    // -------------------------------------------------------------------------
    // Chunk level (absorbed)
    // -------------------------------------------------------------------------
    #[error("Model call failed: {0}")]
    Llm(LlmError),

    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Interrupted")]
    Interrupted,
}

impl From<LlmError> for NoteError {
    fn from(err: LlmError) -> Self {
        NoteError::Llm(err)
    }
}

pub type Result<T> = std::result::Result<T, NoteError>;

impl NoteError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn template_binding(template: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self::TemplateBinding {
            template: template.into(),
            placeholder: placeholder.into(),
        }
    }

    /// Configuration errors are the only ones that reach the exit code
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if a model call that produced this error may be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_retryable(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

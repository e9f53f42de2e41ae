//! Model Client Abstraction
//!
//! Defines the `ModelClient` trait used by both generation passes. A client
//! takes a fully rendered prompt and returns the raw completion text; parsing
//! is left to the caller.
//!
//! ## Modules
//!
//! - `openai`: OpenAI-compatible chat-completions client (LiteLLM gateways)
//! - `retry`: backoff wrapper retrying transient failures

mod openai;
mod retry;

pub use openai::{ChatCompletionsClient, resolve_chat_completions_url};
pub use retry::{RetryPolicy, RetryingClient, with_timeout};

pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::types::Result;

// =============================================================================
// Model Response
// =============================================================================

#[derive(Debug, Clone)]
pub struct ModelResponse {
    /// Completion text as returned by the endpoint
    pub content: String,
    pub usage: TokenUsage,
    pub timing: ResponseTiming,
    pub metadata: ResponseMetadata,
}

impl ModelResponse {
    /// Create response with content only (usage unknown)
    pub fn content_only(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: TokenUsage::default(),
            timing: ResponseTiming::default(),
            metadata: ResponseMetadata::default(),
        }
    }
}

/// Token usage reported by the endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResponseTiming {
    /// Wall clock time in milliseconds
    pub total_ms: u64,
}

impl ResponseTiming {
    pub fn from_duration(duration: std::time::Duration) -> Self {
        Self {
            total_ms: duration.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    pub model: String,
    pub provider: String,
}

// =============================================================================
// Model Client Trait
// =============================================================================

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Submit one rendered prompt and return the completion text
    async fn complete(&self, prompt: &str) -> Result<ModelResponse>;

    /// Client name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;
}

/// Shared client for concurrent module and chunk tasks
pub type SharedClient = Arc<dyn ModelClient>;

/// Build the chat-completions client wrapped in the retry policy
pub fn create_client(config: &LlmConfig) -> Result<SharedClient> {
    let client = ChatCompletionsClient::new(config)?;
    Ok(Arc::new(RetryingClient::new(
        client,
        RetryPolicy::from_config(config),
    )))
}

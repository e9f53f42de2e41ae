//! Model Integration Layer
//!
//! Prompt templates, the chat-completions client, and response validation.

pub mod prompt;
pub mod provider;
pub mod validation;

pub use prompt::{PromptTemplate, PromptTemplates};
pub use provider::{
    ChatCompletionsClient, ModelClient, ModelResponse, RetryPolicy, RetryingClient, SharedClient,
    TokenUsage, create_client,
};
pub use validation::{clean_markdown, parse_json_object};

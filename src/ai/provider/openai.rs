//! OpenAI-Compatible Chat Completions Client
//!
//! Talks to any endpoint speaking the OpenAI chat-completions protocol,
//! typically a LiteLLM gateway.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

use super::{ModelClient, ModelResponse, ResponseMetadata, ResponseTiming, TokenUsage};
use crate::config::LlmConfig;
use crate::constants::llm as llm_constants;
use crate::types::{ErrorCategory, ErrorClassifier, LlmError, NoteError, Result};

/// Resolve the chat-completions URL from a gateway base URL
///
/// - ends with `/chat/completions`: used as is
/// - ends with `/v1`: `/chat/completions` appended
/// - anything else: `/v1/chat/completions` appended
pub fn resolve_chat_completions_url(base_url: &str) -> Result<String> {
    let trimmed = base_url.trim().trim_end_matches('/');
    Url::parse(trimmed)
        .map_err(|e| NoteError::config(format!("Invalid LLM base URL '{}': {}", base_url, e)))?;

    let resolved = if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else if trimmed.ends_with("/v1") {
        format!("{}/chat/completions", trimmed)
    } else {
        format!("{}/v1/chat/completions", trimmed)
    };
    Ok(resolved)
}

pub struct ChatCompletionsClient {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    endpoint: String,
    model: String,
    temperature: f32,
    system_prompt: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl ChatCompletionsClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                NoteError::config(format!(
                    "API key not found. Set {} or llm.api_key",
                    llm_constants::ENV_API_KEY
                ))
            })?;

        let endpoint = resolve_chat_completions_url(&config.base_url)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(llm_constants::CONNECTION_TIMEOUT_SECS))
            .user_agent(concat!("codenote/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NoteError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            endpoint,
            model: config.model.clone(),
            temperature: config.temperature,
            system_prompt: config.system_prompt.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl ModelClient for ChatCompletionsClient {
    async fn complete(&self, prompt: &str) -> Result<ModelResponse> {
        debug!(
            "Requesting completion (model: {}, prompt: {} chars)",
            self.model,
            prompt.chars().count()
        );

        let start_time = Instant::now();
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e).endpoint(&self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let body = response.text().await.unwrap_or_default();
            let message = format!("HTTP {}: {}", status.as_u16(), body.trim());
            let mut err = ErrorClassifier::classify_http_status(status.as_u16(), &message)
                .endpoint(&self.endpoint);
            if let Some(delay) = retry_after {
                err = err.retry_after(delay);
            }
            return Err(err.into());
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e).endpoint(&self.endpoint))?;

        let usage = body
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                LlmError::new(ErrorCategory::Transient, "No content in completion response")
                    .endpoint(&self.endpoint)
            })?;

        Ok(ModelResponse {
            content,
            usage,
            timing: ResponseTiming::from_duration(start_time.elapsed()),
            metadata: ResponseMetadata {
                model: self.model.clone(),
                provider: self.name().to_string(),
            },
        })
    }

    fn name(&self) -> &str {
        "chat-completions"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_chat_completions_url() {
        assert_eq!(
            resolve_chat_completions_url("https://litellm.com/v1").unwrap(),
            "https://litellm.com/v1/chat/completions"
        );
        assert_eq!(
            resolve_chat_completions_url("https://gw.example/v1/").unwrap(),
            "https://gw.example/v1/chat/completions"
        );
        assert_eq!(
            resolve_chat_completions_url("https://gw.example/openai/chat/completions").unwrap(),
            "https://gw.example/openai/chat/completions"
        );
        assert_eq!(
            resolve_chat_completions_url("http://localhost:4000").unwrap(),
            "http://localhost:4000/v1/chat/completions"
        );
        assert!(resolve_chat_completions_url("not a url").is_err());
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = LlmConfig::default();
        let err = ChatCompletionsClient::new(&config).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_request_shape_and_redacted_debug() {
        let config = LlmConfig {
            api_key: Some("sk-test".to_string()),
            ..LlmConfig::default()
        };
        let client = ChatCompletionsClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "https://litellm.com/v1/chat/completions");

        let request = serde_json::to_value(client.build_request("hello")).unwrap();
        assert_eq!(request["messages"][0]["role"], "system");
        assert_eq!(request["messages"][1]["content"], "hello");
        assert_eq!(request["model"], config.model);

        let debug = format!("{:?}", client);
        assert!(!debug.contains("sk-test"));
    }

    #[test]
    fn test_response_parsing() {
        let body: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"{}"}}],"usage":{"prompt_tokens":12,"completion_tokens":3}}"#,
        )
        .unwrap();
        assert_eq!(body.choices[0].message.content.as_deref(), Some("{}"));
        assert_eq!(body.usage.unwrap().prompt_tokens, 12);
    }
}

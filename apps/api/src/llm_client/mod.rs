//! LLM Client: the generation-service boundary for the returns pipeline.
//!
//! ARCHITECTURAL RULE: pipeline code only sees `TextGenerator`. The Anthropic
//! Messages API is reached exclusively through `LlmClient` in this module.
//!
//! One HTTP attempt per call; the configured timeout is the only guard.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;
#[cfg(test)]
pub mod scripted;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Default model when `RETURNS_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generation request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Generation hit the {max_tokens}-token limit; output is incomplete")]
    Truncated { max_tokens: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One role-tagged text segment of a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// The opaque text-generation capability. Swap implementations (live model,
/// scripted stub) without touching the pipeline.
///
/// Carried in `AppState` behind the pipeline as `Arc<dyn TextGenerator>`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    /// Model identifier, for logs and run metadata.
    fn model_name(&self) -> &str;
}

/// Process-wide generation settings, read once at startup.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1024,
            temperature: 0.0,
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Concatenated text of all text blocks, or `None` when there is no non-blank text.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }

    /// Generation stopped at `max_tokens` rather than finishing its answer.
    pub fn hit_token_limit(&self) -> bool {
        self.stop_reason.as_deref() == Some("max_tokens")
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Anthropic Messages API client implementing `TextGenerator`.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    config: GeneratorConfig,
}

impl LlmClient {
    pub fn new(api_key: String, config: GeneratorConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    /// Makes a single call to the Messages API, returning the full response object.
    pub async fn call(&self, messages: &[ChatMessage]) -> Result<LlmResponse, LlmError> {
        let request_body = build_request(&self.config, messages);

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let llm_response: LlmResponse = serde_json::from_str(&body)?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        Ok(llm_response)
    }

    fn classify(&self, error: reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout {
                secs: self.config.timeout.as_secs(),
            }
        } else {
            LlmError::Http(error)
        }
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let response = self.call(messages).await?;
        if response.hit_token_limit() {
            return Err(LlmError::Truncated {
                max_tokens: self.config.max_tokens,
            });
        }
        response.text().ok_or(LlmError::EmptyContent)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// System segments go to the top-level `system` field; the rest become user turns.
fn build_request<'a>(
    config: &'a GeneratorConfig,
    messages: &'a [ChatMessage],
) -> AnthropicRequest<'a> {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    AnthropicRequest {
        model: &config.model,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        system: (!system.is_empty()).then(|| system.join("\n\n")),
        messages: messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| AnthropicMessage {
                role: "user",
                content: &m.content,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_splits_system_from_user() {
        let config = GeneratorConfig::default();
        let messages = vec![
            ChatMessage::system("Be precise."),
            ChatMessage::user("Email: hello"),
        ];
        let request = build_request(&config, &messages);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["system"], "Be precise.");
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Email: hello");
    }

    #[test]
    fn test_build_request_without_system_omits_field() {
        let config = GeneratorConfig::default();
        let messages = vec![ChatMessage::user("hi")];
        let json = serde_json::to_value(build_request(&config, &messages)).unwrap();
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_response_text_joins_text_blocks() {
        let json = r#"{
            "content": [
                {"type": "text", "text": "Dear Marcos, "},
                {"type": "tool_use"},
                {"type": "text", "text": "thank you."}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 4}
        }"#;
        let response: LlmResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text().as_deref(), Some("Dear Marcos, thank you."));
    }

    #[test]
    fn test_response_with_blank_text_is_none() {
        let json = r#"{
            "content": [{"type": "text", "text": "  \n"}],
            "usage": {"input_tokens": 10, "output_tokens": 1}
        }"#;
        let response: LlmResponse = serde_json::from_str(json).unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_response_stopped_at_token_limit() {
        let json = r#"{
            "content": [{"type": "text", "text": "{\"email_name\": \"Ana"}],
            "stop_reason": "max_tokens",
            "usage": {"input_tokens": 10, "output_tokens": 1024}
        }"#;
        let response: LlmResponse = serde_json::from_str(json).unwrap();
        assert!(response.hit_token_limit());
    }

    #[test]
    fn test_response_finished_normally() {
        let json = r#"{
            "content": [{"type": "text", "text": "Done."}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 2}
        }"#;
        let response: LlmResponse = serde_json::from_str(json).unwrap();
        assert!(!response.hit_token_limit());
    }

    #[test]
    fn test_client_reports_configured_model() {
        let config = GeneratorConfig {
            model: "claude-haiku-4-5".to_string(),
            ..GeneratorConfig::default()
        };
        let client = LlmClient::new("test-key".to_string(), config).unwrap();
        assert_eq!(client.model_name(), "claude-haiku-4-5");
    }
}

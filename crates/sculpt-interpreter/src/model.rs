//! Language-model seam
//!
//! `LanguageModel` hides the chat service behind one call so the interpreter
//! can be driven by a scripted model in tests. `OpenAiChatModel` talks to any
//! OpenAI-compatible chat-completions endpoint.

use crate::error::{truncate_body, InterpreterError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default chat endpoint base
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
/// Default model name
pub const DEFAULT_MODEL: &str = "o4-mini";

/// One request to the model: instruction plus user text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// System instruction
    pub system: String,
    /// User command
    pub user: String,
}

/// Chat service abstraction
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send a request and return the raw message content
    async fn complete(&self, request: &ChatRequest) -> Result<String, InterpreterError>;

    /// Model identifier for logs
    fn model_name(&self) -> String;
}

/// Interpreter section of the configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Base URL of the chat-completions API
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Objects embedded in the prompt snapshot
    pub max_snapshot_objects: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: 60,
            max_snapshot_objects: 200,
        }
    }
}

impl InterpreterConfig {
    /// Set endpoint
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set model
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set API key
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set snapshot bound
    #[inline]
    #[must_use]
    pub fn with_max_snapshot_objects(mut self, max: usize) -> Self {
        self.max_snapshot_objects = max;
        self
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl OpenAiChatModel {
    /// Create a client from configuration
    ///
    /// # Errors
    /// - `InterpreterError::Unreachable` if the HTTP client cannot be built
    pub fn new(config: &InterpreterConfig) -> Result<Self, InterpreterError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InterpreterError::Unreachable(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }

    fn transport_error(&self, e: &reqwest::Error) -> InterpreterError {
        if e.is_timeout() {
            InterpreterError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            InterpreterError::Unreachable(e.to_string())
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn complete(&self, request: &ChatRequest) -> Result<String, InterpreterError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
        };

        let mut builder = self.client.post(self.url()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder.send().await.map_err(|e| self.transport_error(&e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(InterpreterError::Service {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        let parsed: CompletionResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(&e)
            } else {
                InterpreterError::Malformed(e.to_string())
            }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(InterpreterError::EmptyResponse)
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = InterpreterConfig::default()
            .with_endpoint("http://localhost:8080/v1/")
            .with_model("local")
            .with_timeout_secs(5);
        let model = OpenAiChatModel::new(&config).unwrap();
        assert_eq!(model.url(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(model.model_name(), "local");
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: InterpreterConfig = serde_json::from_str(r#"{"model": "gpt-4o"}"#).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.max_snapshot_objects, 200);
    }

    #[test]
    fn request_body_shape() {
        let body = CompletionRequest {
            model: "m",
            messages: [
                Message {
                    role: "system",
                    content: "s",
                },
                Message {
                    role: "user",
                    content: "u",
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][1]["content"], "u");
    }

    #[test]
    fn response_content_extraction() {
        let parsed: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":"{\"action\":\"list\"}"}}]}"#)
                .unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some(r#"{"action":"list"}"#)
        );
    }
}

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::providers::Provider;

/// Client for OpenAI-compatible `/chat/completions` endpoints
pub struct ChatCompletions {
    /// HTTP client for API requests
    client: Client,
    /// API key sent as a bearer token
    api_key: String,
    /// Base URL, e.g. `https://api.siliconflow.cn/v1`
    endpoint: String,
    /// Request timeout, kept for error reporting
    timeout_secs: u64,
}

/// Chat completion request
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// The model to use
    pub model: String,

    /// The messages for the conversation
    pub messages: Vec<ChatMessage>,

    /// Streaming is never used; the whole completion is read at once
    pub stream: bool,

    /// Temperature for generation
    pub temperature: f32,
}

/// Chat message format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
pub struct TokenUsage {
    /// Number of prompt tokens
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Number of completion tokens
    #[serde(default)]
    pub completion_tokens: u64,
}

/// Chat completion response
///
/// Every field is optional so that a structurally unexpected body still
/// decodes, and the missing piece is reported by `extract_text`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    /// Completion choices, the first one carries the answer
    #[serde(default)]
    pub choices: Vec<ChatChoice>,

    /// Token usage information
    #[serde(default)]
    pub usage: Option<TokenUsage>,

    /// Raw body as received, kept for diagnostics
    #[serde(skip)]
    pub raw: String,
}

/// Individual choice in a chat completion response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatChoice {
    /// The generated message
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

/// Message inside a choice
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChoiceMessage {
    /// Role of the author
    #[serde(default)]
    pub role: Option<String>,

    /// Generated content
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatRequest {
    /// Create a new non-streaming chat request
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            stream: false,
            temperature: 0.1,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Content of the last user message, if any
    pub fn user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
    }
}

impl ChatResponse {
    /// Decode a response body, keeping the raw text around
    pub fn from_body(body: &str) -> Result<Self, ProviderError> {
        let mut response: ChatResponse = serde_json::from_str(body)
            .map_err(|e| ProviderError::parse(e.to_string(), body))?;
        response.raw = body.to_string();
        Ok(response)
    }

    /// Build a response carrying a single assistant message
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChatChoice {
                message: Some(ChoiceMessage {
                    role: Some("assistant".to_string()),
                    content: Some(content.into()),
                }),
            }],
            usage: None,
            raw: String::new(),
        }
    }
}

impl ChatCompletions {
    /// Create a new chat-completion client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            timeout_secs,
        })
    }

    /// Full URL of the completions resource
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }

    fn transport_error(&self, error: reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout(self.timeout_secs)
        } else if error.is_connect() {
            ProviderError::ConnectionError(error.to_string())
        } else {
            ProviderError::RequestFailed(error.to_string())
        }
    }
}

impl fmt::Debug for ChatCompletions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletions")
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Provider for ChatCompletions {
    type Request = ChatRequest;
    type Response = ChatResponse;

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = self.completions_url();
        debug!("POST {} (model {})", url, request.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            error!("Chat completion API error ({}): {}", status, body);
            return Err(status_error(status, &body));
        }

        ChatResponse::from_body(&body)
    }

    fn extract_text(response: &ChatResponse) -> Result<String, ProviderError> {
        response
            .choices
            .first()
            .and_then(|choice| choice.message.as_ref())
            .and_then(|message| message.content.clone())
            .ok_or_else(|| {
                ProviderError::parse("missing choices[0].message.content", response.raw.clone())
            })
    }
}

/// Map a non-2xx status to a typed provider error
fn status_error(status: StatusCode, body: &str) -> ProviderError {
    let message = api_error_message(body).unwrap_or_else(|| body.to_string());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(message),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(message),
        _ => ProviderError::ApiError {
            status_code: status.as_u16(),
            message,
        },
    }
}

/// Pull the human readable message out of an API error body
fn api_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|e| e.get("message").or(Some(e)))
        .or_else(|| value.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

/*!
 * Mock provider implementations for testing.
 *
 * This module provides a chat-completion provider that never touches the network:
 * - `MockProvider::echo()` - Returns the user message unchanged (identity translation)
 * - `MockProvider::intermittent(n)` - Fails every n-th request
 * - `MockProvider::fail_at(n)` - Fails only the n-th request
 * - `MockProvider::malformed()` - Answers with a body that has no choices
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::errors::ProviderError;
use crate::providers::chat::{ChatCompletions, ChatRequest, ChatResponse};
use crate::providers::Provider;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Returns the user text unchanged
    Echo,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Fails only the given 1-based request
    FailAt { request: usize },
    /// Returns a body without any choice
    Malformed,
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Last request seen, shared between clones
    last_request: Arc<Mutex<Option<ChatRequest>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&str) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
            custom_response: None,
        }
    }

    /// Create a mock that returns its input unchanged
    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a mock failing only on the given 1-based request
    pub fn fail_at(request: usize) -> Self {
        Self::new(MockBehavior::FailAt { request })
    }

    /// Create a mock that answers with a body lacking choices
    pub fn malformed() -> Self {
        Self::new(MockBehavior::Malformed)
    }

    /// Set a custom response generator, applied to the user text
    pub fn with_custom_response(mut self, generator: fn(&str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests that reached this provider (and its clones)
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Last request received, if any
    pub fn last_request(&self) -> Option<ChatRequest> {
        self.last_request.lock().ok().and_then(|guard| guard.clone())
    }

    fn answer(&self, text: &str) -> ChatResponse {
        let content = match self.custom_response {
            Some(generator) => generator(text),
            None => text.to_string(),
        };
        ChatResponse::with_content(content)
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            last_request: Arc::clone(&self.last_request),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = ChatRequest;
    type Response = ChatResponse;

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;
        let text = request.user_content().unwrap_or_default().to_string();
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request);
        }

        match self.behavior {
            MockBehavior::Echo => Ok(self.answer(&text)),

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == 0 {
                    Err(ProviderError::ApiError {
                        status_code: 503,
                        message: format!("Simulated intermittent failure (request #{})", count),
                    })
                } else {
                    Ok(self.answer(&text))
                }
            }

            MockBehavior::FailAt { request } => {
                if count == request {
                    Err(ProviderError::ConnectionError(format!(
                        "Simulated connection reset (request #{})",
                        count
                    )))
                } else {
                    Ok(self.answer(&text))
                }
            }

            MockBehavior::Malformed => ChatResponse::from_body(r#"{"object":"chat.completion"}"#),
        }
    }

    fn extract_text(response: &ChatResponse) -> Result<String, ProviderError> {
        ChatCompletions::extract_text(response)
    }
}

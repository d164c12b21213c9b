/*!
 * Provider implementations for chat-completion translation backends.
 *
 * This module contains the low-level clients the translators are built on:
 * - `chat`: OpenAI-compatible chat-completion HTTP client (SiliconFlow,
 *   OpenAI, DeepSeek, LM Studio)
 * - `mock`: In-process provider used by tests and benchmarks
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the translators.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<Self::Response, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Extract text from the provider response
    ///
    /// Fails with `ProviderError::ParseError` when the response carries no usable text.
    fn extract_text(response: &Self::Response) -> Result<String, ProviderError>;
}

pub mod chat;
pub mod mock;

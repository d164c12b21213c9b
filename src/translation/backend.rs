/*!
 * Chat-completion backend adapter.
 *
 * Wraps any chat-completion `Provider` behind the `Translator` port: a fixed
 * system instruction, the paragraph as the user message, streaming off and a
 * low temperature for literal output.
 */

use async_trait::async_trait;
use log::debug;
use url::Url;

use crate::errors::TranslationError;
use crate::language_utils::prompt_language_name;
use crate::providers::Provider;
use crate::providers::chat::{ChatCompletions, ChatRequest, ChatResponse};
use super::port::{TranslationResult, Translator};

/// Default system instruction.
/// Placeholders: {source_language}, {target_language}
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional translation engine. \
Translate the {source_language} paragraph provided by the user into {target_language} accurately. \
Return only the translation, without any explanations, labels, or text unrelated to the translation.";

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Keys that were shipped as "fill me in" examples and must never be sent
const PLACEHOLDER_KEYS: &[&str] = &["sk-xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx", "your-api-key"];

/// Reject empty or placeholder credentials before any network activity
pub fn ensure_credential(credential: &str) -> Result<(), TranslationError> {
    let credential = credential.trim();
    if credential.is_empty() {
        return Err(TranslationError::Configuration("API key must not be empty".to_string()));
    }
    if PLACEHOLDER_KEYS.contains(&credential) {
        return Err(TranslationError::Configuration(
            "API key is still the placeholder value, please provide a real key".to_string(),
        ));
    }
    Ok(())
}

/// Resolved settings for one chat backend
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    /// Backend identifier, used in logs
    pub name: String,
    /// Model name
    pub model: String,
    /// Base URL of the OpenAI-compatible API
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Sampling temperature
    pub temperature: f32,
    /// System instruction template
    pub system_prompt: String,
}

/// Translator backed by a chat-completion provider
#[derive(Debug)]
pub struct ChatTranslator<P> {
    provider: P,
    settings: BackendSettings,
}

impl ChatTranslator<ChatCompletions> {
    /// Build a translator talking HTTP to the configured endpoint
    pub fn connect(credential: &str, settings: BackendSettings) -> Result<Self, TranslationError> {
        ensure_credential(credential)?;
        Url::parse(&settings.endpoint).map_err(|e| {
            TranslationError::Configuration(format!("Invalid endpoint '{}': {}", settings.endpoint, e))
        })?;

        let client = ChatCompletions::new(credential.trim(), &settings.endpoint, settings.timeout_secs)?;
        Ok(Self {
            provider: client,
            settings,
        })
    }
}

impl<P> ChatTranslator<P>
where
    P: Provider<Request = ChatRequest, Response = ChatResponse>,
{
    /// Build a translator on top of an existing provider
    pub fn with_provider(
        credential: &str,
        provider: P,
        settings: BackendSettings,
    ) -> Result<Self, TranslationError> {
        ensure_credential(credential)?;
        Ok(Self { provider, settings })
    }

    /// The underlying provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Settings in use
    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    /// Render the system instruction for a language pair
    pub fn system_instruction(&self, source_language: &str, target_language: &str) -> String {
        self.settings
            .system_prompt
            .replace("{source_language}", &prompt_language_name(source_language))
            .replace("{target_language}", &prompt_language_name(target_language))
    }
}

#[async_trait]
impl<P> Translator for ChatTranslator<P>
where
    P: Provider<Request = ChatRequest, Response = ChatResponse>,
{
    fn name(&self) -> &str {
        &self.settings.name
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> TranslationResult {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let request = ChatRequest::new(&self.settings.model)
            .add_message("system", self.system_instruction(source_language, target_language))
            .add_message("user", text)
            .temperature(self.settings.temperature);

        let response = self.provider.complete(request).await?;
        let content = P::extract_text(&response)?;
        debug!("{}: {} chars -> {} chars", self.settings.name, text.chars().count(), content.chars().count());

        Ok(content.trim().to_string())
    }
}

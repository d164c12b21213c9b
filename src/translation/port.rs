/*!
 * The translation port: what the document pipeline needs from a backend.
 */

use async_trait::async_trait;

use crate::errors::ProviderError;

/// Default source language for jobs
pub const DEFAULT_SOURCE_LANGUAGE: &str = "en";

/// Default target language for jobs
pub const DEFAULT_TARGET_LANGUAGE: &str = "zh";

/// Outcome of translating one piece of text
pub type TranslationResult = Result<String, ProviderError>;

/// Translate text from one language to another, independent of the backend.
///
/// Implementations must return `""` for empty or whitespace-only input without
/// contacting the backend.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Backend identifier, used in logs
    fn name(&self) -> &str;

    /// Translate `text` from `source_language` to `target_language`
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> TranslationResult;
}

#[async_trait]
impl<T: Translator + ?Sized> Translator for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> TranslationResult {
        (**self).translate(text, source_language, target_language).await
    }
}

/// A single piece of text to translate
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    /// Text to translate, may be empty
    pub text: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
}

impl TranslationRequest {
    /// Create a request using the default language pair (en -> zh)
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_language: DEFAULT_SOURCE_LANGUAGE.to_string(),
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
        }
    }

    /// Set the language pair
    pub fn languages(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_language = source.into();
        self.target_language = target.into();
        self
    }

    /// Send this request through a translator
    pub async fn send<T: Translator + ?Sized>(&self, translator: &T) -> TranslationResult {
        translator
            .translate(&self.text, &self.source_language, &self.target_language)
            .await
    }
}

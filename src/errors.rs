/*!
 * Error types for the yadtwai application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when working with translation backend APIs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {message} - response body: {body}")]
    ParseError {
        /// What went wrong while decoding
        message: String,
        /// Raw response body, or a placeholder when none was received
        body: String,
    },

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Build a parse error, keeping the raw body for diagnostics
    pub fn parse(message: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        Self::ParseError {
            message: message.into(),
            body: if body.is_empty() { "<empty>".to_string() } else { body },
        }
    }
}

/// Errors that can occur while setting up or running a translation backend
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Missing or unusable configuration, raised before any network activity
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested backend identifier is not registered
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Errors raised by the document store
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The input document could not be opened or parsed
    #[error("Failed to load document {path}: {message}")]
    Load {
        /// Path of the document
        path: PathBuf,
        /// Description of the failure
        message: String,
    },

    /// The output document could not be written
    #[error("Failed to save document {path}: {message}")]
    Save {
        /// Path of the document
        path: PathBuf,
        /// Description of the failure
        message: String,
    },

    /// The document markup is not well-formed
    #[error("Malformed document markup: {0}")]
    Malformed(String),
}

/// Errors that terminate a translation job
#[derive(Error, Debug)]
pub enum JobError {
    /// Loading the input document failed
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// A paragraph failed and the job was configured to abort on failures
    #[error("Paragraph {index} could not be translated: {source}")]
    Paragraph {
        /// 1-based index among translatable paragraphs
        index: usize,
        /// Underlying provider error
        source: ProviderError,
    },

    /// The job was cancelled between paragraphs
    #[error("Translation cancelled after {completed} of {total} paragraphs")]
    Cancelled {
        /// Paragraphs finished before cancellation
        completed: usize,
        /// Paragraphs in the job
        total: usize,
    },

    /// The background task ended abnormally
    #[error("Translation task aborted: {0}")]
    Aborted(String),
}

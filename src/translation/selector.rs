/*!
 * Backend selector: the single place where backend identifiers are mapped to
 * translator constructors.
 *
 * Adding a backend means adding one `BackendSpec` to `BACKENDS`; the document
 * pipeline and the task runner only ever see `Box<dyn Translator>`.
 */

use log::debug;

use crate::errors::TranslationError;
use super::backend::{
    BackendSettings, ChatTranslator, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS,
};
use super::port::Translator;

/// Identifier of the default backend
pub const DEFAULT_BACKEND: &str = "silicon_flow";

/// Builds a translator from a credential and resolved settings
pub type BackendConstructor = fn(&str, BackendSettings) -> Result<Box<dyn Translator>, TranslationError>;

/// A registered backend
#[derive(Debug, Clone, Copy)]
pub struct BackendSpec {
    /// Identifier used on the command line and in the config file
    pub id: &'static str,
    /// Human readable name
    pub display_name: &'static str,
    /// Default API base URL
    pub default_endpoint: &'static str,
    /// Default model
    pub default_model: &'static str,
    /// Whether an API key is mandatory
    pub requires_credential: bool,
    /// Constructor
    pub constructor: BackendConstructor,
}

/// Optional overrides applied on top of a backend's defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendOptions {
    /// Model name
    pub model: Option<String>,
    /// API base URL
    pub endpoint: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// System instruction template
    pub system_prompt: Option<String>,
}

const BACKENDS: &[BackendSpec] = &[
    BackendSpec {
        id: "silicon_flow",
        display_name: "SiliconFlow",
        default_endpoint: "https://api.siliconflow.cn/v1",
        default_model: "deepseek-ai/DeepSeek-V3",
        requires_credential: true,
        constructor: remote_chat_backend,
    },
    BackendSpec {
        id: "openai",
        display_name: "OpenAI",
        default_endpoint: "https://api.openai.com/v1",
        default_model: "gpt-4o-mini",
        requires_credential: true,
        constructor: remote_chat_backend,
    },
    BackendSpec {
        id: "deepseek",
        display_name: "DeepSeek",
        default_endpoint: "https://api.deepseek.com/v1",
        default_model: "deepseek-chat",
        requires_credential: true,
        constructor: remote_chat_backend,
    },
    BackendSpec {
        id: "lmstudio",
        display_name: "LM Studio",
        default_endpoint: "http://localhost:1234/v1",
        default_model: "local-model",
        requires_credential: false,
        constructor: local_chat_backend,
    },
];

fn remote_chat_backend(credential: &str, settings: BackendSettings) -> Result<Box<dyn Translator>, TranslationError> {
    Ok(Box::new(ChatTranslator::connect(credential, settings)?))
}

// LM Studio accepts any bearer token
fn local_chat_backend(credential: &str, settings: BackendSettings) -> Result<Box<dyn Translator>, TranslationError> {
    let credential = if credential.trim().is_empty() { "lm-studio" } else { credential };
    Ok(Box::new(ChatTranslator::connect(credential, settings)?))
}

fn normalize_id(backend_id: &str) -> String {
    backend_id.trim().to_lowercase().replace('-', "_")
}

/// All registered backends
pub fn available_backends() -> &'static [BackendSpec] {
    BACKENDS
}

/// Look up a backend by identifier (case-insensitive, `-` and `_` interchangeable)
pub fn find_backend(backend_id: &str) -> Option<&'static BackendSpec> {
    let id = normalize_id(backend_id);
    let id = if id == "siliconflow" { DEFAULT_BACKEND.to_string() } else { id };
    BACKENDS.iter().find(|spec| spec.id == id)
}

impl BackendSpec {
    /// Resolve settings from the defaults and the given overrides
    pub fn settings(&self, options: &BackendOptions) -> BackendSettings {
        fn non_empty(value: &Option<String>) -> Option<String> {
            value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
        }

        BackendSettings {
            name: self.id.to_string(),
            model: non_empty(&options.model).unwrap_or_else(|| self.default_model.to_string()),
            endpoint: non_empty(&options.endpoint).unwrap_or_else(|| self.default_endpoint.to_string()),
            timeout_secs: options.timeout_secs.filter(|t| *t > 0).unwrap_or(DEFAULT_TIMEOUT_SECS),
            temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            system_prompt: non_empty(&options.system_prompt).unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }
}

/// Build the translator for `backend_id` with default settings
pub fn select(backend_id: &str, credential: &str) -> Result<Box<dyn Translator>, TranslationError> {
    select_with(backend_id, credential, &BackendOptions::default())
}

/// Build the translator for `backend_id`, applying `options` over its defaults
pub fn select_with(
    backend_id: &str,
    credential: &str,
    options: &BackendOptions,
) -> Result<Box<dyn Translator>, TranslationError> {
    let spec = find_backend(backend_id)
        .ok_or_else(|| TranslationError::UnknownBackend(backend_id.to_string()))?;
    let settings = spec.settings(options);
    debug!("Selected backend {} ({} @ {})", spec.display_name, settings.model, settings.endpoint);
    (spec.constructor)(credential, settings)
}

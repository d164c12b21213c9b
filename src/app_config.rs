use anyhow::{Context, Result, anyhow};
use log::LevelFilter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use crate::document::{FontSize, RgbColor, RunStyle};
use crate::pipeline::{
    DEFAULT_EXCERPT_CHARS, DEFAULT_FAILURE_MARKER, DEFAULT_FONT_SIZE_PT, FailurePolicy, PipelineOptions, Placement,
};
use crate::translation::backend::{DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS};
use crate::translation::port::{DEFAULT_SOURCE_LANGUAGE, DEFAULT_TARGET_LANGUAGE};
use crate::translation::{BackendOptions, BackendSpec, DEFAULT_BACKEND, available_backends, ensure_credential, find_backend};

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "YADTWAI_API_KEY";

/// Default configuration file name
pub const DEFAULT_CONFIG_PATH: &str = "conf.json";

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Output document styling and failure handling
    #[serde(default)]
    pub document: DocumentConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Backend configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BackendConfig {
    // @field: Backend identifier
    #[serde(rename = "type")]
    pub backend_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BackendConfig {
    // @param spec: Registered backend
    // @returns: Backend config with the backend's defaults and no key
    pub fn new(spec: &BackendSpec) -> Self {
        Self {
            backend_type: spec.id.to_string(),
            model: spec.default_model.to_string(),
            api_key: String::new(),
            endpoint: spec.default_endpoint.to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Translation backend configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Backend to use
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Per-backend settings
    #[serde(default)]
    pub available_backends: Vec<BackendConfig>,

    /// Settings shared by all backends
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all backends
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System prompt template for translation
    /// Placeholders: {source_language}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Delay in milliseconds between consecutive requests
    #[serde(default)]
    pub request_delay_ms: u64,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            request_delay_ms: 0,
        }
    }
}

/// How translated paragraphs are written into the document
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DocumentConfig {
    /// Insert translations before or after the original paragraph
    #[serde(default)]
    pub placement: Placement,

    /// Colour of translated text, `RRGGBB`
    #[serde(default = "default_color")]
    pub color: String,

    /// Font size of translated text in points
    #[serde(default = "default_font_size_pt")]
    pub font_size_pt: f32,

    /// Length of paragraph excerpts in progress output
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,

    /// What to do when a paragraph cannot be translated
    #[serde(default)]
    pub on_failure: FailurePolicy,

    /// Placeholder text inserted for failed paragraphs
    #[serde(default = "default_failure_marker")]
    pub failure_marker: String,

    /// Colour of the placeholder, `RRGGBB`
    #[serde(default = "default_failure_color")]
    pub failure_color: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            placement: Placement::default(),
            color: default_color(),
            font_size_pt: default_font_size_pt(),
            excerpt_chars: default_excerpt_chars(),
            on_failure: FailurePolicy::default(),
            failure_marker: default_failure_marker(),
            failure_color: default_failure_color(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    DEFAULT_SOURCE_LANGUAGE.to_string()
}

fn default_target_language() -> String {
    DEFAULT_TARGET_LANGUAGE.to_string()
}

fn default_backend() -> String {
    DEFAULT_BACKEND.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_color() -> String {
    RgbColor::DARK_BLUE.to_hex()
}

fn default_font_size_pt() -> f32 {
    DEFAULT_FONT_SIZE_PT
}

fn default_excerpt_chars() -> usize {
    DEFAULT_EXCERPT_CHARS
}

fn default_failure_marker() -> String {
    DEFAULT_FAILURE_MARKER.to_string()
}

fn default_failure_color() -> String {
    crate::pipeline::DEFAULT_FAILURE_COLOR.to_hex()
}

/// Pick the API key: command line first, then environment, then config file
pub fn resolve_api_key(cli: Option<&str>, env: Option<&str>, config: &str) -> String {
    [cli, env]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|key| !key.is_empty())
        .unwrap_or_else(|| config.trim())
        .to_string()
}

/// `RRGGBB` with an optional leading `#`
static COLOR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#?[0-9A-Fa-f]{6}$").expect("valid colour pattern"));

fn parse_color(field: &str, value: &str) -> Result<RgbColor> {
    if !COLOR_PATTERN.is_match(value.trim()) {
        return Err(anyhow!("{} must be a hex colour like 00008B, got '{}'", field, value));
    }
    Ok(RgbColor::from_hex(value)?)
}

impl Config {
    /// Read a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).context(format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Config =
            serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write this configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .context(format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Read `path`, or write and return the defaults when it does not exist.
    /// The flag is true when the file was created.
    pub fn load_or_create(path: &Path) -> Result<(Self, bool)> {
        if path.exists() {
            Ok((Self::load(path)?, false))
        } else {
            let config = Self::default();
            config.save(path)?;
            Ok((config, true))
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        let _source_name = crate::language_utils::get_language_name(&self.source_language)?;
        let _target_name = crate::language_utils::get_language_name(&self.target_language)?;
        if crate::language_utils::language_codes_match(&self.source_language, &self.target_language) {
            return Err(anyhow!(
                "source and target languages must differ, both are '{}'",
                self.target_language
            ));
        }

        let spec = find_backend(&self.translation.backend)
            .ok_or_else(|| anyhow!("Unknown translation backend: {}", self.translation.backend))?;
        if spec.requires_credential {
            ensure_credential(&self.translation.get_api_key())
                .map_err(|e| anyhow!("{} (backend '{}', set --api-key or {})", e, spec.id, API_KEY_ENV))?;
        }

        let temperature = self.translation.common.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(anyhow!("temperature must be between 0.0 and 2.0, got {}", temperature));
        }

        parse_color("document.color", &self.document.color)?;
        parse_color("document.failure_color", &self.document.failure_color)?;

        let size = self.document.font_size_pt;
        if !(1.0..=409.5).contains(&size) {
            return Err(anyhow!("document.font_size_pt must be between 1 and 409.5, got {}", size));
        }

        Ok(())
    }

    /// Pipeline settings derived from this configuration
    pub fn pipeline_options(&self) -> Result<PipelineOptions> {
        let size = FontSize::from_points(self.document.font_size_pt);
        Ok(PipelineOptions {
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
            placement: self.document.placement,
            translation_style: RunStyle::new(parse_color("document.color", &self.document.color)?, size),
            failure_policy: self.document.on_failure,
            failure_marker: self.document.failure_marker.clone(),
            failure_style: RunStyle::new(parse_color("document.failure_color", &self.document.failure_color)?, size),
            excerpt_chars: self.document.excerpt_chars.max(1),
            request_delay: Duration::from_millis(self.translation.common.request_delay_ms),
        })
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            translation: TranslationConfig::default(),
            document: DocumentConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active backend configuration from the available_backends array
    pub fn get_active_backend_config(&self) -> Option<&BackendConfig> {
        self.get_backend_config(&self.backend)
    }

    /// Get a specific backend configuration by identifier
    pub fn get_backend_config(&self, backend_id: &str) -> Option<&BackendConfig> {
        let id = find_backend(backend_id).map(|spec| spec.id).unwrap_or(backend_id);
        self.available_backends.iter().find(|b| b.backend_type == id)
    }

    fn active_backend_config_mut(&mut self) -> Option<&mut BackendConfig> {
        let spec = find_backend(&self.backend)?;
        if !self.available_backends.iter().any(|b| b.backend_type == spec.id) {
            self.available_backends.push(BackendConfig::new(spec));
        }
        self.available_backends.iter_mut().find(|b| b.backend_type == spec.id)
    }

    /// Get the API key for the active backend
    pub fn get_api_key(&self) -> String {
        self.get_active_backend_config()
            .map(|b| b.api_key.clone())
            .unwrap_or_default()
    }

    /// Set the API key of the active backend
    pub fn set_api_key(&mut self, api_key: &str) {
        if let Some(backend) = self.active_backend_config_mut() {
            backend.api_key = api_key.to_string();
        }
    }

    /// Set the model of the active backend
    pub fn set_model(&mut self, model: &str) {
        if let Some(backend) = self.active_backend_config_mut() {
            backend.model = model.to_string();
        }
    }

    /// Overrides handed to the backend selector
    pub fn backend_options(&self) -> BackendOptions {
        let active = self.get_active_backend_config();
        let non_empty = |value: &str| (!value.trim().is_empty()).then(|| value.to_string());

        BackendOptions {
            model: active.and_then(|b| non_empty(&b.model)),
            endpoint: active.and_then(|b| non_empty(&b.endpoint)),
            timeout_secs: active.map(|b| b.timeout_secs),
            temperature: Some(self.common.temperature),
            system_prompt: non_empty(&self.common.system_prompt),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            available_backends: available_backends().iter().map(BackendConfig::new).collect(),
            common: TranslationCommonConfig::default(),
        }
    }
}

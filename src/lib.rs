/*!
 * # yadtwai - Yet Another Document Translator with AI
 *
 * A Rust library for bilingual translation of Word documents using LLM chat
 * backends.
 *
 * ## Features
 *
 * - Paragraph-by-paragraph translation of `.docx` documents
 * - Each translation inserted as a styled paragraph next to its original
 * - OpenAI-compatible chat backends:
 *   - SiliconFlow (default)
 *   - OpenAI
 *   - DeepSeek
 *   - LM Studio (local)
 * - Background job with ordered progress events and cooperative cancellation
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `translation`: The `Translator` port, the chat backend adapter and the
 *   backend selector
 * - `providers`: HTTP client for chat-completion APIs, plus a mock for tests
 * - `document`: Document model and the `.docx` store
 * - `pipeline`: Load, translate, insert, save; emits `ProgressEvent`s
 * - `runner`: Runs a pipeline on a background task and relays its events
 * - `app_config`: Configuration management
 * - `app_controller`: Command line front end (progress bar, Ctrl-C)
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod document;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod pipeline;
pub mod providers;
pub mod runner;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use document::{Document, DocumentStore, DocxStore};
pub use errors::{DocumentError, JobError, ProviderError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use pipeline::{DocumentPipeline, FailurePolicy, JobReport, JobStage, PipelineOptions, Placement, ProgressEvent};
pub use runner::{JobHandle, TaskRunner, TranslationJob};
pub use translation::{Translator, select};

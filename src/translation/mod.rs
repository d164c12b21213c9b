/*!
 * Translation backends for document translation.
 *
 * This module is split into several submodules:
 *
 * - `port`: The `Translator` trait the document pipeline depends on
 * - `backend`: Chat-completion adapter implementing the port
 * - `selector`: Mapping from backend identifier to translator constructor
 */

// Re-export main types for easier usage
pub use self::backend::{BackendSettings, ChatTranslator, ensure_credential};
pub use self::port::{TranslationRequest, TranslationResult, Translator};
pub use self::selector::{BackendOptions, BackendSpec, DEFAULT_BACKEND, available_backends, find_backend, select, select_with};

// Submodules
pub mod backend;
pub mod port;
pub mod selector;

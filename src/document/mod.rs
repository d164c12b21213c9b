/*!
 * Document storage.
 *
 * - `model`: Format-neutral paragraphs, runs and styles
 * - `docx`: The `.docx` implementation of `DocumentStore`
 */

use std::path::Path;

use crate::errors::DocumentError;

pub use self::docx::{DOCUMENT_PART, DocxStore, Package};
pub use self::model::{Block, Document, FontSize, Paragraph, RgbColor, Run, RunStyle};

pub mod docx;
pub mod model;

/// Loads and saves documents.
///
/// The pipeline only depends on this trait, so a different container format
/// can be added without touching the translation loop.
pub trait DocumentStore: Send + Sync {
    /// Read a document from `path`
    fn load(&self, path: &Path) -> Result<Document, DocumentError>;

    /// Write `document` to `path`, replacing any existing file
    fn save(&self, document: &Document, path: &Path) -> Result<(), DocumentError>;
}

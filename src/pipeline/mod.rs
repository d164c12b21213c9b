/*!
 * Document translation pipeline.
 *
 * Loads a document, translates every non-blank paragraph in document order,
 * inserts each translation next to its source paragraph and saves the result.
 * Progress is reported over an unbounded channel; the job can be cancelled
 * between paragraphs (and while a request is in flight).
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::document::{Document, DocumentStore, FontSize, Paragraph, RgbColor, RunStyle};
use crate::errors::JobError;
use crate::translation::{TranslationRequest, Translator};
use crate::translation::port::{DEFAULT_SOURCE_LANGUAGE, DEFAULT_TARGET_LANGUAGE};

pub use self::events::{JobReport, JobStage, ProgressEvent, excerpt};

pub mod events;

/// Default font size of inserted paragraphs, in points
pub const DEFAULT_FONT_SIZE_PT: f32 = 10.5;

/// Default excerpt length in progress events
pub const DEFAULT_EXCERPT_CHARS: usize = 40;

/// Default text of the placeholder inserted for failed paragraphs
pub const DEFAULT_FAILURE_MARKER: &str = "[translation failed]";

/// Default colour of the failure placeholder
pub const DEFAULT_FAILURE_COLOR: RgbColor = RgbColor(0xC0, 0x00, 0x00);

/// Where a translation goes relative to its source paragraph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Immediately before the original
    #[default]
    Before,
    /// Immediately after the original
    After,
}

/// What to do when a paragraph cannot be translated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Insert a placeholder paragraph in the failure style
    #[default]
    Marker,
    /// Insert nothing
    Omit,
    /// Stop the job
    Abort,
}

/// Per-job pipeline settings
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Placement of inserted paragraphs
    pub placement: Placement,
    /// Style of translated paragraphs
    pub translation_style: RunStyle,
    /// Handling of per-paragraph failures
    pub failure_policy: FailurePolicy,
    /// Placeholder text for failed paragraphs
    pub failure_marker: String,
    /// Style of the placeholder
    pub failure_style: RunStyle,
    /// Excerpt length in progress events
    pub excerpt_chars: usize,
    /// Pause between consecutive requests
    pub request_delay: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        let size = FontSize::from_points(DEFAULT_FONT_SIZE_PT);
        Self {
            source_language: DEFAULT_SOURCE_LANGUAGE.to_string(),
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            placement: Placement::Before,
            translation_style: RunStyle::new(RgbColor::DARK_BLUE, size),
            failure_policy: FailurePolicy::Marker,
            failure_marker: DEFAULT_FAILURE_MARKER.to_string(),
            failure_style: RunStyle::new(DEFAULT_FAILURE_COLOR, size),
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            request_delay: Duration::ZERO,
        }
    }
}

/// Translates one document through a `Translator` and a `DocumentStore`
pub struct DocumentPipeline {
    store: Arc<dyn DocumentStore>,
    translator: Arc<dyn Translator>,
    options: PipelineOptions,
}

impl DocumentPipeline {
    /// Create a pipeline
    pub fn new(store: Arc<dyn DocumentStore>, translator: Arc<dyn Translator>, options: PipelineOptions) -> Self {
        Self {
            store,
            translator,
            options,
        }
    }

    /// Options in use
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run the job, reporting progress on `events`.
    ///
    /// Exactly one terminal event (`Completed` or `Failed`) is sent. The output
    /// file is only written when every stage before saving succeeded.
    pub async fn run(
        &self,
        input_path: &Path,
        output_path: &Path,
        events: &UnboundedSender<ProgressEvent>,
        cancel: &CancellationToken,
    ) -> Result<JobReport, JobError> {
        let emit = |event: ProgressEvent| {
            let _ = events.send(event);
        };
        let fail = |stage: JobStage, err: JobError| -> JobError {
            error!("Job failed while {}: {}", stage, err);
            let _ = events.send(ProgressEvent::StageChanged(JobStage::Failed));
            let _ = events.send(ProgressEvent::Failed {
                stage,
                message: err.to_string(),
            });
            err
        };

        emit(ProgressEvent::StageChanged(JobStage::Loading));
        debug!("Loading {}", input_path.display());
        let mut document = match self.load(input_path).await {
            Ok(document) => document,
            Err(e) => return Err(fail(JobStage::Loading, e)),
        };

        let positions = document.translatable_positions();
        let total = positions.len();
        emit(ProgressEvent::Info(format!(
            "Found {} paragraphs to translate with {}",
            total,
            self.translator.name()
        )));
        emit(ProgressEvent::StageChanged(JobStage::Translating { current: 0, total }));

        let mut inserted = 0;
        let mut translated = 0;
        let mut failed = 0;

        for (i, position) in positions.into_iter().enumerate() {
            let index = i + 1;

            if i > 0 && !self.options.request_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.options.request_delay) => {}
                }
            }
            if cancel.is_cancelled() {
                let stage = JobStage::Translating { current: i, total };
                return Err(fail(stage, JobError::Cancelled { completed: i, total }));
            }

            let at = position + inserted;
            let original = match document.paragraph_at(at) {
                Some(paragraph) => paragraph.text(),
                None => {
                    let stage = JobStage::Translating { current: index, total };
                    return Err(fail(stage, JobError::Aborted(format!("paragraph {} is missing", index))));
                }
            };

            let request = TranslationRequest::new(original.as_str())
                .languages(self.options.source_language.as_str(), self.options.target_language.as_str());
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = request.send(self.translator.as_ref()) => Some(result),
            };

            let (paragraph, error) = match outcome {
                None => {
                    let stage = JobStage::Translating { current: index, total };
                    return Err(fail(stage, JobError::Cancelled { completed: i, total }));
                }
                Some(Ok(text)) => {
                    translated += 1;
                    (Some(Paragraph::styled(text, self.options.translation_style)), None)
                }
                Some(Err(e)) => {
                    failed += 1;
                    warn!("Paragraph {}/{} could not be translated: {}", index, total, e);
                    match self.options.failure_policy {
                        FailurePolicy::Marker => (
                            Some(Paragraph::styled(
                                self.options.failure_marker.clone(),
                                self.options.failure_style,
                            )),
                            Some(e.to_string()),
                        ),
                        FailurePolicy::Omit => (None, Some(e.to_string())),
                        FailurePolicy::Abort => {
                            emit(ProgressEvent::ParagraphTranslated {
                                index,
                                total,
                                excerpt: excerpt(&original, self.options.excerpt_chars),
                                error: Some(e.to_string()),
                            });
                            let stage = JobStage::Translating { current: index, total };
                            return Err(fail(stage, JobError::Paragraph { index, source: e }));
                        }
                    }
                }
            };

            if let Some(paragraph) = paragraph {
                let insert_at = match self.options.placement {
                    Placement::Before => at,
                    Placement::After => at + 1,
                };
                if let Err(e) = document.insert_paragraph(insert_at, paragraph) {
                    let stage = JobStage::Translating { current: index, total };
                    return Err(fail(stage, e.into()));
                }
                inserted += 1;
            }

            emit(ProgressEvent::ParagraphTranslated {
                index,
                total,
                excerpt: excerpt(&original, self.options.excerpt_chars),
                error,
            });
        }

        emit(ProgressEvent::StageChanged(JobStage::Saving));
        debug!("Saving {}", output_path.display());
        if let Err(e) = self.save(document, output_path).await {
            return Err(fail(JobStage::Saving, e));
        }

        emit(ProgressEvent::StageChanged(JobStage::Done));
        emit(ProgressEvent::Completed {
            output_path: output_path.to_path_buf(),
            translated,
            failed,
        });

        Ok(JobReport {
            output_path: output_path.to_path_buf(),
            total,
            translated,
            failed,
        })
    }

    async fn load(&self, path: &Path) -> Result<Document, JobError> {
        let store = Arc::clone(&self.store);
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || store.load(&path))
            .await
            .map_err(|e| JobError::Aborted(e.to_string()))?
            .map_err(JobError::from)
    }

    async fn save(&self, document: Document, path: &Path) -> Result<(), JobError> {
        let store = Arc::clone(&self.store);
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || store.save(&document, &path))
            .await
            .map_err(|e| JobError::Aborted(e.to_string()))?
            .map_err(JobError::from)
    }
}

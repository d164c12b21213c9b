/*!
 * Background task runner.
 *
 * Hosts one `DocumentPipeline` per job on a spawned tokio task and relays its
 * progress events to the caller. The relay guarantees the consumer sees
 * exactly one terminal event, even when the job panics.
 */

use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::document::{DocumentStore, DocxStore};
use crate::errors::{JobError, TranslationError};
use crate::pipeline::{DocumentPipeline, JobReport, JobStage, PipelineOptions, ProgressEvent};
use crate::translation::{BackendOptions, DEFAULT_BACKEND, Translator, select_with};

/// Everything needed to run one translation
#[derive(Clone)]
pub struct TranslationJob {
    /// Document to translate
    pub input_path: PathBuf,
    /// Where to write the result
    pub output_path: PathBuf,
    /// API key for the backend
    pub credential: String,
    /// Backend identifier
    pub backend_id: String,
    /// Backend overrides
    pub backend_options: BackendOptions,
    /// Pipeline settings
    pub options: PipelineOptions,
}

impl fmt::Debug for TranslationJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationJob")
            .field("input_path", &self.input_path)
            .field("output_path", &self.output_path)
            .field("credential", &"<redacted>")
            .field("backend_id", &self.backend_id)
            .field("backend_options", &self.backend_options)
            .field("options", &self.options)
            .finish()
    }
}

impl TranslationJob {
    /// Job on the default backend with default settings
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>, credential: impl Into<String>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            credential: credential.into(),
            backend_id: DEFAULT_BACKEND.to_string(),
            backend_options: BackendOptions::default(),
            options: PipelineOptions::default(),
        }
    }

    /// Use another backend
    pub fn backend(mut self, backend_id: impl Into<String>, options: BackendOptions) -> Self {
        self.backend_id = backend_id.into();
        self.backend_options = options;
        self
    }

    /// Use other pipeline settings
    pub fn options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }
}

/// Handle to a running job.
///
/// Dropping the handle detaches the job; it keeps running until it finishes
/// or the runtime shuts down.
pub struct JobHandle {
    /// Ordered progress events, ending with `Completed` or `Failed`
    pub events: UnboundedReceiver<ProgressEvent>,
    /// Cancels the job between paragraphs
    pub cancel: CancellationToken,
    /// Resolves to the job's outcome
    pub join: JoinHandle<Result<JobReport, JobError>>,
}

impl JobHandle {
    /// Request cancellation
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Next progress event, `None` once the job is finished
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.events.recv().await
    }

    /// Wait for the job to finish, discarding remaining events
    pub async fn wait(self) -> Result<JobReport, JobError> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(JobError::Aborted(e.to_string())),
        }
    }
}

/// Starts translation jobs on background tasks
#[derive(Clone)]
pub struct TaskRunner {
    store: Arc<dyn DocumentStore>,
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRunner {
    /// Runner reading and writing `.docx` files
    pub fn new() -> Self {
        Self::with_store(Arc::new(DocxStore::new()))
    }

    /// Runner using a custom document store
    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Build the job's backend and start it.
    ///
    /// Configuration problems (unknown backend, missing credential) are
    /// returned here, before anything is spawned.
    pub fn start(&self, job: TranslationJob) -> Result<JobHandle, TranslationError> {
        let translator = select_with(&job.backend_id, &job.credential, &job.backend_options)?;
        Ok(self.start_with_translator(job, Arc::from(translator)))
    }

    /// Start a job on an already constructed translator.
    /// Must be called from within a tokio runtime.
    pub fn start_with_translator(&self, job: TranslationJob, translator: Arc<dyn Translator>) -> JobHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (inner_tx, mut inner_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        debug!(
            "Starting job {} -> {} on {}",
            job.input_path.display(),
            job.output_path.display(),
            translator.name()
        );

        let TranslationJob {
            input_path,
            output_path,
            options,
            ..
        } = job;
        let pipeline = DocumentPipeline::new(Arc::clone(&self.store), translator, options);
        let job_cancel = cancel.clone();
        let worker = tokio::spawn(async move {
            pipeline
                .run(&input_path, &output_path, &inner_tx, &job_cancel)
                .await
        });

        let join = tokio::spawn(async move {
            let mut stage = JobStage::Loading;
            let mut terminal_sent = false;

            while let Some(event) = inner_rx.recv().await {
                match &event {
                    ProgressEvent::StageChanged(s) if *s != JobStage::Failed => stage = *s,
                    ProgressEvent::ParagraphTranslated { index, total, .. } => {
                        stage = JobStage::Translating {
                            current: *index,
                            total: *total,
                        };
                    }
                    _ => {}
                }
                if terminal_sent {
                    continue;
                }
                terminal_sent = event.is_terminal();
                let _ = tx.send(event);
            }

            let outcome = match worker.await {
                Ok(result) => result,
                Err(join_error) => {
                    let message = if join_error.is_panic() {
                        panic_message(join_error.into_panic())
                    } else {
                        join_error.to_string()
                    };
                    error!("Translation task ended abnormally while {}: {}", stage, message);
                    Err(JobError::Aborted(message))
                }
            };

            if !terminal_sent {
                let message = match &outcome {
                    Err(e) => e.to_string(),
                    Ok(_) => "job finished without reporting a result".to_string(),
                };
                let _ = tx.send(ProgressEvent::StageChanged(JobStage::Failed));
                let _ = tx.send(ProgressEvent::Failed { stage, message });
                if outcome.is_ok() {
                    return Err(JobError::Aborted("job finished without reporting a result".to_string()));
                }
            }

            outcome
        });

        JobHandle {
            events: rx,
            cancel,
            join,
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

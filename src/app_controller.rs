use anyhow::{Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::pipeline::{JobReport, ProgressEvent};
use crate::runner::{JobHandle, TaskRunner, TranslationJob};
use crate::translation::{Translator, find_backend};

// @module: Application controller for document translation

/// Main application controller for document translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Starts jobs on background tasks
    runner: TaskRunner,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self::with_runner(config, TaskRunner::new()))
    }

    /// Create a controller using a specific runner
    pub fn with_runner(config: Config, runner: TaskRunner) -> Self {
        Self { config, runner }
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the job description for one document
    pub fn job(&self, input_file: &Path, output_file: &Path) -> Result<TranslationJob> {
        let translation = &self.config.translation;
        Ok(TranslationJob::new(input_file, output_file, translation.get_api_key())
            .backend(translation.backend.clone(), translation.backend_options())
            .options(self.config.pipeline_options()?))
    }

    /// Translate `input_file` into `output_file` using the configured backend
    pub async fn run(&self, input_file: PathBuf, output_file: PathBuf, force_overwrite: bool) -> Result<JobReport> {
        self.prepare(&input_file, &output_file, force_overwrite)?;

        let job = self.job(&input_file, &output_file)?;
        let backend = find_backend(&job.backend_id)
            .map(|spec| spec.display_name)
            .unwrap_or("unknown backend");
        let model = job
            .backend_options
            .model
            .clone()
            .or_else(|| find_backend(&job.backend_id).map(|spec| spec.default_model.to_string()))
            .unwrap_or_default();
        info!("🚀 yadtwai: {} - {}", backend, model);

        let handle = self.runner.start(job)?;
        self.follow(handle).await
    }

    /// Translate with an already constructed translator
    pub async fn run_with_translator(
        &self,
        input_file: PathBuf,
        output_file: PathBuf,
        force_overwrite: bool,
        translator: Arc<dyn Translator>,
    ) -> Result<JobReport> {
        self.prepare(&input_file, &output_file, force_overwrite)?;
        let job = self.job(&input_file, &output_file)?;
        let handle = self.runner.start_with_translator(job, translator);
        self.follow(handle).await
    }

    fn prepare(&self, input_file: &Path, output_file: &Path, force_overwrite: bool) -> Result<()> {
        FileManager::check_paths(input_file, output_file, force_overwrite)?;
        if let Some(parent) = output_file.parent() {
            FileManager::ensure_dir(parent)?;
        }
        if output_file.exists() {
            warn!("Overwriting existing file: {}", output_file.display());
        }
        Ok(())
    }

    /// Render job events until the job ends; Ctrl-C cancels the job
    async fn follow(&self, mut handle: JobHandle) -> Result<JobReport> {
        let start_time = Instant::now();
        let cancel = handle.cancel.clone();
        let progress_bar = Self::progress_bar();
        let mut cancel_requested = false;

        loop {
            tokio::select! {
                event = handle.events.recv() => match event {
                    Some(event) => Self::render(&progress_bar, event),
                    None => break,
                },
                _ = tokio::signal::ctrl_c(), if !cancel_requested => {
                    progress_bar.suspend(|| warn!("Cancelling after the current paragraph…"));
                    cancel.cancel();
                    cancel_requested = true;
                }
            }
        }

        progress_bar.finish_and_clear();

        let report = handle.wait().await.map_err(|e| anyhow!(e))?;
        let elapsed = Self::format_duration(start_time.elapsed());
        if report.is_clean() {
            info!(
                "Successfully translated all {} paragraphs in {}",
                report.translated, elapsed
            );
        } else {
            warn!(
                "Translated {} of {} paragraphs in {} ({} failed)",
                report.translated, report.total, elapsed, report.failed
            );
        }
        info!("Success: {}", report.output_path.display());

        Ok(report)
    }

    fn progress_bar() -> ProgressBar {
        let progress_bar = ProgressBar::new(0);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} paragraphs ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar
    }

    fn render(progress_bar: &ProgressBar, event: ProgressEvent) {
        match event {
            ProgressEvent::StageChanged(stage) => {
                debug!("Stage: {}", stage);
                progress_bar.set_message(stage.to_string());
            }
            ProgressEvent::Info(message) => {
                progress_bar.suspend(|| info!("{}", message));
            }
            ProgressEvent::ParagraphTranslated {
                index,
                total,
                excerpt,
                error,
            } => {
                progress_bar.set_length(total as u64);
                progress_bar.set_position(index as u64);
                progress_bar.set_message(excerpt.clone());
                if let Some(reason) = error {
                    progress_bar.suspend(|| warn!("[{}/{}] {}: {}", index, total, excerpt, reason));
                } else {
                    debug!("[{}/{}] {}", index, total, excerpt);
                }
            }
            ProgressEvent::Completed {
                output_path,
                translated,
                failed,
            } => {
                debug!("Completed {} ({} translated, {} failed)", output_path.display(), translated, failed);
            }
            ProgressEvent::Failed { stage, message } => {
                progress_bar.suspend(|| error!("Translation failed while {}: {}", stage, message));
            }
        }
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

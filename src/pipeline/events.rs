/*!
 * Progress events and job outcomes.
 */

use std::fmt;
use std::path::PathBuf;

/// Where a job is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    /// Opening the input document
    Loading,
    /// Translating paragraph `current` of `total` (0 before the first one)
    Translating {
        /// 1-based index of the paragraph in flight
        current: usize,
        /// Number of translatable paragraphs
        total: usize,
    },
    /// Writing the output document
    Saving,
    /// Finished successfully
    Done,
    /// Finished with an error
    Failed,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStage::Loading => write!(f, "loading"),
            JobStage::Translating { current, total } => write!(f, "translating ({}/{})", current, total),
            JobStage::Saving => write!(f, "saving"),
            JobStage::Done => write!(f, "done"),
            JobStage::Failed => write!(f, "failed"),
        }
    }
}

/// Event sent from a running job to its consumer
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// The job entered a new stage
    StageChanged(JobStage),

    /// Free-form status message
    Info(String),

    /// One paragraph was processed
    ParagraphTranslated {
        /// 1-based index among translatable paragraphs
        index: usize,
        /// Number of translatable paragraphs
        total: usize,
        /// Truncated original text, for display
        excerpt: String,
        /// Reason the translation failed, if it did
        error: Option<String>,
    },

    /// The output document was written
    Completed {
        /// Where the output was saved
        output_path: PathBuf,
        /// Paragraphs translated successfully
        translated: usize,
        /// Paragraphs whose translation failed
        failed: usize,
    },

    /// The job stopped without producing output
    Failed {
        /// Stage the job was in
        stage: JobStage,
        /// What went wrong
        message: String,
    },
}

impl ProgressEvent {
    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Completed { .. } | ProgressEvent::Failed { .. })
    }
}

/// Summary of a finished job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    /// Where the output was saved
    pub output_path: PathBuf,
    /// Number of translatable paragraphs
    pub total: usize,
    /// Paragraphs translated successfully
    pub translated: usize,
    /// Paragraphs whose translation failed
    pub failed: usize,
}

impl JobReport {
    /// True when every paragraph was translated
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Shorten `text` to at most `max_chars` characters for display.
/// Line breaks and tabs become spaces; an ellipsis marks truncation.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let flat: String = text
        .trim()
        .chars()
        .map(|c| if c == '\n' || c == '\t' { ' ' } else { c })
        .collect();

    if flat.chars().count() <= max_chars {
        flat
    } else {
        let mut short: String = flat.chars().take(max_chars).collect();
        short.push_str("...");
        short
    }
}

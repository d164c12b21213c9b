/*!
 * Tests for the background task runner and its event relay
 */

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use yadtwai::errors::{JobError, TranslationError};
use yadtwai::pipeline::{JobStage, ProgressEvent};
use yadtwai::runner::{JobHandle, TaskRunner, TranslationJob};

use crate::common;
use crate::common::mock_translators::{GatedTranslator, IdentityTranslator, PanickingTranslator};

async fn drain(handle: &mut JobHandle) -> Vec<ProgressEvent> {
    common::init_test_logging();
    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }
    events
}

async fn wait_for_calls(translator: &GatedTranslator, calls: usize) {
    for _ in 0..200 {
        if translator.calls() >= calls {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("translator never reached {} calls", calls);
}

#[tokio::test]
async fn test_startWithTranslator_shouldRelayEventsAndReport() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_docx(temp_dir.path(), "in.docx", &["Hello", "World"])?;
    let output = temp_dir.path().join("out.docx");

    let mut handle = TaskRunner::new().start_with_translator(
        TranslationJob::new(&input, &output, "sk-test"),
        Arc::new(IdentityTranslator::new()),
    );
    let events = drain(&mut handle).await;
    let report = handle.wait().await?;

    assert_eq!(report.total, 2);
    assert_eq!(report.output_path, output);
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(matches!(events.last(), Some(ProgressEvent::Completed { translated: 2, .. })));
    assert_eq!(
        common::read_paragraphs(&output)?,
        vec!["Hello", "Hello", "World", "World"]
    );
    Ok(())
}

#[tokio::test]
async fn test_start_withEmptyCredential_shouldFailBeforeSpawning() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_docx(temp_dir.path(), "in.docx", &["Hello"])?;
    let output = temp_dir.path().join("out.docx");

    let result = TaskRunner::new().start(TranslationJob::new(&input, &output, ""));
    assert!(matches!(result, Err(TranslationError::Configuration(_))));
    assert!(!output.exists());
    Ok(())
}

#[tokio::test]
async fn test_start_withUnknownBackend_shouldFail() -> Result<()> {
    let job = TranslationJob::new("in.docx", "out.docx", "sk-test").backend("babelfish", Default::default());
    let result = TaskRunner::new().start(job);
    assert!(matches!(result, Err(TranslationError::UnknownBackend(_))));
    Ok(())
}

#[tokio::test]
async fn test_panickingTranslator_shouldEndWithSingleFailedEvent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_docx(temp_dir.path(), "in.docx", &["Hello"])?;
    let output = temp_dir.path().join("out.docx");

    let mut handle = TaskRunner::new().start_with_translator(
        TranslationJob::new(&input, &output, "sk-test"),
        Arc::new(PanickingTranslator),
    );
    let events = drain(&mut handle).await;
    let outcome = handle.wait().await;

    assert!(matches!(&outcome, Err(JobError::Aborted(message)) if message.contains("translator exploded")));
    let terminal: Vec<&ProgressEvent> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    assert_eq!(events[events.len() - 2], ProgressEvent::StageChanged(JobStage::Failed));
    match terminal[0] {
        ProgressEvent::Failed { stage, message } => {
            assert_eq!(*stage, JobStage::Translating { current: 0, total: 1 });
            assert!(message.contains("translator exploded"));
        }
        other => panic!("unexpected terminal event: {:?}", other),
    }
    assert!(!output.exists());
    Ok(())
}

#[tokio::test]
async fn test_cancel_midJob_shouldStopAndSkipSaving() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_docx(temp_dir.path(), "in.docx", &["one", "two", "three"])?;
    let output = temp_dir.path().join("out.docx");
    let translator = GatedTranslator::new();

    let mut handle = TaskRunner::new().start_with_translator(
        TranslationJob::new(&input, &output, "sk-test"),
        Arc::new(translator.clone()),
    );

    wait_for_calls(&translator, 1).await;
    translator.release_one();
    wait_for_calls(&translator, 2).await;
    handle.cancel();

    let events = drain(&mut handle).await;
    let outcome = handle.wait().await;

    assert!(matches!(outcome, Err(JobError::Cancelled { completed: 1, total: 3 })));
    assert_eq!(translator.calls(), 2);
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::Failed { stage: JobStage::Translating { .. }, .. })
    ));
    let translated = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::ParagraphTranslated { .. }))
        .count();
    assert_eq!(translated, 1);
    assert!(!output.exists());
    Ok(())
}

#[tokio::test]
async fn test_droppedHandle_shouldLetJobFinish() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_docx(temp_dir.path(), "in.docx", &["Hello"])?;
    let output = temp_dir.path().join("out.docx");

    let handle = TaskRunner::new().start_with_translator(
        TranslationJob::new(&input, &output, "sk-test"),
        Arc::new(IdentityTranslator::new()),
    );
    drop(handle);

    for _ in 0..200 {
        if output.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(common::read_paragraphs(&output)?, vec!["Hello", "Hello"]);
    Ok(())
}

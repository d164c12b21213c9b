/*!
 * End-to-end tests of the document pipeline on real .docx files
 */

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use yadtwai::document::{Block, DocxStore, RgbColor};
use yadtwai::errors::JobError;
use yadtwai::pipeline::{
    DocumentPipeline, FailurePolicy, JobReport, JobStage, PipelineOptions, Placement, ProgressEvent,
};
use yadtwai::translation::Translator;

use crate::common;
use crate::common::mock_translators::{FlakyTranslator, IdentityTranslator, SilentTranslator};

async fn run_pipeline(
    translator: Arc<dyn Translator>,
    options: PipelineOptions,
    input: &Path,
    output: &Path,
) -> (Result<JobReport, JobError>, Vec<ProgressEvent>) {
    common::init_test_logging();
    let pipeline = DocumentPipeline::new(Arc::new(DocxStore::new()), translator, options);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let result = pipeline.run(input, output, &tx, &CancellationToken::new()).await;
    drop(tx);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (result, events)
}

fn paragraph_events(events: &[ProgressEvent]) -> Vec<(usize, usize, Option<String>)> {
    events
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::ParagraphTranslated { index, total, error, .. } => Some((*index, *total, error.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_identityTranslator_withBlankParagraph_shouldPairEveryNonBlankOne() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_docx(temp_dir.path(), "in.docx", &["Hello world.", "  ", "Goodbye."])?;
    let output = temp_dir.path().join("out.docx");
    let translator = IdentityTranslator::new();

    let (result, events) = run_pipeline(Arc::new(translator.clone()), PipelineOptions::default(), &input, &output).await;
    let report = result?;

    assert_eq!(
        common::read_paragraphs(&output)?,
        vec!["Hello world.", "Hello world.", "  ", "Goodbye.", "Goodbye."]
    );
    assert_eq!(report.total, 2);
    assert_eq!(report.translated, 2);
    assert!(report.is_clean());
    assert_eq!(translator.calls(), 2);
    assert!(matches!(events.last(), Some(ProgressEvent::Completed { translated: 2, failed: 0, .. })));
    Ok(())
}

#[tokio::test]
async fn test_translatedParagraphs_shouldPrecedeOriginalsWithTranslationStyle() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_docx(temp_dir.path(), "in.docx", &["One", "Two", "Three"])?;
    let output = temp_dir.path().join("out.docx");

    let (result, _) = run_pipeline(
        Arc::new(FlakyTranslator::failing_on(&[])),
        PipelineOptions::default(),
        &input,
        &output,
    )
    .await;
    result?;

    let document = common::read_document(&output)?;
    assert_eq!(
        document.paragraph_texts(),
        vec!["[zh] One", "One", "[zh] Two", "Two", "[zh] Three", "Three"]
    );
    let styles: Vec<Option<RgbColor>> = document
        .paragraphs()
        .map(|p| p.runs().first().and_then(|run| run.style.color))
        .collect();
    assert_eq!(
        styles,
        vec![Some(RgbColor::DARK_BLUE), None, Some(RgbColor::DARK_BLUE), None, Some(RgbColor::DARK_BLUE), None]
    );
    Ok(())
}

#[tokio::test]
async fn test_placementAfter_shouldFollowOriginals() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_docx(temp_dir.path(), "in.docx", &["One", "Two"])?;
    let output = temp_dir.path().join("out.docx");
    let options = PipelineOptions {
        placement: Placement::After,
        ..Default::default()
    };

    let (result, _) = run_pipeline(Arc::new(FlakyTranslator::failing_on(&[])), options, &input, &output).await;
    result?;

    assert_eq!(common::read_paragraphs(&output)?, vec!["One", "[zh] One", "Two", "[zh] Two"]);
    Ok(())
}

#[tokio::test]
async fn test_progressEvents_shouldBeOrderedWithOneTerminalEvent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let texts = ["a", "b", "", "c", "d"];
    let input = common::create_test_docx(temp_dir.path(), "in.docx", &texts)?;
    let output = temp_dir.path().join("out.docx");

    let (result, events) = run_pipeline(Arc::new(IdentityTranslator::new()), PipelineOptions::default(), &input, &output).await;
    result?;

    let paragraphs = paragraph_events(&events);
    assert_eq!(
        paragraphs,
        vec![(1, 4, None), (2, 4, None), (3, 4, None), (4, 4, None)]
    );
    assert_eq!(events.first(), Some(&ProgressEvent::StageChanged(JobStage::Loading)));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(events.last().is_some_and(ProgressEvent::is_terminal));

    let saving = events
        .iter()
        .position(|e| *e == ProgressEvent::StageChanged(JobStage::Saving))
        .expect("saving stage");
    let last_paragraph = events
        .iter()
        .rposition(|e| matches!(e, ProgressEvent::ParagraphTranslated { .. }))
        .expect("paragraph events");
    assert!(last_paragraph < saving);
    Ok(())
}

#[tokio::test]
async fn test_documentWithoutText_shouldCompleteWithoutTranslating() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_docx(temp_dir.path(), "in.docx", &["", "   ", "\t"])?;
    let output = temp_dir.path().join("out.docx");
    let translator = IdentityTranslator::new();

    let (result, events) = run_pipeline(Arc::new(translator.clone()), PipelineOptions::default(), &input, &output).await;
    let report = result?;

    assert_eq!(report.total, 0);
    assert_eq!(translator.calls(), 0);
    assert!(paragraph_events(&events).is_empty());
    assert_eq!(common::read_paragraphs(&output)?.len(), 3);

    let tail: Vec<&ProgressEvent> = events.iter().rev().take(3).collect();
    assert!(matches!(tail[0], ProgressEvent::Completed { translated: 0, failed: 0, .. }));
    assert_eq!(tail[1], &ProgressEvent::StageChanged(JobStage::Done));
    assert_eq!(tail[2], &ProgressEvent::StageChanged(JobStage::Saving));
    Ok(())
}

#[tokio::test]
async fn test_failureOnOneParagraph_shouldNotStopTheRest() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_docx(temp_dir.path(), "in.docx", &["One", "Two", "Three"])?;
    let output = temp_dir.path().join("out.docx");
    let translator = FlakyTranslator::failing_on(&[2]);

    let (result, events) = run_pipeline(Arc::new(translator.clone()), PipelineOptions::default(), &input, &output).await;
    let report = result?;

    assert_eq!(translator.calls(), 3);
    assert_eq!(report.translated, 2);
    assert_eq!(report.failed, 1);
    assert!(matches!(events.last(), Some(ProgressEvent::Completed { translated: 2, failed: 1, .. })));

    let paragraphs = paragraph_events(&events);
    assert!(paragraphs[1].2.as_deref().is_some_and(|e| e.contains("simulated reset")));

    let document = common::read_document(&output)?;
    assert_eq!(
        document.paragraph_texts(),
        vec!["[zh] One", "One", "[translation failed]", "Two", "[zh] Three", "Three"]
    );
    let marker_color = document
        .paragraphs()
        .nth(2)
        .and_then(|p| p.runs().first())
        .and_then(|run| run.style.color);
    assert_eq!(marker_color, Some(RgbColor(0xC0, 0x00, 0x00)));
    Ok(())
}

#[tokio::test]
async fn test_failurePolicyOmit_shouldLeaveFailedParagraphAlone() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_docx(temp_dir.path(), "in.docx", &["One", "Two"])?;
    let output = temp_dir.path().join("out.docx");
    let options = PipelineOptions {
        failure_policy: FailurePolicy::Omit,
        ..Default::default()
    };

    let (result, _) = run_pipeline(Arc::new(FlakyTranslator::failing_on(&[1])), options, &input, &output).await;
    assert_eq!(result?.failed, 1);
    assert_eq!(common::read_paragraphs(&output)?, vec!["One", "[zh] Two", "Two"]);
    Ok(())
}

#[tokio::test]
async fn test_failurePolicyAbort_shouldFailWithoutWritingOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_docx(temp_dir.path(), "in.docx", &["One", "Two", "Three"])?;
    let output = temp_dir.path().join("out.docx");
    let translator = FlakyTranslator::failing_on(&[2]);
    let options = PipelineOptions {
        failure_policy: FailurePolicy::Abort,
        ..Default::default()
    };

    let (result, events) = run_pipeline(Arc::new(translator.clone()), options, &input, &output).await;

    assert!(matches!(result, Err(JobError::Paragraph { index: 2, .. })));
    assert_eq!(translator.calls(), 2);
    assert!(!output.exists());
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::Failed { stage: JobStage::Translating { current: 2, total: 3 }, .. })
    ));
    assert_eq!(events[events.len() - 2], ProgressEvent::StageChanged(JobStage::Failed));
    Ok(())
}

#[tokio::test]
async fn test_emptyTranslation_shouldStillInsertParagraph() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_docx(temp_dir.path(), "in.docx", &["One", "Two"])?;
    let output = temp_dir.path().join("out.docx");

    let (result, _) = run_pipeline(Arc::new(SilentTranslator), PipelineOptions::default(), &input, &output).await;
    assert_eq!(result?.translated, 2);
    assert_eq!(common::read_paragraphs(&output)?, vec!["", "One", "", "Two"]);
    Ok(())
}

#[tokio::test]
async fn test_tablesAndSectionProperties_shouldSurviveUntouched() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let body = concat!(
        r#"<w:p><w:r><w:t>Intro</w:t></w:r></w:p>"#,
        r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        r#"<w:p><w:r><w:t>Outro</w:t></w:r></w:p>"#,
        r#"<w:sectPr/>"#
    );
    let input = common::create_raw_docx(temp_dir.path(), "in.docx", body)?;
    let output = temp_dir.path().join("out.docx");

    let (result, _) = run_pipeline(Arc::new(IdentityTranslator::new()), PipelineOptions::default(), &input, &output).await;
    assert_eq!(result?.total, 2);

    let document = common::read_document(&output)?;
    let kinds: Vec<&str> = document
        .blocks()
        .iter()
        .map(|block| match block {
            Block::Paragraph(_) => "p",
            Block::Opaque(markup) if markup.starts_with("<w:tbl") => "tbl",
            Block::Opaque(_) => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["p", "p", "tbl", "p", "p", "other"]);
    assert!(common::read_zip_entry(&output, "word/styles.xml").is_ok());
    Ok(())
}

#[tokio::test]
async fn test_missingInput_shouldFailWhileLoading() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output = temp_dir.path().join("out.docx");

    let (result, events) = run_pipeline(
        Arc::new(IdentityTranslator::new()),
        PipelineOptions::default(),
        &temp_dir.path().join("missing.docx"),
        &output,
    )
    .await;

    assert!(matches!(result, Err(JobError::Document(_))));
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[..2],
        [
            ProgressEvent::StageChanged(JobStage::Loading),
            ProgressEvent::StageChanged(JobStage::Failed),
        ]
    );
    assert!(matches!(events.last(), Some(ProgressEvent::Failed { stage: JobStage::Loading, .. })));
    assert!(!output.exists());
    Ok(())
}

#[tokio::test]
async fn test_cancelledToken_shouldStopBeforeSaving() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_docx(temp_dir.path(), "in.docx", &["One", "Two"])?;
    let output = temp_dir.path().join("out.docx");
    let translator = IdentityTranslator::new();
    let pipeline = DocumentPipeline::new(
        Arc::new(DocxStore::new()),
        Arc::new(translator.clone()),
        PipelineOptions {
            request_delay: Duration::from_millis(5),
            ..Default::default()
        },
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    let (tx, _rx) = mpsc::unbounded_channel();
    let result = pipeline.run(&input, &output, &tx, &cancel).await;

    assert!(matches!(result, Err(JobError::Cancelled { completed: 0, total: 2 })));
    assert_eq!(translator.calls(), 0);
    assert!(!output.exists());
    Ok(())
}

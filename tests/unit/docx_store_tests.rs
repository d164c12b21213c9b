/*!
 * Tests for the .docx document store
 */

use anyhow::Result;
use yadtwai::document::{Block, DocumentStore, DocxStore, FontSize, Paragraph, RgbColor, RunStyle};
use yadtwai::errors::DocumentError;

use crate::common;

const BODY_WITH_TABLE: &str = concat!(
    r#"<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Annual report</w:t></w:r></w:p>"#,
    r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell text</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
    r#"<w:p><w:hyperlink r:id="rId5" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:r><w:t>Linked</w:t></w:r></w:hyperlink><w:r><w:t xml:space="preserve"> text</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:t xml:space="preserve">   </w:t></w:r></w:p>"#,
    r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>"#
);

#[test]
fn test_load_shouldExposeTopLevelParagraphsOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_raw_docx(temp_dir.path(), "report.docx", BODY_WITH_TABLE)?;

    let document = DocxStore::new().load(&path)?;
    assert_eq!(document.paragraph_texts(), vec!["Annual report", "Linked text", "   "]);
    assert_eq!(document.blocks().len(), 5);
    assert_eq!(document.translatable_positions(), vec![0, 2]);
    Ok(())
}

#[test]
fn test_save_shouldKeepOriginalMarkupAndOtherParts() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_raw_docx(temp_dir.path(), "report.docx", BODY_WITH_TABLE)?;
    let output = temp_dir.path().join("out.docx");

    let store = DocxStore::new();
    let mut document = store.load(&input)?;
    let style = RunStyle::new(RgbColor::DARK_BLUE, FontSize::from_points(10.5));
    document.insert_paragraph(0, Paragraph::styled("年度报告", style))?;
    store.save(&document, &output)?;

    let xml = common::read_zip_entry(&output, "word/document.xml")?;
    assert!(xml.contains(r#"<w:pStyle w:val="Title"/>"#));
    assert!(xml.contains("<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell text</w:t>"));
    assert!(xml.contains(r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>"#));
    assert!(xml.contains(r#"<w:color w:val="00008B"/>"#));
    assert!(xml.contains(r#"<w:sz w:val="21"/>"#));

    let styles = common::read_zip_entry(&output, "word/styles.xml")?;
    assert!(styles.contains("w:styles"));

    let reread = store.load(&output)?;
    assert_eq!(
        reread.paragraph_texts(),
        vec!["年度报告", "Annual report", "Linked text", "   "]
    );
    let Some(Block::Paragraph(first)) = reread.blocks().first() else {
        panic!("expected the inserted paragraph first");
    };
    assert_eq!(first.runs()[0].style, style);
    Ok(())
}

#[test]
fn test_load_withMissingFile_shouldReturnLoadError() {
    let result = DocxStore::new().load(std::path::Path::new("/nonexistent/report.docx"));
    assert!(matches!(result, Err(DocumentError::Load { .. })));
}

#[test]
fn test_load_withPlainTextFile_shouldReturnLoadError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "fake.docx", "just text")?;
    let result = DocxStore::new().load(&path);
    assert!(matches!(result, Err(DocumentError::Load { .. })));
    Ok(())
}

#[test]
fn test_save_intoMissingDirectory_shouldReturnSaveError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let document = yadtwai::Document::from_paragraph_texts(["Hello"]);
    let result = DocxStore::new().save(&document, &temp_dir.path().join("missing").join("out.docx"));
    assert!(matches!(result, Err(DocumentError::Save { .. })));
    Ok(())
}

fn entry_names(dir: &std::path::Path) -> Result<Vec<String>> {
    let mut names = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

#[test]
fn test_save_overNonEmptyDirectory_shouldFailWithoutLeftovers() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let target = temp_dir.path().join("out.docx");
    std::fs::create_dir(&target)?;
    common::create_test_file(&target, "keep.txt", "occupied")?;

    let document = yadtwai::Document::from_paragraph_texts(["Hello"]);
    let result = DocxStore::new().save(&document, &target);

    assert!(matches!(result, Err(DocumentError::Save { .. })));
    assert_eq!(entry_names(temp_dir.path())?, vec!["out.docx"]);
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn test_save_whenWriteFails_shouldRemovePartialFile() -> Result<()> {
    let full = std::path::Path::new("/dev/full");
    if !full.exists() {
        return Ok(());
    }
    let temp_dir = common::create_temp_dir()?;
    let target = temp_dir.path().join("out.docx");
    // the temporary file resolves to a device that rejects every write with ENOSPC
    std::os::unix::fs::symlink(full, temp_dir.path().join(".out.docx.part"))?;

    let document = yadtwai::Document::from_paragraph_texts(["Hello"]);
    let result = DocxStore::new().save(&document, &target);

    assert!(matches!(result, Err(DocumentError::Save { .. })));
    assert!(entry_names(temp_dir.path())?.is_empty());
    Ok(())
}

#[test]
fn test_save_withControlCharacters_shouldWriteWellFormedXml() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("out.docx");
    let style = RunStyle::new(RgbColor::DARK_BLUE, FontSize::from_points(10.5));

    let mut document = yadtwai::Document::from_paragraph_texts(["Hello"]);
    document.insert_paragraph(0, Paragraph::styled("Bon\u{1}jour\u{b}\u{8} à tous", style))?;
    DocxStore::new().save(&document, &path)?;

    let xml = common::read_zip_entry(&path, "word/document.xml")?;
    assert!(!xml.chars().any(|c| matches!(c, '\u{1}' | '\u{b}' | '\u{8}')));
    assert_eq!(common::read_paragraphs(&path)?, vec!["Bonjour à tous", "Hello"]);
    Ok(())
}

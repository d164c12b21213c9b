/*!
 * WordprocessingML (.docx) document store.
 *
 * Only `word/document.xml` is interpreted. Its body is split into top-level
 * blocks: paragraphs are parsed into runs, every other element is kept as
 * raw markup. All other package entries are copied through unchanged.
 */

use std::fmt;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use log::debug;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::errors::DocumentError;
use super::DocumentStore;
use super::model::{Block, Document, FontSize, Paragraph, RgbColor, Run, RunStyle};

/// Main document part inside the package
pub const DOCUMENT_PART: &str = "word/document.xml";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const BLANK_CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const BLANK_RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const BLANK_BODY_OPEN: &str =
    r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;

const BLANK_BODY_CLOSE: &str = "</w:body></w:document>";

// Paragraph descendants whose text is not part of the paragraph text, at run or paragraph level
const SKIPPED_ELEMENTS: &[&[u8]] = &[b"w:drawing", b"w:pict", b"w:object", b"mc:AlternateContent"];

struct PackageEntry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    is_dir: bool,
}

impl Clone for PackageEntry {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            data: self.data.clone(),
            compression: self.compression,
            is_dir: self.is_dir,
        }
    }
}

/// The zip container a document was read from.
///
/// Holds every entry verbatim plus the markup of `word/document.xml` that
/// surrounds the body content.
#[derive(Clone)]
pub struct Package {
    entries: Vec<PackageEntry>,
    head: String,
    tail: String,
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("entries", &self.entries.iter().map(|e| e.name.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

impl Package {
    /// Minimal package holding only the main document part
    pub fn blank() -> Self {
        let entry = |name: &str, data: &str| PackageEntry {
            name: name.to_string(),
            data: data.as_bytes().to_vec(),
            compression: CompressionMethod::Deflated,
            is_dir: false,
        };

        Self {
            entries: vec![
                entry("[Content_Types].xml", BLANK_CONTENT_TYPES),
                entry("_rels/.rels", BLANK_RELATIONSHIPS),
                entry(DOCUMENT_PART, ""),
            ],
            head: format!("{}\n{}", XML_DECLARATION, BLANK_BODY_OPEN),
            tail: BLANK_BODY_CLOSE.to_string(),
        }
    }

    /// Names of all entries, in archive order
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    fn read(bytes: &[u8]) -> Result<(Self, String), String> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("not a valid .docx package: {}", e))?;

        let mut entries = Vec::with_capacity(archive.len());
        let mut document_xml = None;

        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| format!("failed to read zip entry: {}", e))?;
            let name = file.name().to_string();
            let compression = file.compression();
            let is_dir = file.is_dir();

            let mut data = Vec::new();
            if !is_dir {
                file.read_to_end(&mut data)
                    .map_err(|e| format!("failed to read zip entry {}: {}", name, e))?;
            }

            if name == DOCUMENT_PART {
                let xml = String::from_utf8(data)
                    .map_err(|e| format!("{} is not valid UTF-8: {}", DOCUMENT_PART, e))?;
                document_xml = Some(xml);
                data = Vec::new();
            }

            entries.push(PackageEntry {
                name,
                data,
                compression,
                is_dir,
            });
        }

        let document_xml = document_xml.ok_or_else(|| format!("package has no {}", DOCUMENT_PART))?;
        Ok((
            Self {
                entries,
                head: String::new(),
                tail: String::new(),
            },
            document_xml,
        ))
    }

    fn write(&self, document_xml: &str) -> Result<Vec<u8>, String> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            let method = match entry.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = FileOptions::default().compression_method(method);

            if entry.is_dir {
                writer
                    .add_directory(entry.name.as_str(), options)
                    .map_err(|e| format!("failed to write zip directory: {}", e))?;
                continue;
            }

            let data = if entry.name == DOCUMENT_PART {
                document_xml.as_bytes()
            } else {
                entry.data.as_slice()
            };

            writer
                .start_file(entry.name.as_str(), options)
                .map_err(|e| format!("failed to write zip entry: {}", e))?;
            writer
                .write_all(data)
                .map_err(|e| format!("failed to write zip content: {}", e))?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| format!("failed to finalize zip output: {}", e))?;
        Ok(cursor.into_inner())
    }
}

/// Reads and writes `.docx` files
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxStore;

impl DocxStore {
    /// Create a store
    pub fn new() -> Self {
        Self
    }

    /// Parse a document from the bytes of a `.docx` file
    pub fn from_bytes(bytes: &[u8]) -> Result<Document, String> {
        let (mut package, xml) = Package::read(bytes)?;
        let parsed = parse_document_xml(&xml).map_err(|e| e.to_string())?;
        package.head = parsed.head;
        package.tail = parsed.tail;
        Ok(Document::with_package(parsed.body, package))
    }

    /// Serialize a document into the bytes of a `.docx` file
    pub fn to_bytes(document: &Document) -> Result<Vec<u8>, String> {
        let blank;
        let package = match document.package() {
            Some(package) => package,
            None => {
                blank = Package::blank();
                &blank
            }
        };

        let mut xml = String::with_capacity(package.head.len() + package.tail.len() + 1024);
        xml.push_str(&package.head);
        for block in document.blocks() {
            match block {
                Block::Paragraph(paragraph) => xml.push_str(&paragraph_xml(paragraph)),
                Block::Opaque(markup) => xml.push_str(markup),
            }
        }
        xml.push_str(&package.tail);

        package.write(&xml)
    }
}

impl DocumentStore for DocxStore {
    fn load(&self, path: &Path) -> Result<Document, DocumentError> {
        let load_error = |message: String| DocumentError::Load {
            path: path.to_path_buf(),
            message,
        };

        let bytes = fs::read(path).map_err(|e| load_error(e.to_string()))?;
        let document = Self::from_bytes(&bytes).map_err(load_error)?;
        debug!(
            "Loaded {} ({} blocks, {} paragraphs)",
            path.display(),
            document.blocks().len(),
            document.paragraph_count()
        );
        Ok(document)
    }

    fn save(&self, document: &Document, path: &Path) -> Result<(), DocumentError> {
        let save_error = |message: String| DocumentError::Save {
            path: path.to_path_buf(),
            message,
        };

        let bytes = Self::to_bytes(document).map_err(save_error)?;

        // Write next to the target and rename so a failed write never leaves a truncated file
        let file_name = path
            .file_name()
            .ok_or_else(|| save_error("output path has no file name".to_string()))?;
        let partial = path.with_file_name(format!(".{}.part", file_name.to_string_lossy()));

        if let Err(e) = fs::write(&partial, &bytes) {
            let _ = fs::remove_file(&partial);
            return Err(save_error(e.to_string()));
        }
        if let Err(e) = fs::rename(&partial, path) {
            let _ = fs::remove_file(&partial);
            return Err(save_error(e.to_string()));
        }

        debug!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

struct ParsedBody {
    head: String,
    body: Vec<Block>,
    tail: String,
}

fn malformed(e: impl fmt::Display) -> DocumentError {
    DocumentError::Malformed(e.to_string())
}

// Start of the tag that ends at `end`. Attribute values cannot contain '<'.
fn tag_start(xml: &str, end: usize) -> usize {
    xml[..end].rfind('<').unwrap_or(0)
}

fn parse_document_xml(xml: &str) -> Result<ParsedBody, DocumentError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut head = None;
    let mut body = Vec::new();

    loop {
        let event = reader.read_event().map_err(malformed)?;
        let end = reader.buffer_position();

        match event {
            Event::Start(e) if head.is_none() => {
                if e.name().as_ref() == b"w:body" {
                    head = Some(xml[..end].to_string());
                }
            }
            Event::Empty(e) if head.is_none() => {
                if e.name().as_ref() == b"w:body" {
                    let start = tag_start(xml, end);
                    return Ok(ParsedBody {
                        head: format!("{}<w:body>", &xml[..start]),
                        body,
                        tail: format!("</w:body>{}", &xml[end..]),
                    });
                }
            }
            Event::Start(e) => {
                let start = tag_start(xml, end);
                let name = e.name().as_ref().to_vec();
                reader.read_to_end(QName(&name)).map_err(malformed)?;
                let raw = &xml[start..reader.buffer_position()];
                body.push(body_block(&name, raw)?);
            }
            Event::Empty(e) => {
                let start = tag_start(xml, end);
                let raw = &xml[start..end];
                body.push(body_block(e.name().as_ref(), raw)?);
            }
            Event::End(e) if head.is_some() && e.name().as_ref() == b"w:body" => {
                let start = tag_start(xml, end);
                return Ok(ParsedBody {
                    head: head.unwrap_or_default(),
                    body,
                    tail: xml[start..].to_string(),
                });
            }
            Event::Eof => {
                return Err(DocumentError::Malformed(format!("{} has no w:body element", DOCUMENT_PART)));
            }
            _ => {}
        }
    }
}

fn body_block(name: &[u8], raw: &str) -> Result<Block, DocumentError> {
    if name == b"w:p" {
        let runs = parse_paragraph_runs(raw)?;
        Ok(Block::Paragraph(Paragraph::from_source(runs, raw.to_string())))
    } else {
        Ok(Block::Opaque(raw.to_string()))
    }
}

fn attribute_value(e: &BytesStart, key: &str) -> Option<String> {
    e.try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

fn apply_style(e: &BytesStart, style: &mut RunStyle) {
    match e.name().as_ref() {
        b"w:color" => {
            style.color = attribute_value(e, "w:val").and_then(|v| RgbColor::from_hex(&v).ok());
        }
        b"w:sz" => {
            style.size = attribute_value(e, "w:val")
                .and_then(|v| v.parse::<u32>().ok())
                .map(FontSize::from_half_points);
        }
        _ => {}
    }
}

fn parse_paragraph_runs(raw: &str) -> Result<Vec<Run>, DocumentError> {
    let mut reader = Reader::from_str(raw);
    reader.trim_text(false);

    let mut runs = Vec::new();
    let mut current: Option<Run> = None;
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"w:pPr" => {
                        reader.read_to_end(QName(&name)).map_err(malformed)?;
                    }
                    b"w:r" => {
                        current = Some(Run {
                            text: String::new(),
                            style: RunStyle::default(),
                        });
                    }
                    b"w:t" if current.is_some() => in_text = true,
                    n if SKIPPED_ELEMENTS.contains(&n) => {
                        reader.read_to_end(QName(&name)).map_err(malformed)?;
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if let Some(run) = current.as_mut() {
                    match e.name().as_ref() {
                        b"w:tab" => run.text.push('\t'),
                        b"w:br" | b"w:cr" => run.text.push('\n'),
                        _ => apply_style(&e, &mut run.style),
                    }
                }
            }
            Event::Text(t) if in_text => {
                if let Some(run) = current.as_mut() {
                    run.text.push_str(&t.unescape().map_err(malformed)?);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:r" => {
                    if let Some(run) = current.take() {
                        runs.push(run);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(runs)
}

/// Characters allowed by the XML 1.0 `Char` production
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

fn run_content_xml(text: &str) -> String {
    let text: String = text.chars().filter(|&c| is_xml_char(c)).collect();
    let mut xml = String::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            xml.push_str("<w:br/>");
        }
        for (j, segment) in line.split('\t').enumerate() {
            if j > 0 {
                xml.push_str("<w:tab/>");
            }
            if !segment.is_empty() {
                xml.push_str(r#"<w:t xml:space="preserve">"#);
                xml.push_str(&escape(segment));
                xml.push_str("</w:t>");
            }
        }
    }
    xml
}

fn run_xml(run: &Run) -> String {
    let mut xml = String::from("<w:r>");
    if run.style != RunStyle::default() {
        xml.push_str("<w:rPr>");
        if let Some(color) = run.style.color {
            xml.push_str(&format!(r#"<w:color w:val="{}"/>"#, color.to_hex()));
        }
        if let Some(size) = run.style.size {
            let half_points = size.half_points();
            xml.push_str(&format!(r#"<w:sz w:val="{0}"/><w:szCs w:val="{0}"/>"#, half_points));
        }
        xml.push_str("</w:rPr>");
    }
    xml.push_str(&run_content_xml(&run.text));
    xml.push_str("</w:r>");
    xml
}

/// Markup for a paragraph: the original markup when it was read from a file
fn paragraph_xml(paragraph: &Paragraph) -> String {
    if let Some(source) = paragraph.source() {
        return source.to_string();
    }

    let mut xml = String::from("<w:p>");
    for run in paragraph.runs() {
        xml.push_str(&run_xml(run));
    }
    xml.push_str("</w:p>");
    xml
}

/*!
 * Format-neutral document model.
 *
 * A document is an ordered body of blocks. Paragraph blocks expose their text
 * runs and run styles; everything else (tables, section properties) is carried
 * as opaque markup and written back untouched.
 */

use std::fmt;

use crate::errors::DocumentError;
use super::docx::Package;

/// 24-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor(pub u8, pub u8, pub u8);

impl RgbColor {
    /// Dark blue used for translations
    pub const DARK_BLUE: RgbColor = RgbColor(0x00, 0x00, 0x8B);

    /// Parse `RRGGBB` (an optional leading `#` is accepted)
    pub fn from_hex(value: &str) -> Result<Self, DocumentError> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DocumentError::Malformed(format!("invalid colour '{}'", value)));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
        match (channel(0), channel(2), channel(4)) {
            (Ok(r), Ok(g), Ok(b)) => Ok(Self(r, g, b)),
            _ => Err(DocumentError::Malformed(format!("invalid colour '{}'", value))),
        }
    }

    /// Uppercase `RRGGBB`, as WordprocessingML expects
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

/// Font size, stored in half-points like the file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontSize {
    half_points: u32,
}

impl FontSize {
    /// Size from points, rounded to the nearest half point
    pub fn from_points(points: f32) -> Self {
        Self {
            half_points: (points * 2.0).round().max(1.0) as u32,
        }
    }

    /// Size from half-points
    pub fn from_half_points(half_points: u32) -> Self {
        Self { half_points }
    }

    /// Size in half-points
    pub fn half_points(&self) -> u32 {
        self.half_points
    }

    /// Size in points
    pub fn points(&self) -> f32 {
        self.half_points as f32 / 2.0
    }
}

/// Character formatting the pipeline reads and writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStyle {
    /// Text colour
    pub color: Option<RgbColor>,
    /// Font size
    pub size: Option<FontSize>,
}

impl RunStyle {
    /// Style with both colour and size set
    pub fn new(color: RgbColor, size: FontSize) -> Self {
        Self {
            color: Some(color),
            size: Some(size),
        }
    }
}

/// A run of text sharing one style
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    /// Text, with `\t` for tabs and `\n` for line breaks
    pub text: String,
    /// Run formatting
    pub style: RunStyle,
}

/// A paragraph: zero or more runs
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paragraph {
    runs: Vec<Run>,
    /// Markup this paragraph was read from; written back verbatim
    source: Option<String>,
}

impl Paragraph {
    /// Paragraph holding a single styled run
    pub fn styled(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            runs: vec![Run {
                text: text.into(),
                style,
            }],
            source: None,
        }
    }

    /// Paragraph holding a single unstyled run
    pub fn plain(text: impl Into<String>) -> Self {
        Self::styled(text, RunStyle::default())
    }

    /// Paragraph read from existing markup
    pub(crate) fn from_source(runs: Vec<Run>, source: String) -> Self {
        Self {
            runs,
            source: Some(source),
        }
    }

    /// Runs of this paragraph
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Original markup, for paragraphs read from a file
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Concatenated text of all runs
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    /// True when the text is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.runs.iter().all(|run| run.text.trim().is_empty())
    }
}

/// One element of the document body
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// A paragraph
    Paragraph(Paragraph),
    /// Any other body content, kept as raw markup
    Opaque(String),
}

/// A loaded document
#[derive(Debug, Clone, Default)]
pub struct Document {
    body: Vec<Block>,
    /// Container the document was read from, if any
    package: Option<Package>,
}

impl Document {
    /// Empty document without a container
    pub fn new() -> Self {
        Self::default()
    }

    /// Document with one plain paragraph per text
    pub fn from_paragraph_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            body: texts.into_iter().map(|t| Block::Paragraph(Paragraph::plain(t))).collect(),
            package: None,
        }
    }

    pub(crate) fn with_package(body: Vec<Block>, package: Package) -> Self {
        Self {
            body,
            package: Some(package),
        }
    }

    pub(crate) fn package(&self) -> Option<&Package> {
        self.package.as_ref()
    }

    /// Body blocks in document order
    pub fn blocks(&self) -> &[Block] {
        &self.body
    }

    /// Append a block at the end of the body
    pub fn push(&mut self, block: Block) {
        self.body.push(block);
    }

    /// Paragraphs in document order
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.body.iter().filter_map(|block| match block {
            Block::Paragraph(p) => Some(p),
            Block::Opaque(_) => None,
        })
    }

    /// Number of paragraphs
    pub fn paragraph_count(&self) -> usize {
        self.paragraphs().count()
    }

    /// Text of every paragraph, in order
    pub fn paragraph_texts(&self) -> Vec<String> {
        self.paragraphs().map(Paragraph::text).collect()
    }

    /// Paragraph at a body position
    pub fn paragraph_at(&self, position: usize) -> Option<&Paragraph> {
        match self.body.get(position) {
            Some(Block::Paragraph(p)) => Some(p),
            _ => None,
        }
    }

    /// Body positions of paragraphs with non-blank text, in order
    pub fn translatable_positions(&self) -> Vec<usize> {
        self.body
            .iter()
            .enumerate()
            .filter_map(|(i, block)| match block {
                Block::Paragraph(p) if !p.is_blank() => Some(i),
                _ => None,
            })
            .collect()
    }

    /// Insert a paragraph at a body position, shifting later blocks
    pub fn insert_paragraph(&mut self, position: usize, paragraph: Paragraph) -> Result<(), DocumentError> {
        if position > self.body.len() {
            return Err(DocumentError::Malformed(format!(
                "insert position {} is past the end of the body ({} blocks)",
                position,
                self.body.len()
            )));
        }
        self.body.insert(position, Block::Paragraph(paragraph));
        Ok(())
    }
}

//! Layout elements produced by the section generators.
//!
//! The types in this module describe the logical content of the report without
//! referencing `genpdf`.  Generators build them, the composer concatenates
//! them, and [`crate::render`] maps them onto `genpdf` elements.  Matching on
//! [`LayoutElement`] is always exhaustive so adding a new kind forces every
//! consumer (metadata extraction, the degraded-render filter, scratch cleanup)
//! to decide how to handle it.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::registry::SectionId;

const MM_PER_POINT: f64 = 25.4 / 72.0;

/// Prefix of the paragraph that states the snapshot date of a section.
pub const AS_OF_PREFIX: &str = "Fecha: ";

/// Visual weight of a heading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HeadingLevel {
    /// Large title used on the cover page.
    Cover,
    /// Regular section heading.
    #[default]
    Section,
}

/// A heading line.
#[derive(Clone, Debug, PartialEq)]
pub struct Heading {
    text: String,
    level: HeadingLevel,
}

impl Heading {
    /// Creates a section heading.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: HeadingLevel::Section,
        }
    }

    /// Creates a cover title.
    pub fn cover(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: HeadingLevel::Cover,
        }
    }

    /// Returns the heading text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the heading level.
    pub fn level(&self) -> HeadingLevel {
        self.level
    }
}

/// What a paragraph means to the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub enum ParagraphRole {
    /// Ordinary text.
    Body,
    /// Larger introductory text.
    Lead,
    /// States the as-of date of the figures in the section.
    AsOf(String),
    /// Informational notice, e.g. "no data available".
    Notice,
    /// Replaces a section whose generator failed.
    Failure {
        /// Section that failed.
        section: SectionId,
        /// Failure description.
        reason: String,
    },
}

/// A paragraph of text with a role.
#[derive(Clone, Debug, PartialEq)]
pub struct Paragraph {
    text: String,
    role: ParagraphRole,
}

impl Paragraph {
    /// Creates a body paragraph.
    pub fn body(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: ParagraphRole::Body,
        }
    }

    /// Creates a lead paragraph.
    pub fn lead(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: ParagraphRole::Lead,
        }
    }

    /// Creates the paragraph that states the as-of date.
    pub fn as_of(date: NaiveDate) -> Self {
        let value = date.format("%Y-%m-%d").to_string();
        Self {
            text: format!("{AS_OF_PREFIX}{value}"),
            role: ParagraphRole::AsOf(value),
        }
    }

    /// Creates a notice paragraph.
    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: ParagraphRole::Notice,
        }
    }

    /// Creates the placeholder for a failed section.
    pub fn failure(section: SectionId, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            text: format!("Error in {}: {}", section.title(), reason),
            role: ParagraphRole::Failure { section, reason },
        }
    }

    /// Returns the paragraph text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the paragraph role.
    pub fn role(&self) -> &ParagraphRole {
        &self.role
    }
}

/// A table with a header row and fixed relative column widths.
#[derive(Clone, Debug, PartialEq)]
pub struct TableBlock {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    column_widths: Vec<usize>,
    repeat_header: bool,
    font_size: u8,
}

impl TableBlock {
    /// Default font size for table cells.
    pub const DEFAULT_FONT_SIZE: u8 = 8;

    /// Creates an empty table with the given header and column widths.
    ///
    /// The header is repeated on every page the table spans.
    pub fn new<H, S>(header: H, column_widths: impl Into<Vec<usize>>) -> Self
    where
        H: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            column_widths: column_widths.into(),
            repeat_header: true,
            font_size: Self::DEFAULT_FONT_SIZE,
        }
    }

    /// Appends a row and returns the updated table.
    pub fn with_row(mut self, row: Vec<String>) -> Self {
        self.rows.push(row);
        self
    }

    /// Appends several rows and returns the updated table.
    pub fn with_rows<I>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        self.rows.extend(rows);
        self
    }

    /// Sets whether the header repeats after page breaks.
    pub fn with_repeat_header(mut self, repeat_header: bool) -> Self {
        self.repeat_header = repeat_header;
        self
    }

    /// Sets the cell font size.
    pub fn with_font_size(mut self, font_size: u8) -> Self {
        self.font_size = font_size;
        self
    }

    /// Returns the header cells.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Returns the body rows.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Returns the relative column widths.
    pub fn column_widths(&self) -> &[usize] {
        &self.column_widths
    }

    /// Returns whether the header repeats after page breaks.
    pub fn repeat_header(&self) -> bool {
        self.repeat_header
    }

    /// Returns the cell font size.
    pub fn font_size(&self) -> u8 {
        self.font_size
    }
}

/// An image stored on scratch storage.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBlock {
    path: PathBuf,
    caption: Option<String>,
    width_mm: Option<f64>,
}

impl ImageBlock {
    /// Creates an image block referencing the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            caption: None,
            width_mm: None,
        }
    }

    /// Sets the caption and returns the updated block.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Constrains the rendered width in millimetres.
    pub fn with_width_mm(mut self, width_mm: f64) -> Self {
        self.width_mm = Some(width_mm);
        self
    }

    /// Returns the image path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the caption, if any.
    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    /// Returns the requested width, if any.
    pub fn width_mm(&self) -> Option<f64> {
        self.width_mm
    }
}

/// Vertical whitespace.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spacer {
    height_mm: f64,
}

impl Spacer {
    /// Creates a spacer from a height in typographic points.
    pub fn points(points: f64) -> Self {
        Self {
            height_mm: points * MM_PER_POINT,
        }
    }

    /// Returns the height in millimetres.
    pub fn height_mm(&self) -> f64 {
        self.height_mm
    }
}

/// A single element of the report stream.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutElement {
    /// Heading line.
    Heading(Heading),
    /// Paragraph of text.
    Paragraph(Paragraph),
    /// Data table.
    Table(TableBlock),
    /// Single image.
    Image(ImageBlock),
    /// Images placed side by side.
    ImageRow(Vec<ImageBlock>),
    /// Forced page break.
    PageBreak,
    /// Vertical whitespace.
    Spacer(Spacer),
}

impl LayoutElement {
    /// Shorthand for a section heading.
    pub fn heading(text: impl Into<String>) -> Self {
        Self::Heading(Heading::new(text))
    }

    /// Shorthand for a body paragraph.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::Paragraph(Paragraph::body(text))
    }

    /// Shorthand for a notice paragraph.
    pub fn notice(text: impl Into<String>) -> Self {
        Self::Paragraph(Paragraph::notice(text))
    }

    /// Shorthand for the as-of paragraph.
    pub fn as_of(date: NaiveDate) -> Self {
        Self::Paragraph(Paragraph::as_of(date))
    }

    /// Shorthand for a spacer measured in points.
    pub fn spacer(points: f64) -> Self {
        Self::Spacer(Spacer::points(points))
    }

    /// Returns the short kind name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Heading(_) => "Heading",
            Self::Paragraph(_) => "Paragraph",
            Self::Table(_) => "Table",
            Self::Image(_) => "Image",
            Self::ImageRow(_) => "ImageRow",
            Self::PageBreak => "PageBreak",
            Self::Spacer(_) => "Spacer",
        }
    }

    /// Whether the element survives the degraded render.
    ///
    /// Composite image rows are the only layout the fallback drops.
    pub fn is_render_safe(&self) -> bool {
        match self {
            Self::Heading(_)
            | Self::Paragraph(_)
            | Self::Table(_)
            | Self::Image(_)
            | Self::PageBreak
            | Self::Spacer(_) => true,
            Self::ImageRow(_) => false,
        }
    }

    /// Returns the as-of date stated by this element, if any.
    pub fn as_of_marker(&self) -> Option<&str> {
        match self {
            Self::Paragraph(paragraph) => match paragraph.role() {
                ParagraphRole::AsOf(value) => Some(value),
                ParagraphRole::Body
                | ParagraphRole::Lead
                | ParagraphRole::Notice
                | ParagraphRole::Failure { .. } => None,
            },
            Self::Heading(_)
            | Self::Table(_)
            | Self::Image(_)
            | Self::ImageRow(_)
            | Self::PageBreak
            | Self::Spacer(_) => None,
        }
    }

    /// Returns the scratch files referenced by this element.
    pub fn scratch_files(&self) -> Vec<&Path> {
        match self {
            Self::Image(image) => vec![image.path()],
            Self::ImageRow(images) => images.iter().map(ImageBlock::path).collect(),
            Self::Heading(_) | Self::Paragraph(_) | Self::Table(_) | Self::PageBreak | Self::Spacer(_) => {
                Vec::new()
            }
        }
    }
}

//! PDF rendering of a composed [`Document`].
//!
//! [`PdfRenderer`] maps every [`LayoutElement`] onto a `genpdf` element, lays
//! the pages out with a logo header and a page-numbered footer, and writes the
//! result next to the target path before renaming it into place.  A render
//! that fails at any step leaves no output file behind.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::NaiveDate;
use genpdf::elements::{PageBreak, Paragraph, TableLayout};
use genpdf::style::{Color, Style};
use genpdf::{Alignment, Element, Margins, PaperSize};
use log::{debug, info};

use crate::builder::DocumentBuilder;
use crate::document::Document;
use crate::elements::{
    decode_image_from_path, opaque, CaptionedImage, HeaderedTable, PageHeader, SectionMarker,
    SectionPages, VerticalSpace,
};
use crate::fonts::{self, AssetPaths};
use crate::layout::{HeadingLevel, ImageBlock, LayoutElement, ParagraphRole};

const BODY_FONT_SIZE: u8 = 10;
const FOOTER_HEIGHT_MM: f64 = 8.0;
const LOGO_WIDTH_MM: f64 = 35.0;

/// Errors raised while rendering or writing the PDF.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The font files could not be loaded.
    #[error("cannot load report fonts: {0}")]
    Fonts(#[source] genpdf::error::Error),
    /// A static asset such as the logo could not be read.
    #[error("cannot load asset {}: {source}", path.display())]
    Asset {
        /// Asset file.
        path: PathBuf,
        /// Decoding error.
        #[source]
        source: genpdf::error::Error,
    },
    /// An element could not be built or laid out.
    #[error("cannot lay out document: {0}")]
    Layout(#[from] genpdf::error::Error),
    /// The PDF file could not be written.
    #[error("cannot write {}: {source}", path.display())]
    Write {
        /// Target file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The outline could not be added.
    #[cfg(feature = "bookmarks")]
    #[error("cannot add bookmarks: {0}")]
    Bookmarks(#[from] crate::bookmarks::BookmarkError),
}

/// Turns a document into an output file.
pub trait DocumentRenderer {
    /// Renders `document` to `output`, replacing any existing file.
    fn render(&self, document: &Document, output: &Path) -> Result<(), RenderError>;
}

/// [`DocumentRenderer`] producing Letter-sized PDFs with `genpdf`.
#[derive(Clone, Debug)]
pub struct PdfRenderer {
    assets: AssetPaths,
    header_title: String,
    generated_by: String,
    generated_on: NaiveDate,
    bookmarks: bool,
}

impl PdfRenderer {
    /// Creates a renderer reading fonts and logo from `assets`.
    pub fn new(assets: AssetPaths, header_title: impl Into<String>, generated_on: NaiveDate) -> Self {
        Self {
            assets,
            header_title: header_title.into(),
            generated_by: "Outlier".to_string(),
            generated_on,
            bookmarks: false,
        }
    }

    /// Sets the author named in the footer.
    pub fn with_generated_by(mut self, generated_by: impl Into<String>) -> Self {
        self.generated_by = generated_by.into();
        self
    }

    /// Adds a PDF outline entry per section. Requires the `bookmarks` feature.
    pub fn with_bookmarks(mut self, bookmarks: bool) -> Self {
        self.bookmarks = bookmarks;
        self
    }

    /// Renders `document` into PDF bytes.
    pub fn render_bytes(&self, document: &Document) -> Result<Vec<u8>, RenderError> {
        let font_family = fonts::load_font_family(&self.assets).map_err(RenderError::Fonts)?;
        let logo = decode_image_from_path(&self.assets.logo).map_err(|source| {
            RenderError::Asset {
                path: self.assets.logo.clone(),
                source,
            }
        })?;
        let logo = Rc::new(opaque(logo));

        let page = Rc::new(Cell::new(0));
        let header_text = format!(
            "{}. Información al: {}",
            self.header_title,
            document.metadata().as_of().unwrap_or("N/A")
        );
        let generated_by = self.generated_by.clone();
        let generated_on = self.generated_on.format("%Y-%m-%d").to_string();

        let mut pdf = DocumentBuilder::new()
            .with_title(self.header_title.clone())
            .with_paper_size(PaperSize::Letter)
            .with_margins(Margins::trbl(8, 11, 6, 11))
            .with_page_counter(Rc::clone(&page))
            .with_first_page_frame(true)
            .with_header(move |_| {
                PageHeader::new(Some(Rc::clone(&logo)), LOGO_WIDTH_MM, header_text.clone())
            })
            .with_footer(FOOTER_HEIGHT_MM, move |page| {
                Paragraph::new(format!(
                    "Generado por {}. Fecha:{} - Página {}",
                    generated_by, generated_on, page
                ))
            })
            .build(font_family)?;
        pdf.set_font_size(BODY_FONT_SIZE);

        let section_pages = SectionPages::new(document.sections().len());
        let last_section = document.sections().len().saturating_sub(1);
        for (index, section) in document.sections().iter().enumerate() {
            pdf.push(SectionMarker::new(index, Rc::clone(&page), section_pages.clone()));
            let mut elements = section.elements();
            if index == last_section {
                if let Some((LayoutElement::PageBreak, rest)) = elements.split_last() {
                    elements = rest;
                }
            }
            for element in elements {
                pdf.push(to_element(element)?);
            }
        }

        let mut bytes = Vec::new();
        pdf.render(&mut bytes)?;
        debug!("Rendered {} pages ({} bytes)", page.get(), bytes.len());

        self.finish(bytes, document, section_pages.snapshot())
    }

    #[cfg(feature = "bookmarks")]
    fn finish(
        &self,
        bytes: Vec<u8>,
        document: &Document,
        pages: Vec<Option<usize>>,
    ) -> Result<Vec<u8>, RenderError> {
        use crate::bookmarks::{apply_outline, OutlineTarget};

        if !self.bookmarks {
            return Ok(bytes);
        }
        let targets: Vec<OutlineTarget> = document
            .sections()
            .iter()
            .zip(pages)
            .map(|(section, page)| OutlineTarget {
                title: section.title().to_string(),
                page,
            })
            .collect();
        Ok(apply_outline(&bytes, &targets)?)
    }

    #[cfg(not(feature = "bookmarks"))]
    fn finish(
        &self,
        bytes: Vec<u8>,
        _document: &Document,
        _pages: Vec<Option<usize>>,
    ) -> Result<Vec<u8>, RenderError> {
        if self.bookmarks {
            log::warn!("Bookmarks requested but the `bookmarks` feature is disabled");
        }
        Ok(bytes)
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, document: &Document, output: &Path) -> Result<(), RenderError> {
        let bytes = self.render_bytes(document)?;
        write_atomically(output, &bytes)?;
        info!("Wrote {} ({} bytes)", output.display(), bytes.len());
        Ok(())
    }
}

/// Writes `bytes` to a sibling `.part` file and renames it onto `output`.
pub fn write_atomically(output: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    let write_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| RenderError::Write { path, source }
    };

    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error(parent))?;
    }

    let mut partial = output.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    fs::write(&partial, bytes).map_err(write_error(&partial))?;
    if let Err(source) = fs::rename(&partial, output) {
        let _ = fs::remove_file(&partial);
        return Err(RenderError::Write {
            path: output.to_path_buf(),
            source,
        });
    }
    Ok(())
}

fn captioned(image: &ImageBlock) -> Result<CaptionedImage, RenderError> {
    let mut element = CaptionedImage::from_path(image.path())
        .map_err(|source| RenderError::Asset {
            path: image.path().to_path_buf(),
            source,
        })?
        .with_width(image.width_mm().map(crate::elements::mm_from_f64));
    if let Some(caption) = image.caption() {
        element = element.with_caption(caption);
    }
    Ok(element)
}

/// Lets a boxed element be pushed onto a `genpdf::Document`.
struct DynElement(Box<dyn Element>);

impl Element for DynElement {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: genpdf::render::Area<'_>,
        style: Style,
    ) -> Result<genpdf::RenderResult, genpdf::error::Error> {
        self.0.render(context, area, style)
    }
}

fn to_element(element: &LayoutElement) -> Result<DynElement, RenderError> {
    let converted: Box<dyn Element> = match element {
        LayoutElement::Heading(heading) => {
            let mut paragraph = Paragraph::new(heading.text());
            match heading.level() {
                HeadingLevel::Cover => {
                    paragraph.set_alignment(Alignment::Center);
                    Box::new(paragraph.styled(Style::new().bold().with_font_size(24)))
                }
                HeadingLevel::Section => {
                    Box::new(paragraph.styled(Style::new().bold().with_font_size(13)))
                }
            }
        }
        LayoutElement::Paragraph(paragraph) => {
            let mut text = Paragraph::new(paragraph.text());
            match paragraph.role() {
                ParagraphRole::Lead => {
                    text.set_alignment(Alignment::Center);
                    Box::new(text.styled(Style::new().with_font_size(14)))
                }
                ParagraphRole::Failure { .. } => {
                    Box::new(text.styled(Style::new().with_color(Color::Rgb(170, 20, 20))))
                }
                ParagraphRole::Body | ParagraphRole::AsOf(_) | ParagraphRole::Notice => {
                    Box::new(text)
                }
            }
        }
        LayoutElement::Table(table) => Box::new(HeaderedTable::new(
            table.header(),
            table.column_widths(),
            table.rows(),
            table.font_size(),
            table.repeat_header(),
        )?),
        LayoutElement::Image(image) => Box::new(captioned(image)?),
        LayoutElement::ImageRow(images) => {
            let mut row_layout = TableLayout::new(vec![1; images.len().max(1)]);
            let mut row = row_layout.row();
            for image in images {
                row.push_element(captioned(image)?);
            }
            row.push()?;
            Box::new(row_layout)
        }
        LayoutElement::PageBreak => Box::new(PageBreak::new()),
        LayoutElement::Spacer(spacer) => Box::new(VerticalSpace::new(spacer.height_mm())),
    };
    Ok(DynElement(converted))
}

//! Custom `genpdf` elements used by the PDF renderer.
//!
//! `genpdf` ships paragraphs, images and tables but no table whose header
//! repeats after a page break, no fixed vertical gap and no way to learn on
//! which page an element landed.  This module fills those gaps and adds the
//! image helpers shared by chart embedding and the page header logo.

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;

use image::GenericImageView;

use genpdf::elements::{FrameCellDecorator, Image, Paragraph, TableLayout};
use genpdf::error::{Context as _, Error, ErrorKind};
use genpdf::style::Style;
use genpdf::{render, Alignment, Element, Margins, Mm, Position, RenderResult, Scale, Size};

const DEFAULT_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;
const DEFAULT_CAPTION_SPACING_MM: f64 = 2.0;
const CELL_PADDING_MM: f64 = 0.6;

pub(crate) fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

fn estimated_image_size(image: &image::DynamicImage, dpi: f64) -> Size {
    let (px_width, px_height) = image.dimensions();
    let width_mm = MM_PER_INCH * (px_width as f64) / dpi;
    let height_mm = MM_PER_INCH * (px_height as f64) / dpi;
    Size::new(mm_from_f64(width_mm), mm_from_f64(height_mm))
}

/// Loads an image from the given path using the [`image`] crate with descriptive errors.
pub fn decode_image_from_path(path: impl AsRef<Path>) -> Result<image::DynamicImage, Error> {
    let path = path.as_ref();
    let reader = image::io::Reader::open(path)
        .with_context(|| format!("Failed to open image file {}", path.display()))?;
    reader
        .with_guessed_format()
        .context("Unable to determine image format")?
        .decode()
        .with_context(|| format!("Failed to decode image file {}", path.display()))
}

/// Drops any alpha channel, which the PDF backend cannot embed.
pub fn opaque(image: image::DynamicImage) -> image::DynamicImage {
    match image {
        image::DynamicImage::ImageRgb8(_) => image,
        other => image::DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

fn image_from_dynamic(image: image::DynamicImage) -> Result<(Image, Size), Error> {
    let image = opaque(image);
    let size = estimated_image_size(&image, DEFAULT_IMAGE_DPI);
    let image = Image::from_dynamic_image(image)?;
    Ok((image, size))
}

fn scale_to_width(image: &mut Image, natural: Size, width: Option<Mm>) {
    let natural = mm_to_f64(natural.width);
    match width {
        Some(width) if natural > f64::EPSILON => {
            let scale = mm_to_f64(width) / natural;
            image.set_scale(Scale::new(scale, scale));
        }
        _ => image.set_scale(Scale::new(1.0, 1.0)),
    }
}

/// An image with an optional caption stacked underneath, scaled to a width.
pub struct CaptionedImage {
    image: Image,
    caption: Option<Paragraph>,
    alignment: Alignment,
    natural_size: Size,
    requested_width: Option<Mm>,
    spacing: Mm,
}

impl CaptionedImage {
    /// Loads the image at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let (image, natural_size) = image_from_dynamic(decode_image_from_path(path)?)?;
        Ok(Self {
            image,
            caption: None,
            alignment: Alignment::Center,
            natural_size,
            requested_width: None,
            spacing: mm_from_f64(DEFAULT_CAPTION_SPACING_MM),
        })
    }

    /// Adds a caption below the image.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(Paragraph::new(caption.into()));
        self
    }

    /// Constrains the rendered width while keeping the aspect ratio.
    pub fn with_width(mut self, width: impl Into<Option<Mm>>) -> Self {
        self.requested_width = width.into();
        self
    }
}

impl Element for CaptionedImage {
    fn render(
        &mut self,
        context: &genpdf::Context,
        mut area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        self.image.set_alignment(self.alignment);
        let available = area.size().width;
        let width = match self.requested_width {
            Some(width) if width > available => Some(available),
            Some(width) => Some(width),
            None if self.natural_size.width > available => Some(available),
            None => None,
        };
        scale_to_width(&mut self.image, self.natural_size, width);

        let mut result = RenderResult::default();
        let image_result = self.image.render(context, area.clone(), style)?;
        result.size = result.size.stack_vertical(image_result.size);
        result.has_more |= image_result.has_more;

        if let Some(caption) = &mut self.caption {
            caption.set_alignment(self.alignment);
            area.add_offset(Position::new(0, image_result.size.height + self.spacing));
            result.size = result.size.stack_vertical(Size::new(0, self.spacing));
            let caption_result = caption.render(context, area, style.with_font_size(7))?;
            result.size = result.size.stack_vertical(caption_result.size);
            result.has_more |= caption_result.has_more;
        }

        Ok(result)
    }
}

/// Fixed vertical whitespace.
///
/// Unlike [`genpdf::elements::Break`] the height is absolute, not a number of
/// lines.  A gap taller than the remaining space is cut at the page end.
pub struct VerticalSpace {
    height: Mm,
}

impl VerticalSpace {
    /// Creates a gap of `height_mm` millimetres.
    pub fn new(height_mm: f64) -> Self {
        Self {
            height: mm_from_f64(height_mm.max(0.0)),
        }
    }
}

impl Element for VerticalSpace {
    fn render(
        &mut self,
        _context: &genpdf::Context,
        area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        let available = area.size().height;
        let height = if self.height > available { available } else { self.height };
        let mut result = RenderResult::default();
        result.size = Size::new(0, height);
        Ok(result)
    }
}

/// Shared record of the first page each section was rendered on.
#[derive(Clone, Debug, Default)]
pub struct SectionPages {
    pages: Rc<RefCell<Vec<Option<usize>>>>,
}

impl SectionPages {
    /// Creates a record for `count` sections.
    pub fn new(count: usize) -> Self {
        Self {
            pages: Rc::new(RefCell::new(vec![None; count])),
        }
    }

    /// Returns the recorded start pages, 1-indexed.
    pub fn snapshot(&self) -> Vec<Option<usize>> {
        self.pages.borrow().clone()
    }

    fn record(&self, index: usize, page: usize) {
        if let Some(slot) = self.pages.borrow_mut().get_mut(index) {
            slot.get_or_insert(page);
        }
    }
}

/// Zero-size element that records the current page for a section.
pub struct SectionMarker {
    index: usize,
    page: Rc<Cell<usize>>,
    pages: SectionPages,
}

impl SectionMarker {
    /// Creates a marker for section `index` reading the page counter `page`.
    pub fn new(index: usize, page: Rc<Cell<usize>>, pages: SectionPages) -> Self {
        Self { index, page, pages }
    }
}

impl Element for SectionMarker {
    fn render(
        &mut self,
        _context: &genpdf::Context,
        _area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        self.pages.record(self.index, self.page.get());
        Ok(RenderResult::default())
    }
}

/// A framed table whose header row is drawn again on every page it spans.
pub struct HeaderedTable {
    header: Vec<String>,
    column_weights: Vec<usize>,
    body: TableLayout,
    repeat_header: bool,
    font_size: u8,
    pages_started: usize,
    stalled: bool,
}

fn cell(text: &str, style: Style) -> impl Element {
    let mut paragraph = Paragraph::new(text.to_string());
    paragraph.set_alignment(Alignment::Center);
    paragraph
        .styled(style)
        .padded(Margins::all(mm_from_f64(CELL_PADDING_MM)))
}

fn framed_table(column_weights: &[usize]) -> TableLayout {
    let mut table = TableLayout::new(column_weights.to_vec());
    table.set_cell_decorator(FrameCellDecorator::new(true, true, true));
    table
}

impl HeaderedTable {
    /// Builds the table; every row must have one cell per column.
    pub fn new(
        header: &[String],
        column_weights: &[usize],
        rows: &[Vec<String>],
        font_size: u8,
        repeat_header: bool,
    ) -> Result<Self, Error> {
        if header.len() != column_weights.len() || header.is_empty() {
            return Err(Error::new(
                format!(
                    "Table header has {} cells for {} columns",
                    header.len(),
                    column_weights.len()
                ),
                ErrorKind::InvalidData,
            ));
        }

        let style = Style::new().with_font_size(font_size);
        let mut body = framed_table(column_weights);
        for (index, row) in rows.iter().enumerate() {
            if row.len() != header.len() {
                return Err(Error::new(
                    format!(
                        "Table row {} has {} cells, expected {}",
                        index,
                        row.len(),
                        header.len()
                    ),
                    ErrorKind::InvalidData,
                ));
            }
            let mut table_row = body.row();
            for value in row {
                table_row.push_element(cell(value, style));
            }
            table_row.push()?;
        }

        Ok(Self {
            header: header.to_vec(),
            column_weights: column_weights.to_vec(),
            body,
            repeat_header,
            font_size,
            pages_started: 0,
            stalled: false,
        })
    }

    fn header_table(&self) -> Result<TableLayout, Error> {
        let style = Style::new().bold().with_font_size(self.font_size);
        let mut table = framed_table(&self.column_weights);
        let mut row = table.row();
        for value in &self.header {
            row.push_element(cell(value, style));
        }
        row.push()?;
        Ok(table)
    }
}

impl Element for HeaderedTable {
    fn render(
        &mut self,
        context: &genpdf::Context,
        mut area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        let first_page = self.pages_started == 0;
        self.pages_started += 1;

        if first_page || self.repeat_header {
            let mut header = self.header_table()?;
            let header_result = header.render(context, area.clone(), style)?;
            if header_result.has_more {
                if self.stalled {
                    return Err(Error::new(
                        "Table header does not fit on an empty page",
                        ErrorKind::PageSizeExceeded,
                    ));
                }
                self.stalled = true;
                self.pages_started -= 1;
                result.has_more = true;
                return Ok(result);
            }
            self.stalled = false;
            area.add_offset(Position::new(0, header_result.size.height));
            result.size = result.size.stack_vertical(header_result.size);
        }

        let body_result = self.body.render(context, area, style)?;
        result.size = result.size.stack_vertical(body_result.size);
        result.has_more = body_result.has_more;
        Ok(result)
    }
}

/// Page header: the logo on the left and a single line of text beside it.
pub struct PageHeader {
    logo: Option<Rc<image::DynamicImage>>,
    logo_width: Mm,
    text: String,
}

impl PageHeader {
    /// Creates a header with an optional logo scaled to `logo_width_mm`.
    pub fn new(logo: Option<Rc<image::DynamicImage>>, logo_width_mm: f64, text: impl Into<String>) -> Self {
        Self {
            logo,
            logo_width: mm_from_f64(logo_width_mm),
            text: text.into(),
        }
    }
}

impl Element for PageHeader {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        let mut text_offset = Mm::default();

        if let Some(logo) = &self.logo {
            let (mut image, natural) = image_from_dynamic((**logo).clone())?;
            scale_to_width(&mut image, natural, Some(self.logo_width));
            let logo_result = image.render(context, area.clone(), style)?;
            result.size = logo_result.size;
            text_offset = self.logo_width + mm_from_f64(5.0);
        }

        let mut text_area = area.clone();
        text_area.add_offset(Position::new(text_offset, mm_from_f64(4.0)));
        let mut line = Paragraph::new(self.text.clone());
        let line_result = line.render(context, text_area, style)?;
        let text_height = line_result.size.height + mm_from_f64(4.0);

        result.size = Size::new(
            area.size().width,
            result.size.height.max(text_height) + mm_from_f64(3.0),
        );
        Ok(result)
    }
}

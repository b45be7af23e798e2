//! `genpdf::Document` construction with page header, footer and page tracking.

use std::cell::Cell;
use std::rc::Rc;

use genpdf::error::{Error, ErrorKind};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::render::Area;
use genpdf::style::Style;
use genpdf::{Context, Element, Margins, Mm, PageDecorator, Position, Size};

use crate::elements::mm_from_f64;

const FRAME_INSET_MM: f64 = 2.0;

/// Produces the element drawn on a given (1-indexed) page.
type PageElement = Box<dyn Fn(usize) -> Box<dyn Element>>;

fn boxed<F, E>(factory: F) -> PageElement
where
    F: Fn(usize) -> E + 'static,
    E: Element + 'static,
{
    Box::new(move |page| Box::new(factory(page)) as Box<dyn Element>)
}

/// Builder for report documents: paper, margins, a header drawn at the top
/// of every page and a fixed-height footer at the bottom.
#[derive(Default)]
pub struct DocumentBuilder {
    paper_size: Option<Size>,
    margins: Option<Margins>,
    title: Option<String>,
    header: Option<PageElement>,
    footer: Option<(Mm, PageElement)>,
    page_counter: Option<Rc<Cell<usize>>>,
    first_page_frame: bool,
}

impl DocumentBuilder {
    /// Creates a builder with `genpdf` defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the paper size.
    pub fn with_paper_size(mut self, paper_size: impl Into<Size>) -> Self {
        self.paper_size = Some(paper_size.into());
        self
    }

    /// Sets the page margins.
    pub fn with_margins(mut self, margins: impl Into<Margins>) -> Self {
        self.margins = Some(margins.into());
        self
    }

    /// Sets the PDF document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Draws `header(page)` at the top of every page.
    pub fn with_header<F, E>(mut self, header: F) -> Self
    where
        F: Fn(usize) -> E + 'static,
        E: Element + 'static,
    {
        self.header = Some(boxed(header));
        self
    }

    /// Reserves `height` at the bottom of every page for `footer(page)`.
    pub fn with_footer<F, E>(mut self, height: impl Into<Mm>, footer: F) -> Self
    where
        F: Fn(usize) -> E + 'static,
        E: Element + 'static,
    {
        self.footer = Some((height.into(), boxed(footer)));
        self
    }

    /// Shares the number of the page being laid out with other elements.
    pub fn with_page_counter(mut self, counter: Rc<Cell<usize>>) -> Self {
        self.page_counter = Some(counter);
        self
    }

    /// Frames the content area of the first page.
    pub fn with_first_page_frame(mut self, enabled: bool) -> Self {
        self.first_page_frame = enabled;
        self
    }

    /// Builds the document with `font_family` as its default font.
    pub fn build(self, font_family: FontFamily<FontData>) -> Result<genpdf::Document, Error> {
        let mut document = genpdf::Document::new(font_family);
        if let Some(paper_size) = self.paper_size {
            document.set_paper_size(paper_size);
        }
        if let Some(title) = self.title {
            document.set_title(title);
        }
        document.set_page_decorator(ReportPageDecorator {
            page: 0,
            margins: self.margins,
            header: self.header,
            footer: self.footer,
            page_counter: self.page_counter,
            first_page_frame: self.first_page_frame,
        });
        Ok(document)
    }
}

struct ReportPageDecorator {
    page: usize,
    margins: Option<Margins>,
    header: Option<PageElement>,
    footer: Option<(Mm, PageElement)>,
    page_counter: Option<Rc<Cell<usize>>>,
    first_page_frame: bool,
}

fn draw_frame(area: &Area<'_>) {
    let inset = mm_from_f64(FRAME_INSET_MM);
    let size = area.size();
    let (left, top) = (inset, inset);
    let (right, bottom) = (size.width - inset, size.height - inset);
    area.draw_line(
        vec![
            Position::new(left, top),
            Position::new(right, top),
            Position::new(right, bottom),
            Position::new(left, bottom),
            Position::new(left, top),
        ],
        Style::new(),
    );
}

impl PageDecorator for ReportPageDecorator {
    fn decorate_page<'a>(
        &mut self,
        context: &Context,
        mut area: Area<'a>,
        style: Style,
    ) -> Result<Area<'a>, Error> {
        self.page += 1;
        if let Some(counter) = &self.page_counter {
            counter.set(self.page);
        }
        if let Some(margins) = self.margins {
            area.add_margins(margins);
        }
        if self.first_page_frame && self.page == 1 {
            draw_frame(&area);
        }

        if let Some(header) = &self.header {
            let rendered = header(self.page).render(context, area.clone(), style)?;
            area.add_offset(Position::new(0, rendered.size.height));
        }

        if let Some((height, footer)) = &self.footer {
            let available = area.size().height;
            if *height > available {
                return Err(Error::new(
                    format!("page {} has no room for the footer", self.page),
                    ErrorKind::PageSizeExceeded,
                ));
            }
            let mut footer_area = area.clone();
            footer_area.add_offset(Position::new(0, available - *height));
            if footer(self.page).render(context, footer_area, style)?.has_more {
                return Err(Error::new(
                    format!("footer of page {} does not fit", self.page),
                    ErrorKind::PageSizeExceeded,
                ));
            }
            area.set_height(available - *height);
        }

        Ok(area)
    }
}

//! `genpdf` document setup for the flow backend: paper, margins, numbered footer.

use std::cell::Cell;
use std::rc::Rc;

use genpdf::error::{Error as PdfError, ErrorKind};
use genpdf::render::Area;
use genpdf::style::Style;
use genpdf::{Context, Element, Margins, Mm, PageDecorator, Position, Size};

use crate::error::Result;
use crate::fonts::FontSet;

type Footer = Box<dyn Fn(usize) -> Box<dyn Element>>;

/// Collects the page settings of a flow document before the font family is loaded.
#[derive(Default)]
pub struct DocumentBuilder {
    title: Option<String>,
    paper_size: Option<Size>,
    margins: Option<Margins>,
    footer: Option<(Mm, Footer)>,
    page_counter: Option<Rc<Cell<usize>>>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Title stored in the PDF metadata.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_paper_size(mut self, paper_size: impl Into<Size>) -> Self {
        self.paper_size = Some(paper_size.into());
        self
    }

    pub fn with_margins(mut self, margins: impl Into<Margins>) -> Self {
        self.margins = Some(margins.into());
        self
    }

    /// Reserves `height` at the bottom of every page for the element `footer` builds from
    /// the one-based page number.
    pub fn with_footer<F, E>(mut self, height: impl Into<Mm>, footer: F) -> Self
    where
        F: Fn(usize) -> E + 'static,
        E: Element + 'static,
    {
        let footer: Footer = Box::new(move |page| Box::new(footer(page)));
        self.footer = Some((height.into(), footer));
        self
    }

    /// After rendering, `counter` holds the number of pages.
    pub fn with_page_counter(mut self, counter: Rc<Cell<usize>>) -> Self {
        self.page_counter = Some(counter);
        self
    }

    /// Loads `fonts` into a new document and applies every setting.
    pub fn build(self, fonts: &FontSet) -> Result<genpdf::Document> {
        let mut document = genpdf::Document::new(fonts.to_genpdf_family()?);
        if let Some(title) = self.title {
            document.set_title(title);
        }
        if let Some(size) = self.paper_size {
            document.set_paper_size(size);
        }
        document.set_page_decorator(Pages {
            count: self.page_counter.unwrap_or_default(),
            margins: self.margins,
            footer: self.footer,
        });
        Ok(document)
    }
}

struct Pages {
    count: Rc<Cell<usize>>,
    margins: Option<Margins>,
    footer: Option<(Mm, Footer)>,
}

impl PageDecorator for Pages {
    fn decorate_page<'a>(
        &mut self,
        context: &Context,
        mut area: Area<'a>,
        style: Style,
    ) -> std::result::Result<Area<'a>, PdfError> {
        let page = self.count.get() + 1;
        self.count.set(page);

        if let Some(margins) = self.margins {
            area.add_margins(margins);
        }
        let Some((height, footer)) = &self.footer else {
            return Ok(area);
        };

        let body_height = area.size().height - *height;
        if body_height <= Mm::from(0) {
            return Err(PdfError::new(
                "footer leaves no room for content",
                ErrorKind::InvalidData,
            ));
        }
        let mut footer_area = area.clone();
        footer_area.add_offset(Position::new(0, body_height));
        if footer(page).render(context, footer_area, style)?.has_more {
            return Err(PdfError::new(
                format!("footer of page {} is taller than its reserved space", page),
                ErrorKind::PageSizeExceeded,
            ));
        }
        area.set_height(body_height);
        Ok(area)
    }
}

//! Vector PDF backend built on `genpdf`.
//!
//! Blocks are mapped onto paragraphs, tables and framed layouts flowing over white pages of
//! the document's size.  Colors that only read well on the dark background (white, light
//! slate) are printed black.  Charts are painted by the [`Rasterizer`] and embedded as
//! figures.  PNG output is not available from this backend.

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use genpdf::elements::{FrameCellDecorator, LinearLayout, PageBreak, Paragraph, TableLayout};
use genpdf::style::{self, Style};
use genpdf::{Alignment, Element, Margins, Size};
use log::{debug, warn};

use crate::builder::DocumentBuilder;
use crate::charts::Chart;
use crate::elements::{mm_from_f64, mm_from_px, Figure, Rule, Spacing};
use crate::error::{Error, Result};
use crate::fonts::FontSet;
use crate::model::{
    palette, Block, ChartPanel, Color, Columns, Document, HorizontalAlignment, ImageBlock,
    ImageSource, MetricGrid, Panel, RichParagraph, Table, PLACEHOLDER,
};

use super::raster::Rasterizer;
use super::{ExportFormat, RenderedFile, Renderer};

const CHART_WIDTH_PX: f64 = 640.0;
const CHART_PIXEL_RATIO: f32 = 2.0;
const FOOTER_HEIGHT_MM: f64 = 10.0;

fn printable(color: Color) -> Color {
    if color.is_light() {
        palette::BLACK
    } else {
        color
    }
}

fn pdf_color(color: Color) -> style::Color {
    let color = printable(color);
    style::Color::Rgb(color.r, color.g, color.b)
}

fn font_size(px: f32) -> u8 {
    (px * 0.75).round().max(6.0).min(72.0) as u8
}

fn alignment(alignment: HorizontalAlignment) -> Alignment {
    match alignment {
        HorizontalAlignment::Left => Alignment::Left,
        HorizontalAlignment::Center => Alignment::Center,
        HorizontalAlignment::Right => Alignment::Right,
    }
}

fn text(value: &str, size: f32, color: Color, bold: bool) -> Paragraph {
    let mut style = Style::new()
        .with_font_size(font_size(size))
        .with_color(pdf_color(color));
    if bold {
        style = style.bold();
    }
    Paragraph::new(style::StyledString::new(value.to_owned(), style))
}

fn boxed<E: Element + 'static>(element: E) -> Box<dyn Element> {
    Box::new(element)
}

fn column_weights(weights: &[f32]) -> Vec<usize> {
    weights
        .iter()
        .map(|weight| ((weight * 10.0).round() as usize).max(1))
        .collect()
}

/// `genpdf` backend producing selectable-text PDFs.
pub struct FlowRenderer {
    fonts: FontSet,
    rasterizer: Rasterizer,
    allow_tainted_images: bool,
}

impl FlowRenderer {
    /// Creates a renderer using `fonts` for text and chart labels.
    pub fn new(fonts: FontSet) -> Result<Self> {
        let rasterizer = Rasterizer::new(&fonts)?;
        Ok(Self {
            fonts,
            rasterizer,
            allow_tainted_images: true,
        })
    }

    /// Locates the bundled fonts; unlike the raster backend this one cannot work without them.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        Self::new(FontSet::discover(explicit)?)
    }

    /// Fails instead of skipping embedded images that cannot be loaded.
    pub fn with_allow_tainted_images(mut self, allow: bool) -> Self {
        self.allow_tainted_images = allow;
        self
    }

    fn build(&self, document: &Document, pages: Rc<Cell<usize>>) -> Result<genpdf::Document> {
        let layout = document.layout();
        let margin = mm_from_px(document.padding());
        let mut builder = DocumentBuilder::new()
            .with_title(document.title())
            .with_paper_size(Size::new(mm_from_px(layout.width), mm_from_px(layout.height)))
            .with_margins(Margins::trbl(margin, margin, margin, margin))
            .with_page_counter(pages);

        if let Some(footer) = document.footer() {
            let footer = footer.to_owned();
            builder = builder.with_footer(mm_from_f64(FOOTER_HEIGHT_MM), move |page| {
                let mut paragraph = text(
                    &format!("{} · strona {}", footer, page),
                    11.0,
                    palette::SLATE_500,
                    false,
                );
                paragraph.set_alignment(Alignment::Center);
                paragraph
            });
        }

        let mut pdf = builder.build(&self.fonts)?;
        let mut body = LinearLayout::vertical();
        for block in document.blocks() {
            self.push_block(&mut body, block)?;
        }
        pdf.push(body);
        Ok(pdf)
    }

    fn push_block(&self, layout: &mut LinearLayout, block: &Block) -> Result<()> {
        match block {
            Block::Heading { text: value, size, color } => {
                layout.push(text(value, *size, *color, true));
            }
            Block::Paragraph(paragraph) => layout.push(self.paragraph(paragraph)),
            Block::Metrics(grid) => layout.push(self.metrics(grid)?),
            Block::Table(table) => layout.push(self.table(table)?),
            Block::Chart(panel) => layout.push(self.chart(panel)?),
            Block::Panel(panel) => layout.push(self.panel(panel)?),
            Block::Columns(columns) => layout.push(self.columns(columns)?),
            Block::Image(image) => {
                if let Some(figure) = self.image(image)? {
                    layout.push(figure);
                }
            }
            Block::Rule(color) => layout.push(Rule::new(pdf_color(*color))),
            Block::Spacer(height) => layout.push(Spacing::new(mm_from_px(height.max(0.0)))),
            Block::PageBreak => layout.push(PageBreak::new()),
        }
        Ok(())
    }

    fn paragraph(&self, paragraph: &RichParagraph) -> impl Element {
        let mut element = Paragraph::default();
        for span in paragraph.spans() {
            element.push(span.to_styled_string_mapped(printable));
        }
        element.set_alignment(alignment(paragraph.alignment()));
        element.styled(
            Style::new()
                .with_font_size(font_size(paragraph.size()))
                .with_color(pdf_color(paragraph.color())),
        )
    }

    fn metrics(&self, grid: &MetricGrid) -> Result<TableLayout> {
        let columns = grid.columns.max(1);
        let mut table = TableLayout::new(vec![1; columns]);
        table.set_cell_decorator(FrameCellDecorator::new(true, true, false));

        for row in grid.cards.chunks(columns) {
            let mut cells = Vec::with_capacity(columns);
            for card in row {
                let mut cell = LinearLayout::vertical();
                cell.push(text(&card.label, 12.0, palette::ZINC_400, false));
                cell.push(text(&card.value, grid.value_size, palette::BLACK, true));
                if let Some(caption) = &card.caption {
                    cell.push(text(caption, 11.0, card.accent, false));
                }
                cells.push(boxed(cell.padded(Margins::all(mm_from_f64(2.0)))));
            }
            while cells.len() < columns {
                cells.push(boxed(Paragraph::default()));
            }
            table.push_row(cells)?;
        }
        Ok(table)
    }

    fn table(&self, table: &Table) -> Result<TableLayout> {
        let mut layout = TableLayout::new(column_weights(&table.weights));
        layout.set_cell_decorator(FrameCellDecorator::new(true, true, false));
        let cell = |value: &str, index: usize, bold: bool| {
            let mut paragraph = text(value, if bold { 12.0 } else { 13.0 }, palette::BLACK, bold);
            let aligned = table
                .alignments
                .get(index)
                .copied()
                .unwrap_or(HorizontalAlignment::Left);
            paragraph.set_alignment(alignment(aligned));
            boxed(paragraph.padded(Margins::all(mm_from_f64(1.5))))
        };

        let columns = table.column_count();
        if !table.headers.is_empty() {
            let row = (0..columns)
                .map(|index| {
                    cell(
                        table.headers.get(index).map(String::as_str).unwrap_or(""),
                        index,
                        true,
                    )
                })
                .collect();
            layout.push_row(row)?;
        }
        for values in &table.rows {
            let row = (0..columns)
                .map(|index| cell(values.get(index).map(String::as_str).unwrap_or(""), index, false))
                .collect();
            layout.push_row(row)?;
        }
        Ok(layout)
    }

    fn chart(&self, panel: &ChartPanel) -> Result<LinearLayout> {
        let mut layout = LinearLayout::vertical();
        layout.push(text(&panel.title, 16.0, palette::BLACK, true));
        layout.push(Spacing::new(mm_from_f64(2.0)));

        let caption = panel.caption.as_deref().map(|caption| {
            let mut paragraph = text(caption, 12.0, palette::ZINC_400, false);
            paragraph.set_alignment(Alignment::Center);
            paragraph
        });

        match &panel.chart {
            Some(chart) => {
                let figure = self.chart_figure(chart, panel.chart_height)?;
                match caption {
                    Some(caption) => layout.push(figure.with_caption(caption)),
                    None => layout.push(figure),
                }
            }
            None => {
                let mut placeholder = text(PLACEHOLDER, 32.0, palette::SLATE_500, false);
                placeholder.set_alignment(Alignment::Center);
                layout.push(placeholder);
                if let Some(caption) = caption {
                    layout.push(caption);
                }
            }
        }
        Ok(layout)
    }

    fn chart_figure(&self, chart: &Chart, height: f32) -> Result<Figure> {
        let chart = chart.clone().resized(CHART_WIDTH_PX, f64::from(height));
        let image = self
            .rasterizer
            .chart_image(&chart, CHART_PIXEL_RATIO, palette::WHITE);
        debug!(
            "Embedding a {}x{} chart figure",
            image.width(),
            image.height()
        );
        Ok(Figure::from_dynamic_image(image::DynamicImage::ImageRgb8(image))?
            .with_max_width(mm_from_px(CHART_WIDTH_PX as f32)))
    }

    fn panel(&self, panel: &Panel) -> Result<impl Element> {
        let mut layout = LinearLayout::vertical();
        if let Some(title) = &panel.title {
            layout.push(text(title, 14.0, panel.accent, true));
        }
        for block in &panel.blocks {
            self.push_block(&mut layout, block)?;
        }
        Ok(layout.padded(Margins::all(mm_from_f64(3.0))).framed())
    }

    fn columns(&self, columns: &Columns) -> Result<TableLayout> {
        let mut table = TableLayout::new(column_weights(&columns.weights));
        let mut cells = Vec::with_capacity(columns.columns.len());
        for blocks in &columns.columns {
            let mut cell = LinearLayout::vertical();
            for block in blocks {
                self.push_block(&mut cell, block)?;
            }
            cells.push(boxed(cell.padded(Margins::trbl(0, mm_from_f64(2.0), 0, 0))));
        }
        if !cells.is_empty() {
            table.push_row(cells)?;
        }
        Ok(table)
    }

    fn image(&self, block: &ImageBlock) -> Result<Option<Figure>> {
        let decoded = match block.source() {
            ImageSource::Bytes(bytes) => image::load_from_memory(bytes),
            ImageSource::Path(path) => image::open(path),
        };
        let image = match decoded {
            Ok(image) => image,
            Err(err) if self.allow_tainted_images => {
                warn!("Skipping an embedded image that cannot be loaded: {}", err);
                return Ok(None);
            }
            Err(err) => {
                return Err(Error::Capture(format!(
                    "cannot load embedded image: {}",
                    err
                )))
            }
        };
        Ok(Some(
            Figure::from_dynamic_image(image)?
                .with_alignment(alignment(block.alignment()))
                .with_max_width(mm_from_px(block.width())),
        ))
    }
}

impl Renderer for FlowRenderer {
    fn render(&self, document: &Document, format: ExportFormat) -> Result<RenderedFile> {
        if format != ExportFormat::Pdf {
            return Err(Error::Unsupported(format!(
                "{} export requires the raster backend",
                format
            )));
        }

        let pages = Rc::new(Cell::new(0));
        let pdf = self.build(document, Rc::clone(&pages))?;
        let mut bytes = Vec::new();
        pdf.render(&mut bytes)?;
        debug!(
            "Rendered {:?} with the flow backend: {} page(s)",
            document.title(),
            pages.get()
        );
        Ok(RenderedFile {
            bytes,
            format,
            pages: pages.get().max(1),
        })
    }
}

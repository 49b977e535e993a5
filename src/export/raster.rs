//! Native rasterizer for document descriptions.
//!
//! Capturing happens in two passes.  Layout walks the blocks at the page's CSS width and
//! produces a flat display list of rectangles, text runs, chart shapes and pictures; the
//! content height is whatever the blocks need, but never less than the page.  Painting then
//! scales every item by the pixel ratio onto an opaque RGB canvas.
//!
//! Text is measured and drawn with `rusttype` when fonts are available.  Without fonts the
//! widths are estimated from the character count, so layout and pagination still work, but
//! glyphs are not painted.

use std::fmt;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, RgbaImage};
use log::{debug, warn};
use rusttype::{point, Font, Scale};

use crate::charts::{Chart, Point, Shape};
use crate::error::{Error, Result};
use crate::fonts::FontSet;
use crate::model::{
    palette, Block, ChartPanel, Color, Columns, Document, HorizontalAlignment, ImageBlock,
    ImageSource, MetricCard, MetricGrid, Panel, RichParagraph, Table, PLACEHOLDER,
};

use super::CaptureOptions;

const LINE_HEIGHT: f32 = 1.4;
const RADIUS: f32 = 12.0;
const PANEL_PADDING: f32 = 20.0;
const CARD_PADDING: f32 = 16.0;
const CARD_GAP: f32 = 16.0;
const CELL_PADDING: f32 = 10.0;
const NESTED_GAP: f32 = 8.0;
const BORDER_WIDTH: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Face {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl Face {
    fn of(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => Face::Regular,
            (true, false) => Face::Bold,
            (false, true) => Face::Italic,
            (true, true) => Face::BoldItalic,
        }
    }
}

struct Faces {
    regular: Font<'static>,
    bold: Font<'static>,
    italic: Font<'static>,
    bold_italic: Font<'static>,
}

impl Faces {
    fn parse(fonts: &FontSet) -> Result<Self> {
        let parse = |bytes: &Vec<u8>, face: &str| {
            Font::try_from_vec(bytes.clone())
                .ok_or_else(|| Error::Font(format!("cannot parse the {} face", face)))
        };
        Ok(Self {
            regular: parse(&fonts.regular, "regular")?,
            bold: parse(&fonts.bold, "bold")?,
            italic: parse(&fonts.italic, "italic")?,
            bold_italic: parse(&fonts.bold_italic, "bold italic")?,
        })
    }

    fn get(&self, face: Face) -> &Font<'static> {
        match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
            Face::Italic => &self.italic,
            Face::BoldItalic => &self.bold_italic,
        }
    }

    fn width(&self, text: &str, size: f32, face: Face) -> f32 {
        self.get(face)
            .layout(text, Scale::uniform(size), point(0.0, 0.0))
            .last()
            .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }
}

/// Lays out and paints documents.
pub struct Rasterizer {
    faces: Option<Faces>,
}

impl fmt::Debug for Rasterizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rasterizer")
            .field("fonts", &self.faces.is_some())
            .finish()
    }
}

impl Rasterizer {
    /// Creates a rasterizer drawing text with `fonts`.
    pub fn new(fonts: &FontSet) -> Result<Self> {
        Ok(Self {
            faces: Some(Faces::parse(fonts)?),
        })
    }

    /// Creates a rasterizer that estimates text metrics and paints no glyphs.
    pub fn without_fonts() -> Self {
        Self { faces: None }
    }

    /// Uses the discovered fonts when possible and falls back to estimated text otherwise.
    pub fn discover(explicit: Option<&std::path::Path>) -> Self {
        match FontSet::discover(explicit).and_then(|fonts| Self::new(&fonts)) {
            Ok(rasterizer) => rasterizer,
            Err(err) => {
                warn!("Rasterizing without text: {}", err);
                Self::without_fonts()
            }
        }
    }

    /// Whether glyphs will be painted.
    pub fn has_fonts(&self) -> bool {
        self.faces.is_some()
    }

    fn text_width(&self, text: &str, size: f32, face: Face) -> f32 {
        match &self.faces {
            Some(faces) => faces.width(text, size, face),
            None => {
                let factor = match face {
                    Face::Bold | Face::BoldItalic => 0.56,
                    Face::Regular | Face::Italic => 0.52,
                };
                text.chars().count() as f32 * size * factor
            }
        }
    }

    fn wrap(&self, pieces: &[Piece<'_>], size: f32, max_width: f32) -> Vec<TextLine> {
        let mut lines = Vec::new();
        let mut line = TextLine::default();
        for piece in pieces {
            for (index, segment) in piece.text.split('\n').enumerate() {
                if index > 0 {
                    lines.push(std::mem::take(&mut line));
                }
                for word in segment.split_inclusive(' ') {
                    let trimmed = word.trim_end_matches(' ');
                    let visible = self.text_width(trimmed, size, piece.face);
                    if !line.runs.is_empty() && line.width + visible > max_width {
                        lines.push(std::mem::take(&mut line));
                    }
                    if line.runs.is_empty() && trimmed.is_empty() {
                        continue;
                    }
                    let advance = self.text_width(word, size, piece.face);
                    line.push(word, piece.face, piece.color, advance, visible);
                }
            }
        }
        if !line.runs.is_empty() || lines.is_empty() {
            lines.push(line);
        }
        lines
    }

    /// Computes the display list of `document`.
    pub fn layout(&self, document: &Document, allow_tainted_images: bool) -> Result<Layout> {
        let page = document.layout();
        let padding = document.padding();
        let width = (page.width - 2.0 * padding).max(1.0);
        let mut flow = Flow {
            rasterizer: self,
            allow_tainted_images,
            page_height: page.height,
            padding,
            items: Vec::new(),
        };

        let mut y = flow.blocks(document.blocks(), padding, padding, width, 0.0)?;
        if let Some(footer) = document.footer() {
            y += 32.0;
            flow.items
                .push(Item::fill(padding, y, width, BORDER_WIDTH, palette::BORDER));
            y += 16.0;
            y = flow.text(
                footer,
                padding,
                y,
                width,
                11.0,
                palette::SLATE_500,
                Face::Regular,
                HorizontalAlignment::Center,
            );
        }

        let height = (y + padding)
            .max(page.height)
            .max(document.min_height().unwrap_or(0.0));
        Ok(Layout {
            width: page.width,
            height,
            items: flow.items,
        })
    }

    /// Lays out and paints `document`.
    pub fn capture(&self, document: &Document, options: &CaptureOptions) -> Result<Capture> {
        let ratio = options.pixel_ratio;
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(Error::Capture(format!("invalid pixel ratio {}", ratio)));
        }

        let layout = self.layout(document, options.allow_tainted_images)?;
        let width = (layout.width * ratio).round().max(1.0) as u32;
        let height = (layout.height * ratio).round().max(1.0) as u32;
        if self.faces.is_none() {
            debug!("No fonts loaded, text of {:?} is not painted", document.title());
        }

        let mut canvas = Canvas::new(width, height, ratio, options.background);
        for item in &layout.items {
            canvas.paint(item, self.faces.as_ref());
        }
        debug!(
            "Captured {:?}: {}x{} css px at ratio {}",
            document.title(),
            layout.width,
            layout.height,
            ratio
        );

        Ok(Capture {
            image: canvas.image,
            pixel_ratio: ratio,
            css_width: layout.width,
            css_height: layout.height,
        })
    }

    /// Paints a chart on its own canvas, e.g. to embed it into another document format.
    pub fn chart_image(&self, chart: &Chart, pixel_ratio: f32, background: Color) -> RgbImage {
        let ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio
        } else {
            1.0
        };
        let width = (chart.width() as f32 * ratio).round().max(1.0) as u32;
        let height = (chart.height() as f32 * ratio).round().max(1.0) as u32;
        let mut canvas = Canvas::new(width, height, ratio, background);
        canvas.paint(
            &Item::Shapes {
                x: 0.0,
                y: 0.0,
                shapes: chart.shapes(),
            },
            self.faces.as_ref(),
        );
        canvas.image
    }
}

/// A painted document.
#[derive(Clone, Debug)]
pub struct Capture {
    image: RgbImage,
    pixel_ratio: f32,
    css_width: f32,
    css_height: f32,
}

impl Capture {
    /// The painted pixels.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Device pixels per CSS pixel.
    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Width of the document in CSS pixels.
    pub fn css_width(&self) -> f32 {
        self.css_width
    }

    /// Height of the laid-out content in CSS pixels.
    pub fn css_height(&self) -> f32 {
        self.css_height
    }

    /// Encodes the capture as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        image::png::PngEncoder::new(&mut bytes)
            .encode(
                self.image.as_raw(),
                self.image.width(),
                self.image.height(),
                image::ColorType::Rgb8,
            )
            .map_err(|err| Error::Encode {
                format: "png",
                message: err.to_string(),
            })?;
        Ok(bytes)
    }
}

/// The display list of a laid-out document.
#[derive(Clone, Debug)]
pub struct Layout {
    width: f32,
    height: f32,
    items: Vec<Item>,
}

impl Layout {
    /// Width in CSS pixels.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Content height in CSS pixels, at least one page.
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Every text run in paint order.
    pub fn texts(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Item::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of chart drawings.
    pub fn chart_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, Item::Shapes { .. }))
            .count()
    }
}

#[derive(Clone, Debug)]
enum Item {
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        fill: Color,
        border: Option<Color>,
        radius: f32,
    },
    Text {
        x: f32,
        baseline: f32,
        text: String,
        size: f32,
        color: Color,
        face: Face,
    },
    Shapes {
        x: f32,
        y: f32,
        shapes: Vec<Shape>,
    },
    Picture {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        image: RgbaImage,
    },
}

impl Item {
    fn fill(x: f32, y: f32, w: f32, h: f32, fill: Color) -> Self {
        Item::Rect {
            x,
            y,
            w,
            h,
            fill,
            border: None,
            radius: 0.0,
        }
    }
}

struct Piece<'a> {
    text: &'a str,
    face: Face,
    color: Color,
}

#[derive(Clone, Debug)]
struct Run {
    x: f32,
    text: String,
    face: Face,
    color: Color,
}

#[derive(Clone, Debug, Default)]
struct TextLine {
    runs: Vec<Run>,
    width: f32,
    trailing: f32,
}

impl TextLine {
    fn push(&mut self, word: &str, face: Face, color: Color, advance: f32, visible: f32) {
        match self.runs.last_mut() {
            Some(run) if run.face == face && run.color == color => run.text.push_str(word),
            _ => self.runs.push(Run {
                x: self.width,
                text: word.to_owned(),
                face,
                color,
            }),
        }
        self.width += advance;
        self.trailing = advance - visible;
    }

    fn visible_width(&self) -> f32 {
        self.width - self.trailing
    }
}

fn title_color(accent: Color) -> Color {
    if accent == palette::BORDER {
        palette::ZINC_400
    } else {
        accent
    }
}

fn align_offset(alignment: HorizontalAlignment, available: f32, used: f32) -> f32 {
    match alignment {
        HorizontalAlignment::Left => 0.0,
        HorizontalAlignment::Center => ((available - used) / 2.0).max(0.0),
        HorizontalAlignment::Right => (available - used).max(0.0),
    }
}

fn load_image(source: &ImageSource, allow_tainted: bool) -> Result<Option<RgbaImage>> {
    let decoded = match source {
        ImageSource::Bytes(bytes) => image::load_from_memory(bytes),
        ImageSource::Path(path) => image::open(path),
    };
    match decoded {
        Ok(image) => Ok(Some(image.to_rgba8())),
        Err(err) if allow_tainted => {
            warn!("Skipping an embedded image that cannot be loaded: {}", err);
            Ok(None)
        }
        Err(err) => Err(Error::Capture(format!(
            "cannot load embedded image: {}",
            err
        ))),
    }
}

struct Flow<'a> {
    rasterizer: &'a Rasterizer,
    allow_tainted_images: bool,
    page_height: f32,
    padding: f32,
    items: Vec<Item>,
}

impl<'a> Flow<'a> {
    fn blocks(&mut self, blocks: &[Block], x: f32, mut y: f32, width: f32, gap: f32) -> Result<f32> {
        for (index, block) in blocks.iter().enumerate() {
            if index > 0 {
                y += gap;
            }
            y = self.block(block, x, y, width)?;
        }
        Ok(y)
    }

    fn block(&mut self, block: &Block, x: f32, y: f32, width: f32) -> Result<f32> {
        match block {
            Block::Heading { text, size, color } => Ok(self.text(
                text,
                x,
                y,
                width,
                *size,
                *color,
                Face::Bold,
                HorizontalAlignment::Left,
            )),
            Block::Paragraph(paragraph) => Ok(self.paragraph(paragraph, x, y, width)),
            Block::Metrics(grid) => Ok(self.metrics(grid, x, y, width)),
            Block::Table(table) => Ok(self.table(table, x, y, width)),
            Block::Chart(panel) => Ok(self.chart(panel, x, y, width)),
            Block::Panel(panel) => self.panel(panel, x, y, width),
            Block::Columns(columns) => self.columns(columns, x, y, width),
            Block::Image(image) => self.image(image, x, y, width),
            Block::Rule(color) => {
                self.items.push(Item::fill(x, y, width, BORDER_WIDTH, *color));
                Ok(y + BORDER_WIDTH)
            }
            Block::Spacer(height) => Ok(y + height.max(0.0)),
            Block::PageBreak => Ok(self.next_page(y)),
        }
    }

    fn next_page(&self, y: f32) -> f32 {
        if self.page_height <= 0.0 {
            return y;
        }
        ((y / self.page_height).floor() + 1.0) * self.page_height + self.padding
    }

    fn open_box(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        fill: Color,
        border: Option<Color>,
        radius: f32,
    ) -> usize {
        self.items.push(Item::Rect {
            x,
            y,
            w: width,
            h: 0.0,
            fill,
            border,
            radius,
        });
        self.items.len() - 1
    }

    fn close_box(&mut self, index: usize, bottom: f32) {
        if let Some(Item::Rect { y, h, .. }) = self.items.get_mut(index) {
            *h = (bottom - *y).max(0.0);
        }
    }

    fn emit_lines(
        &mut self,
        lines: Vec<TextLine>,
        x: f32,
        y: f32,
        width: f32,
        size: f32,
        alignment: HorizontalAlignment,
    ) -> f32 {
        let line_height = size * LINE_HEIGHT;
        let count = lines.len();
        for (index, line) in lines.into_iter().enumerate() {
            let top = y + index as f32 * line_height;
            let baseline = top + line_height * 0.5 + size * 0.35;
            let offset = align_offset(alignment, width, line.visible_width());
            for run in line.runs {
                self.items.push(Item::Text {
                    x: x + offset + run.x,
                    baseline,
                    text: run.text,
                    size,
                    color: run.color,
                    face: run.face,
                });
            }
        }
        y + count as f32 * line_height
    }

    #[allow(clippy::too_many_arguments)]
    fn text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        width: f32,
        size: f32,
        color: Color,
        face: Face,
        alignment: HorizontalAlignment,
    ) -> f32 {
        let lines = self
            .rasterizer
            .wrap(&[Piece { text, face, color }], size, width);
        self.emit_lines(lines, x, y, width, size, alignment)
    }

    fn text_height(&self, text: &str, width: f32, size: f32, face: Face) -> f32 {
        let lines = self.rasterizer.wrap(
            &[Piece {
                text,
                face,
                color: palette::WHITE,
            }],
            size,
            width,
        );
        lines.len() as f32 * size * LINE_HEIGHT
    }

    fn paragraph(&mut self, paragraph: &RichParagraph, x: f32, y: f32, width: f32) -> f32 {
        let pieces: Vec<Piece<'_>> = paragraph
            .spans()
            .iter()
            .map(|span| Piece {
                text: span.text(),
                face: Face::of(span.is_bold(), span.is_italic()),
                color: span.color().unwrap_or_else(|| paragraph.color()),
            })
            .collect();
        let lines = self.rasterizer.wrap(&pieces, paragraph.size(), width);
        self.emit_lines(lines, x, y, width, paragraph.size(), paragraph.alignment())
    }

    fn card_height(&self, card: &MetricCard, width: f32, value_size: f32) -> f32 {
        let mut height = 2.0 * CARD_PADDING
            + self.text_height(&card.label, width, 12.0, Face::Regular)
            + 6.0
            + self.text_height(&card.value, width, value_size, Face::Bold);
        if let Some(caption) = &card.caption {
            height += 6.0 + self.text_height(caption, width, 11.0, Face::Regular);
        }
        height
    }

    fn metrics(&mut self, grid: &MetricGrid, x: f32, mut y: f32, width: f32) -> f32 {
        let columns = grid.columns.max(1);
        let card_width =
            ((width - CARD_GAP * (columns - 1) as f32) / columns as f32).max(2.0 * CARD_PADDING + 1.0);
        let inner = card_width - 2.0 * CARD_PADDING;

        for (row_index, row) in grid.cards.chunks(columns).enumerate() {
            if row_index > 0 {
                y += CARD_GAP;
            }
            let row_height = row
                .iter()
                .map(|card| self.card_height(card, inner, grid.value_size))
                .fold(0.0_f32, f32::max);

            for (column, card) in row.iter().enumerate() {
                let card_x = x + column as f32 * (card_width + CARD_GAP);
                let (fill, border, muted, caption_color) = if card.highlighted {
                    (card.accent, None, palette::WHITE, palette::WHITE)
                } else {
                    (palette::ZINC_900, Some(card.accent), palette::ZINC_400, card.accent)
                };
                self.items.push(Item::Rect {
                    x: card_x,
                    y,
                    w: card_width,
                    h: row_height,
                    fill,
                    border,
                    radius: RADIUS,
                });

                let left = card_x + CARD_PADDING;
                let mut cursor = y + CARD_PADDING;
                cursor = self.text(
                    &card.label,
                    left,
                    cursor,
                    inner,
                    12.0,
                    muted,
                    Face::Regular,
                    HorizontalAlignment::Left,
                ) + 6.0;
                cursor = self.text(
                    &card.value,
                    left,
                    cursor,
                    inner,
                    grid.value_size,
                    palette::WHITE,
                    Face::Bold,
                    HorizontalAlignment::Left,
                );
                if let Some(caption) = &card.caption {
                    self.text(
                        caption,
                        left,
                        cursor + 6.0,
                        inner,
                        11.0,
                        caption_color,
                        Face::Regular,
                        HorizontalAlignment::Left,
                    );
                }
            }
            y += row_height;
        }
        y
    }

    fn table(&mut self, table: &Table, x: f32, y: f32, width: f32) -> f32 {
        let total: f32 = table.weights.iter().sum();
        let widths: Vec<f32> = if total > 0.0 {
            table.weights.iter().map(|w| width * w / total).collect()
        } else {
            let count = table.column_count().max(1);
            vec![width / count as f32; count]
        };

        let frame = self.open_box(x, y, width, palette::ZINC_900, Some(palette::BORDER), 8.0);
        let mut cursor = y;
        if !table.headers.is_empty() {
            cursor = self.table_row(
                &table.headers,
                &widths,
                &table.alignments,
                x,
                cursor,
                Some(palette::SURFACE_RAISED),
                Face::Bold,
                12.0,
            );
        }
        for row in &table.rows {
            self.items
                .push(Item::fill(x, cursor, width, BORDER_WIDTH, palette::BORDER));
            cursor = self.table_row(
                row,
                &widths,
                &table.alignments,
                x,
                cursor,
                None,
                Face::Regular,
                13.0,
            );
        }
        self.close_box(frame, cursor);
        cursor
    }

    #[allow(clippy::too_many_arguments)]
    fn table_row(
        &mut self,
        cells: &[String],
        widths: &[f32],
        alignments: &[HorizontalAlignment],
        x: f32,
        y: f32,
        fill: Option<Color>,
        face: Face,
        size: f32,
    ) -> f32 {
        let wrapped: Vec<Vec<TextLine>> = widths
            .iter()
            .enumerate()
            .map(|(index, width)| {
                let text = cells.get(index).map(String::as_str).unwrap_or("");
                self.rasterizer.wrap(
                    &[Piece {
                        text,
                        face,
                        color: palette::SLATE_300,
                    }],
                    size,
                    (width - 2.0 * CELL_PADDING).max(1.0),
                )
            })
            .collect();
        let line_count = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let height = line_count as f32 * size * LINE_HEIGHT + 2.0 * CELL_PADDING;

        if let Some(fill) = fill {
            let row_width: f32 = widths.iter().sum();
            self.items.push(Item::fill(x, y, row_width, height, fill));
        }
        let mut cell_x = x;
        for (index, lines) in wrapped.into_iter().enumerate() {
            let alignment = alignments
                .get(index)
                .copied()
                .unwrap_or(HorizontalAlignment::Left);
            let cell_width = widths[index];
            self.emit_lines(
                lines,
                cell_x + CELL_PADDING,
                y + CELL_PADDING,
                (cell_width - 2.0 * CELL_PADDING).max(1.0),
                size,
                alignment,
            );
            cell_x += cell_width;
        }
        y + height
    }

    fn chart(&mut self, panel: &ChartPanel, x: f32, y: f32, width: f32) -> f32 {
        let frame = self.open_box(x, y, width, palette::ZINC_900, Some(palette::BORDER), RADIUS);
        let inner_x = x + PANEL_PADDING;
        let inner = (width - 2.0 * PANEL_PADDING).max(1.0);
        let mut cursor = y + PANEL_PADDING;
        cursor = self.text(
            &panel.title,
            inner_x,
            cursor,
            inner,
            16.0,
            palette::WHITE,
            Face::Bold,
            HorizontalAlignment::Left,
        ) + 12.0;

        let height = panel.chart_height.max(0.0);
        match &panel.chart {
            Some(chart) => {
                let chart = chart.clone().resized(f64::from(inner), f64::from(height));
                self.items.push(Item::Shapes {
                    x: inner_x,
                    y: cursor,
                    shapes: chart.shapes(),
                });
            }
            None => {
                let glyph_top = cursor + (height - 32.0 * LINE_HEIGHT).max(0.0) / 2.0;
                self.text(
                    PLACEHOLDER,
                    inner_x,
                    glyph_top,
                    inner,
                    32.0,
                    palette::SLATE_500,
                    Face::Regular,
                    HorizontalAlignment::Center,
                );
            }
        }
        cursor += height;

        if let Some(caption) = &panel.caption {
            cursor = self.text(
                caption,
                inner_x,
                cursor + 8.0,
                inner,
                12.0,
                palette::ZINC_400,
                Face::Regular,
                HorizontalAlignment::Center,
            );
        }
        let bottom = cursor + PANEL_PADDING;
        self.close_box(frame, bottom);
        bottom
    }

    fn panel(&mut self, panel: &Panel, x: f32, y: f32, width: f32) -> Result<f32> {
        let frame = self.open_box(x, y, width, panel.fill, Some(panel.accent), RADIUS);
        let inner_x = x + PANEL_PADDING;
        let inner = (width - 2.0 * PANEL_PADDING).max(1.0);
        let mut cursor = y + PANEL_PADDING;
        if let Some(title) = &panel.title {
            cursor = self.text(
                title,
                inner_x,
                cursor,
                inner,
                14.0,
                title_color(panel.accent),
                Face::Bold,
                HorizontalAlignment::Left,
            );
            if !panel.blocks.is_empty() {
                cursor += NESTED_GAP;
            }
        }
        cursor = self.blocks(&panel.blocks, inner_x, cursor, inner, NESTED_GAP)?;
        let bottom = cursor + PANEL_PADDING;
        self.close_box(frame, bottom);
        Ok(bottom)
    }

    fn columns(&mut self, columns: &Columns, x: f32, y: f32, width: f32) -> Result<f32> {
        let count = columns.columns.len();
        if count == 0 {
            return Ok(y);
        }
        let available = (width - columns.gap * (count - 1) as f32).max(count as f32);
        let total: f32 = columns.weights.iter().take(count).sum();

        let mut bottom = y;
        let mut cursor_x = x;
        for (index, blocks) in columns.columns.iter().enumerate() {
            let column_width = if total > 0.0 {
                available * columns.weights.get(index).copied().unwrap_or(1.0) / total
            } else {
                available / count as f32
            };
            bottom = bottom.max(self.blocks(blocks, cursor_x, y, column_width, NESTED_GAP)?);
            cursor_x += column_width + columns.gap;
        }
        Ok(bottom)
    }

    fn image(&mut self, block: &ImageBlock, x: f32, y: f32, width: f32) -> Result<f32> {
        let bottom = y + block.height().max(0.0);
        let Some(picture) = load_image(block.source(), self.allow_tainted_images)? else {
            return Ok(bottom);
        };
        let (image_width, image_height) = picture.dimensions();
        if image_width == 0 || image_height == 0 {
            return Ok(bottom);
        }

        let box_width = block.width().min(width);
        let scale = (box_width / image_width as f32).min(block.height() / image_height as f32);
        let w = image_width as f32 * scale;
        let h = image_height as f32 * scale;
        let offset = align_offset(block.alignment(), width, w);
        self.items.push(Item::Picture {
            x: x + offset,
            y: y + (block.height() - h) / 2.0,
            w,
            h,
            image: picture,
        });
        Ok(bottom)
    }
}

struct Canvas {
    image: RgbImage,
    ratio: f32,
}

impl Canvas {
    fn new(width: u32, height: u32, ratio: f32, background: Color) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, Rgb([background.r, background.g, background.b])),
            ratio,
        }
    }

    fn blend(&mut self, x: i64, y: i64, color: Color, alpha: f32) {
        if x < 0
            || y < 0
            || x >= i64::from(self.image.width())
            || y >= i64::from(self.image.height())
            || alpha <= 0.0
        {
            return;
        }
        let alpha = alpha.min(1.0);
        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        for (channel, target) in pixel.0.iter_mut().zip([color.r, color.g, color.b]) {
            let current = f32::from(*channel);
            *channel = (current + (f32::from(target) - current) * alpha).round() as u8;
        }
    }

    /// Fills every device pixel whose center, in CSS coordinates, satisfies `inside`.
    fn fill_where(
        &mut self,
        (left, top, right, bottom): (f32, f32, f32, f32),
        color: Color,
        inside: impl Fn(f32, f32) -> bool,
    ) {
        if !(left.is_finite() && top.is_finite() && right.is_finite() && bottom.is_finite()) {
            return;
        }
        let max_x = i64::from(self.image.width());
        let max_y = i64::from(self.image.height());
        let x0 = ((left * self.ratio).floor() as i64).max(0);
        let y0 = ((top * self.ratio).floor() as i64).max(0);
        let x1 = ((right * self.ratio).ceil() as i64).min(max_x);
        let y1 = ((bottom * self.ratio).ceil() as i64).min(max_y);
        for py in y0..y1 {
            let cy = (py as f32 + 0.5) / self.ratio;
            for px in x0..x1 {
                let cx = (px as f32 + 0.5) / self.ratio;
                if inside(cx, cy) {
                    self.blend(px, py, color, 1.0);
                }
            }
        }
    }

    fn fill_rounded(&mut self, x: f32, y: f32, w: f32, h: f32, radius: f32, color: Color) {
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let radius = radius.min(w / 2.0).min(h / 2.0).max(0.0);
        self.fill_where((x, y, x + w, y + h), color, |px, py| {
            if px < x || py < y || px > x + w || py > y + h {
                return false;
            }
            let nearest_x = px.max(x + radius).min(x + w - radius);
            let nearest_y = py.max(y + radius).min(y + h - radius);
            let (dx, dy) = (px - nearest_x, py - nearest_y);
            dx * dx + dy * dy <= radius * radius
        });
    }

    fn stroke_segment(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color) {
        let half = (width / 2.0).max(0.5 / self.ratio);
        let bounds = (
            from.0.min(to.0) - half,
            from.1.min(to.1) - half,
            from.0.max(to.0) + half,
            from.1.max(to.1) + half,
        );
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let length_sq = dx * dx + dy * dy;
        self.fill_where(bounds, color, |px, py| {
            let t = if length_sq > 0.0 {
                (((px - from.0) * dx + (py - from.1) * dy) / length_sq).max(0.0).min(1.0)
            } else {
                0.0
            };
            let (nx, ny) = (from.0 + t * dx - px, from.1 + t * dy - py);
            nx * nx + ny * ny <= half * half
        });
    }

    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Color) {
        let bounds = (
            center.0 - radius,
            center.1 - radius,
            center.0 + radius,
            center.1 + radius,
        );
        self.fill_where(bounds, color, |px, py| {
            let (dx, dy) = (px - center.0, py - center.1);
            dx * dx + dy * dy <= radius * radius
        });
    }

    fn fill_annulus(
        &mut self,
        center: (f32, f32),
        inner: f32,
        outer: f32,
        start_deg: f32,
        sweep_deg: f32,
        color: Color,
    ) {
        if outer <= 0.0 || sweep_deg <= 0.0 {
            return;
        }
        let bounds = (
            center.0 - outer,
            center.1 - outer,
            center.0 + outer,
            center.1 + outer,
        );
        let full = sweep_deg >= 360.0;
        self.fill_where(bounds, color, |px, py| {
            let (dx, dy) = (px - center.0, py - center.1);
            let distance = (dx * dx + dy * dy).sqrt();
            if distance < inner || distance > outer {
                return false;
            }
            if full {
                return true;
            }
            let angle = dy.atan2(dx).to_degrees();
            (angle - start_deg).rem_euclid(360.0) <= sweep_deg
        });
    }

    fn draw_text(
        &mut self,
        faces: &Faces,
        (x, baseline): (f32, f32),
        text: &str,
        size: f32,
        color: Color,
        face: Face,
    ) {
        let scale = Scale::uniform(size * self.ratio);
        let start = point(x * self.ratio, baseline * self.ratio);
        for glyph in faces.get(face).layout(text, scale, start) {
            if let Some(bounds) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, coverage| {
                    self.blend(
                        i64::from(bounds.min.x) + i64::from(gx),
                        i64::from(bounds.min.y) + i64::from(gy),
                        color,
                        coverage,
                    );
                });
            }
        }
    }

    fn draw_picture(&mut self, x: f32, y: f32, w: f32, h: f32, picture: &RgbaImage) {
        let target_width = (w * self.ratio).round() as u32;
        let target_height = (h * self.ratio).round() as u32;
        if target_width == 0 || target_height == 0 {
            return;
        }
        let resized = imageops::resize(picture, target_width, target_height, FilterType::Triangle);
        let left = (x * self.ratio).round() as i64;
        let top = (y * self.ratio).round() as i64;
        for (px, py, pixel) in resized.enumerate_pixels() {
            let [r, g, b, a] = pixel.0;
            self.blend(
                left + i64::from(px),
                top + i64::from(py),
                Color::rgb(r, g, b),
                f32::from(a) / 255.0,
            );
        }
    }

    fn paint_shape(&mut self, shape: &Shape, (ox, oy): (f32, f32), faces: Option<&Faces>) {
        let at = |p: &Point| (ox + p.x as f32, oy + p.y as f32);
        match shape {
            Shape::Line {
                from,
                to,
                stroke,
                width,
            } => self.stroke_segment(at(from), at(to), *width as f32, *stroke),
            Shape::Rect {
                origin,
                width,
                height,
                fill,
                radius,
            } => {
                let (x, y) = at(origin);
                self.fill_rounded(x, y, *width as f32, *height as f32, *radius as f32, *fill);
            }
            Shape::Annulus {
                center,
                inner_radius,
                outer_radius,
                start_deg,
                sweep_deg,
                fill,
            } => self.fill_annulus(
                at(center),
                *inner_radius as f32,
                *outer_radius as f32,
                *start_deg as f32,
                *sweep_deg as f32,
                *fill,
            ),
            Shape::Polyline {
                points,
                stroke,
                width,
            } => {
                for pair in points.windows(2) {
                    self.stroke_segment(at(&pair[0]), at(&pair[1]), *width as f32, *stroke);
                }
            }
            Shape::Circle {
                center,
                radius,
                fill,
            } => self.fill_circle(at(center), *radius as f32, *fill),
            Shape::Label {
                anchor,
                text,
                size,
                color,
            } => {
                if let Some(faces) = faces {
                    let size = *size as f32;
                    let (x, baseline) = at(anchor);
                    let width = faces.width(text, size, Face::Regular);
                    self.draw_text(
                        faces,
                        (x - width / 2.0, baseline),
                        text,
                        size,
                        *color,
                        Face::Regular,
                    );
                }
            }
        }
    }

    fn paint(&mut self, item: &Item, faces: Option<&Faces>) {
        match item {
            Item::Rect {
                x,
                y,
                w,
                h,
                fill,
                border,
                radius,
            } => match border {
                Some(border) => {
                    self.fill_rounded(*x, *y, *w, *h, *radius, *border);
                    self.fill_rounded(
                        x + BORDER_WIDTH,
                        y + BORDER_WIDTH,
                        w - 2.0 * BORDER_WIDTH,
                        h - 2.0 * BORDER_WIDTH,
                        (radius - BORDER_WIDTH).max(0.0),
                        *fill,
                    );
                }
                None => self.fill_rounded(*x, *y, *w, *h, *radius, *fill),
            },
            Item::Text {
                x,
                baseline,
                text,
                size,
                color,
                face,
            } => {
                if let Some(faces) = faces {
                    self.draw_text(faces, (*x, *baseline), text, *size, *color, *face);
                }
            }
            Item::Shapes { x, y, shapes } => {
                for shape in shapes {
                    self.paint_shape(shape, (*x, *y), faces);
                }
            }
            Item::Picture { x, y, w, h, image } => self.draw_picture(*x, *y, *w, *h, image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{Datum, PieChart};
    use crate::model::{Orientation, PageLayout};

    fn document() -> Document {
        Document::new("Test", Orientation::Portrait.layout())
    }

    fn options() -> CaptureOptions {
        CaptureOptions::for_format(crate::export::ExportFormat::Png).with_pixel_ratio(1.0)
    }

    #[test]
    fn short_documents_fill_one_page() {
        let layout = Rasterizer::without_fonts()
            .layout(&document().with_block(Block::heading("Raport", 24.0)), true)
            .expect("layout");
        assert_eq!(layout.width(), 794.0);
        assert_eq!(layout.height(), 1123.0);
    }

    #[test]
    fn min_height_and_tall_content_extend_the_page() {
        let rasterizer = Rasterizer::without_fonts();
        let layout = rasterizer
            .layout(&document().with_min_height(1400.0), true)
            .expect("layout");
        assert_eq!(layout.height(), 1400.0);

        let tall = document().with_blocks((0..30).map(|_| Block::Spacer(100.0)));
        let layout = rasterizer.layout(&tall, true).expect("layout");
        assert_eq!(layout.height(), 48.0 + 3000.0 + 48.0);
    }

    #[test]
    fn long_paragraphs_wrap() {
        let words = vec!["rekomendacja"; 60].join(" ");
        let layout = Rasterizer::without_fonts()
            .layout(&document().with_block(Block::text(words, 14.0, palette::WHITE)), true)
            .expect("layout");
        assert!(layout.texts().len() > 1);
        assert!(layout.texts().iter().all(|line| !line.starts_with(' ')));
    }

    #[test]
    fn missing_chart_renders_placeholder() {
        let panel = ChartPanel {
            title: "Zasięg tygodniowy".into(),
            chart: None,
            caption: None,
            chart_height: 200.0,
        };
        let layout = Rasterizer::without_fonts()
            .layout(&document().with_block(Block::Chart(panel)), true)
            .expect("layout");
        assert!(layout.texts().contains(&PLACEHOLDER));
        assert_eq!(layout.chart_count(), 0);
    }

    #[test]
    fn capture_paints_background_at_ratio() {
        let capture = Rasterizer::without_fonts()
            .capture(&document(), &options().with_pixel_ratio(0.5))
            .expect("capture");
        assert_eq!(capture.image().dimensions(), (397, 562));
        let pixel = capture.image().get_pixel(0, 0);
        let bg = palette::BACKGROUND;
        assert_eq!(pixel.0, [bg.r, bg.g, bg.b]);
    }

    #[test]
    fn invalid_pixel_ratio_is_rejected() {
        let err = Rasterizer::without_fonts()
            .capture(&document(), &options().with_pixel_ratio(0.0))
            .unwrap_err();
        assert!(matches!(err, Error::Capture(_)));
    }

    #[test]
    fn broken_images_depend_on_taint_tolerance() {
        let doc = Document::new("Logo", PageLayout::PORTRAIT).with_block(Block::Image(
            ImageBlock::new(ImageSource::from_bytes(vec![1, 2, 3]), 100.0, 40.0),
        ));
        let rasterizer = Rasterizer::without_fonts();
        assert!(rasterizer.layout(&doc, true).is_ok());
        assert!(matches!(rasterizer.layout(&doc, false), Err(Error::Capture(_))));
    }

    #[test]
    fn donut_is_painted_from_the_top() {
        let chart = Chart::from(PieChart::new(vec![
            Datum::new("Skuteczność", 100.0).with_color(palette::PINK)
        ]));
        let image = Rasterizer::without_fonts().chart_image(&chart, 1.0, palette::BACKGROUND);
        assert_eq!(image.dimensions(), (200, 200));
        let ring = image.get_pixel(100, 40);
        assert_eq!(ring.0, [palette::PINK.r, palette::PINK.g, palette::PINK.b]);
        let hole = image.get_pixel(100, 100);
        let bg = palette::BACKGROUND;
        assert_eq!(hole.0, [bg.r, bg.g, bg.b]);
    }

    #[test]
    fn png_encoding_produces_signature() {
        let capture = Rasterizer::without_fonts()
            .capture(&document(), &options().with_pixel_ratio(0.25))
            .expect("capture");
        let png = capture.to_png().expect("png");
        assert_eq!(&png[1..4], b"PNG");
    }
}

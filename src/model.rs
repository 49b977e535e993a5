//! Data structures describing a fixed-size visual document.
//!
//! Templates produce these values and renderers consume them.  The types avoid
//! referencing any rendering crate so the same description can be rasterized, laid out
//! by the flow PDF backend, or inspected in tests.  All lengths are CSS pixels of the
//! page the document was designed for.

use std::fmt;

use crate::charts::Chart;
use crate::richtext::Span;

/// Glyph printed wherever an optional value is missing.
pub const PLACEHOLDER: &str = "—";

/// An opaque RGB color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Creates a color from its channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#RRGGBB` or `RRGGBB`.
    pub fn from_hex(value: &str) -> Option<Self> {
        let hex = value.strip_prefix('#').unwrap_or(value);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Formats the color as `#rrggbb`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear blend towards `other`; `t = 0` keeps `self`.
    pub fn mix(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let blend = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color::rgb(
            blend(self.r, other.r),
            blend(self.g, other.g),
            blend(self.b, other.b),
        )
    }

    /// Whether the color is bright enough to vanish on white paper.
    pub fn is_light(&self) -> bool {
        let luminance = 0.2126 * self.r as f32 + 0.7152 * self.g as f32 + 0.0722 * self.b as f32;
        luminance > 200.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Brand colors of the dark document theme.
pub mod palette {
    use super::Color;

    pub const BACKGROUND: Color = Color::rgb(0x05, 0x05, 0x09);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const SURFACE: Color = Color::rgb(0x0f, 0x17, 0x2a);
    pub const SURFACE_RAISED: Color = Color::rgb(0x1e, 0x29, 0x3b);
    pub const ZINC_900: Color = Color::rgb(0x18, 0x18, 0x1b);
    pub const BORDER: Color = Color::rgb(0x27, 0x27, 0x2a);
    pub const TRACK: Color = Color::rgb(0x27, 0x27, 0x2a);
    pub const AXIS: Color = Color::rgb(0x3f, 0x3f, 0x46);
    pub const SLATE_300: Color = Color::rgb(0xcb, 0xd5, 0xe1);
    pub const SLATE_400: Color = Color::rgb(0x94, 0xa3, 0xb8);
    pub const SLATE_500: Color = Color::rgb(0x64, 0x74, 0x8b);
    pub const SLATE_700: Color = Color::rgb(0x33, 0x41, 0x55);
    pub const ZINC_400: Color = Color::rgb(0xa1, 0xa1, 0xaa);
    pub const PINK: Color = Color::rgb(0xec, 0x48, 0x99);
    pub const PURPLE: Color = Color::rgb(0xa8, 0x55, 0xf7);
    pub const BLUE: Color = Color::rgb(0x3b, 0x82, 0xf6);
    pub const ROSE: Color = Color::rgb(0xf4, 0x3f, 0x5e);
    pub const EMERALD: Color = Color::rgb(0x10, 0xb9, 0x81);
    pub const AMBER: Color = Color::rgb(0xf5, 0x9e, 0x0b);
}

/// Page orientation; each orientation has its own fixed page layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// A4-like portrait page.
    #[default]
    Portrait,
    /// 16:9 landscape slide.
    Landscape,
}

impl Orientation {
    /// Page layout used for this orientation.
    pub fn layout(self) -> PageLayout {
        match self {
            Orientation::Portrait => PageLayout::PORTRAIT,
            Orientation::Landscape => PageLayout::LANDSCAPE,
        }
    }

    /// Lower-case name used in history subtypes and CLI flags.
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }

    /// Inverse of [`Orientation::as_str`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "portrait" => Some(Orientation::Portrait),
            "landscape" => Some(Orientation::Landscape),
            _ => None,
        }
    }
}

/// Size of one page in CSS pixels; exported PDFs use the same numbers as points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageLayout {
    /// Page width.
    pub width: f32,
    /// Page height.
    pub height: f32,
}

impl PageLayout {
    /// Portrait page, 794x1123.
    pub const PORTRAIT: PageLayout = PageLayout {
        width: 794.0,
        height: 1123.0,
    };

    /// Landscape slide, 1600x900.
    pub const LANDSCAPE: PageLayout = PageLayout {
        width: 1600.0,
        height: 900.0,
    };
}

/// Horizontal placement of text and images.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    /// Left aligned content.
    #[default]
    Left,
    /// Center aligned content.
    Center,
    /// Right aligned content.
    Right,
}

/// Rich text paragraph carrying inline spans, a font size and a base color.
#[derive(Clone, Debug, PartialEq)]
pub struct RichParagraph {
    spans: Vec<Span>,
    alignment: HorizontalAlignment,
    size: f32,
    color: Color,
}

impl Default for RichParagraph {
    fn default() -> Self {
        Self {
            spans: Vec::new(),
            alignment: HorizontalAlignment::Left,
            size: 14.0,
            color: palette::SLATE_300,
        }
    }
}

impl RichParagraph {
    /// Creates a paragraph from the provided spans.
    pub fn new(spans: impl Into<Vec<Span>>) -> Self {
        Self {
            spans: spans.into(),
            ..Self::default()
        }
    }

    /// Creates a paragraph holding a single unstyled span.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(vec![Span::new(text)])
    }

    /// Returns the spans that make up the paragraph.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Returns the configured alignment.
    pub fn alignment(&self) -> HorizontalAlignment {
        self.alignment
    }

    /// Returns the font size.
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Returns the color used by spans without their own color.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Concatenated text of every span.
    pub fn text(&self) -> String {
        self.spans.iter().map(Span::text).collect()
    }

    /// Sets the alignment and returns the updated paragraph.
    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Sets the font size and returns the updated paragraph.
    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    /// Sets the base color and returns the updated paragraph.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

/// Representation of image sources supported by the content model.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageSource {
    /// Image loaded from raw bytes.
    Bytes(Vec<u8>),
    /// Image referenced by a file path.
    Path(String),
}

impl ImageSource {
    /// Creates a new in-memory image from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Creates an image sourced from a file path.
    pub fn from_path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }
}

/// An embedded picture such as the agency logo.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBlock {
    source: ImageSource,
    alignment: HorizontalAlignment,
    width: f32,
    height: f32,
}

impl ImageBlock {
    /// Creates an image block drawn into a `width` x `height` box.
    pub fn new(source: ImageSource, width: f32, height: f32) -> Self {
        Self {
            source,
            alignment: HorizontalAlignment::Left,
            width,
            height,
        }
    }

    /// Returns the image source.
    pub fn source(&self) -> &ImageSource {
        &self.source
    }

    /// Returns the configured alignment.
    pub fn alignment(&self) -> HorizontalAlignment {
        self.alignment
    }

    /// Returns the box width.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Returns the box height.
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Sets the alignment and returns the updated image block.
    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }
}

/// A headline number with its label, e.g. "Zasięg / 85,000".
#[derive(Clone, Debug, PartialEq)]
pub struct MetricCard {
    /// Small label above the value.
    pub label: String,
    /// The value as displayed.
    pub value: String,
    /// Optional note under the value.
    pub caption: Option<String>,
    /// Accent used for the card border and caption.
    pub accent: Color,
    /// Filled cards use the accent as background.
    pub highlighted: bool,
}

impl MetricCard {
    /// Creates a plain card.
    pub fn new(label: impl Into<String>, value: impl Into<String>, accent: Color) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            caption: None,
            accent,
            highlighted: false,
        }
    }

    /// Sets the caption and returns the updated card.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Marks the card as highlighted.
    pub fn highlighted(mut self) -> Self {
        self.highlighted = true;
        self
    }
}

/// Cards laid out in a fixed number of equal columns.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricGrid {
    /// Number of columns, at least one.
    pub columns: usize,
    /// Cards in reading order.
    pub cards: Vec<MetricCard>,
    /// Font size of the card values.
    pub value_size: f32,
}

/// A simple table with weighted columns.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    /// Header cells; may be empty for key/value tables.
    pub headers: Vec<String>,
    /// Body rows.
    pub rows: Vec<Vec<String>>,
    /// Relative column widths.
    pub weights: Vec<f32>,
    /// Per-column alignment.
    pub alignments: Vec<HorizontalAlignment>,
}

impl Table {
    /// Creates a table with equally weighted, left aligned columns.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let columns = headers
            .len()
            .max(rows.iter().map(Vec::len).max().unwrap_or(0))
            .max(1);
        Self {
            headers,
            rows,
            weights: vec![1.0; columns],
            alignments: vec![HorizontalAlignment::Left; columns],
        }
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.weights.len()
    }

    /// Sets the column weights; ignored when the count does not match.
    pub fn with_weights(mut self, weights: Vec<f32>) -> Self {
        if weights.len() == self.weights.len() {
            self.weights = weights;
        }
        self
    }

    /// Sets the column alignments; ignored when the count does not match.
    pub fn with_alignments(mut self, alignments: Vec<HorizontalAlignment>) -> Self {
        if alignments.len() == self.alignments.len() {
            self.alignments = alignments;
        }
        self
    }
}

/// A titled chart; `chart` is `None` when the data was not provided.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartPanel {
    /// Panel title.
    pub title: String,
    /// The chart, or `None` to render the placeholder.
    pub chart: Option<Chart>,
    /// Text under the chart.
    pub caption: Option<String>,
    /// Height reserved for the chart drawing.
    pub chart_height: f32,
}

/// A rounded, tinted box grouping other blocks.
#[derive(Clone, Debug, PartialEq)]
pub struct Panel {
    /// Optional heading inside the box.
    pub title: Option<String>,
    /// Border and title color.
    pub accent: Color,
    /// Background fill.
    pub fill: Color,
    /// Nested content.
    pub blocks: Vec<Block>,
}

impl Panel {
    /// Creates an untitled panel.
    pub fn new(accent: Color, fill: Color) -> Self {
        Self {
            title: None,
            accent,
            fill,
            blocks: Vec::new(),
        }
    }

    /// Sets the title and returns the updated panel.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Appends a block and returns the updated panel.
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Extends the panel with multiple blocks.
    pub fn with_blocks<I>(mut self, blocks: I) -> Self
    where
        I: IntoIterator<Item = Block>,
    {
        self.blocks.extend(blocks);
        self
    }
}

/// Side-by-side columns with relative widths.
#[derive(Clone, Debug, PartialEq)]
pub struct Columns {
    /// Relative column widths.
    pub weights: Vec<f32>,
    /// Gap between columns.
    pub gap: f32,
    /// Column contents.
    pub columns: Vec<Vec<Block>>,
}

impl Columns {
    /// Creates equally weighted columns.
    pub fn equal(columns: Vec<Vec<Block>>) -> Self {
        Self {
            weights: vec![1.0; columns.len()],
            gap: 24.0,
            columns,
        }
    }

    /// Creates weighted columns; missing weights default to 1.
    pub fn weighted(weights: Vec<f32>, columns: Vec<Vec<Block>>) -> Self {
        let mut weights = weights;
        weights.resize(columns.len(), 1.0);
        Self {
            weights,
            gap: 24.0,
            columns,
        }
    }
}

/// Individual content blocks that make up a document.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    /// Bold heading line.
    Heading {
        /// Heading text.
        text: String,
        /// Font size.
        size: f32,
        /// Text color.
        color: Color,
    },
    /// Styled paragraph content.
    Paragraph(RichParagraph),
    /// Grid of metric cards.
    Metrics(MetricGrid),
    /// Tabular content.
    Table(Table),
    /// Titled chart or placeholder.
    Chart(ChartPanel),
    /// Tinted box with nested blocks.
    Panel(Panel),
    /// Side-by-side blocks.
    Columns(Columns),
    /// Embedded picture.
    Image(ImageBlock),
    /// Thin horizontal divider.
    Rule(Color),
    /// Vertical whitespace.
    Spacer(f32),
    /// Explicit page break request.
    PageBreak,
}

impl Block {
    /// Heading with the default white color.
    pub fn heading(text: impl Into<String>, size: f32) -> Self {
        Self::Heading {
            text: text.into(),
            size,
            color: palette::WHITE,
        }
    }

    /// Convenience helper for building a paragraph block.
    pub fn paragraph(spans: impl Into<Vec<Span>>) -> Self {
        Self::Paragraph(RichParagraph::new(spans))
    }

    /// Paragraph with a single unstyled span.
    pub fn text(text: impl Into<String>, size: f32, color: Color) -> Self {
        Self::Paragraph(RichParagraph::plain(text).with_size(size).with_color(color))
    }

    /// Convenience helper that yields an explicit page break block.
    pub fn page_break() -> Self {
        Self::PageBreak
    }
}

/// A complete document ready to be rendered.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    title: String,
    layout: PageLayout,
    background: Color,
    padding: f32,
    min_height: Option<f32>,
    footer: Option<String>,
    blocks: Vec<Block>,
}

impl Document {
    /// Creates an empty document for the given page layout.
    pub fn new(title: impl Into<String>, layout: PageLayout) -> Self {
        Self {
            title: title.into(),
            layout,
            background: palette::BACKGROUND,
            padding: 48.0,
            min_height: None,
            footer: None,
            blocks: Vec::new(),
        }
    }

    /// Returns the document title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the page layout.
    pub fn layout(&self) -> PageLayout {
        self.layout
    }

    /// Returns the page background.
    pub fn background(&self) -> Color {
        self.background
    }

    /// Returns the inner page padding.
    pub fn padding(&self) -> f32 {
        self.padding
    }

    /// Returns the minimum content height, if any.
    pub fn min_height(&self) -> Option<f32> {
        self.min_height
    }

    /// Returns the running footer text used by paginating backends.
    pub fn footer(&self) -> Option<&str> {
        self.footer.as_deref()
    }

    /// Returns the content blocks.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Sets the background and returns the updated document.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Sets the padding and returns the updated document.
    pub fn with_padding(mut self, padding: f32) -> Self {
        self.padding = padding;
        self
    }

    /// Forces the content to be at least `height` pixels tall.
    pub fn with_min_height(mut self, height: f32) -> Self {
        self.min_height = Some(height);
        self
    }

    /// Sets the running footer and returns the updated document.
    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Appends a block and returns the updated document.
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Appends a block in place.
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Appends multiple blocks in place.
    pub fn extend<I>(&mut self, blocks: I)
    where
        I: IntoIterator<Item = Block>,
    {
        self.blocks.extend(blocks);
    }

    /// Extends the document with multiple blocks and returns the updated instance.
    pub fn with_blocks<I>(mut self, blocks: I) -> Self
    where
        I: IntoIterator<Item = Block>,
    {
        self.blocks.extend(blocks);
        self
    }

    /// Walks every block, nested ones included, in document order.
    pub fn visit_blocks<'a>(&'a self, visitor: &mut dyn FnMut(&'a Block)) {
        fn walk<'a>(blocks: &'a [Block], visitor: &mut dyn FnMut(&'a Block)) {
            for block in blocks {
                visitor(block);
                match block {
                    Block::Panel(panel) => walk(&panel.blocks, visitor),
                    Block::Columns(columns) => {
                        for column in &columns.columns {
                            walk(column, visitor);
                        }
                    }
                    _ => {}
                }
            }
        }
        walk(&self.blocks, visitor);
    }

    /// Every piece of text in the document, for searching and tests.
    pub fn plain_text(&self) -> String {
        let mut out = Vec::new();
        self.visit_blocks(&mut |block| match block {
            Block::Heading { text, .. } => out.push(text.clone()),
            Block::Paragraph(paragraph) => out.push(paragraph.text()),
            Block::Metrics(grid) => {
                for card in &grid.cards {
                    out.push(card.label.clone());
                    out.push(card.value.clone());
                    out.extend(card.caption.clone());
                }
            }
            Block::Table(table) => {
                out.extend(table.headers.iter().cloned());
                for row in &table.rows {
                    out.extend(row.iter().cloned());
                }
            }
            Block::Chart(panel) => {
                out.push(panel.title.clone());
                if panel.chart.is_none() {
                    out.push(PLACEHOLDER.to_owned());
                }
                out.extend(panel.caption.clone());
            }
            Block::Panel(panel) => out.extend(panel.title.clone()),
            _ => {}
        });
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_round_trip() {
        let color = Color::from_hex("#EC4899").expect("valid hex");
        assert_eq!(color, palette::PINK);
        assert_eq!(color.to_hex(), "#ec4899");
        assert_eq!(Color::from_hex("#12FG34"), None);
        assert_eq!(Color::from_hex("#fff"), None);
    }

    #[test]
    fn light_colors_are_detected() {
        assert!(palette::WHITE.is_light());
        assert!(palette::SLATE_300.is_light());
        assert!(!palette::BACKGROUND.is_light());
        assert!(!palette::PINK.is_light());
    }

    #[test]
    fn mixing_interpolates_channels() {
        let mid = palette::BLACK.mix(palette::WHITE, 0.5);
        assert_eq!(mid, Color::rgb(128, 128, 128));
        assert_eq!(palette::PINK.mix(palette::WHITE, 0.0), palette::PINK);
    }

    #[test]
    fn table_weights_must_match_columns() {
        let table = Table::new(vec!["a".into(), "b".into()], Vec::new()).with_weights(vec![3.0]);
        assert_eq!(table.weights, vec![1.0, 1.0]);
    }

    #[test]
    fn plain_text_descends_into_panels_and_columns() {
        let document = Document::new("t", PageLayout::PORTRAIT).with_block(Block::Columns(
            Columns::equal(vec![vec![Block::Panel(
                Panel::new(palette::PINK, palette::SURFACE)
                    .with_title("Nabywca")
                    .with_block(Block::text("Salon", 14.0, palette::WHITE)),
            )]]),
        ));
        let text = document.plain_text();
        assert!(text.contains("Nabywca"));
        assert!(text.contains("Salon"));
    }

    #[test]
    fn missing_chart_shows_placeholder() {
        let document = Document::new("t", PageLayout::PORTRAIT).with_block(Block::Chart(
            ChartPanel {
                title: "Zasięg".into(),
                chart: None,
                caption: None,
                chart_height: 180.0,
            },
        ));
        assert!(document.plain_text().contains(PLACEHOLDER));
    }
}

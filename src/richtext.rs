//! Styled text runs plus the `**bold**` / `*italic*` markup found in recommendation copy.
//!
//! The raster backend shapes a [`Span`] with the matching font face; the flow backend turns it
//! into a `genpdf` [`StyledString`].

use std::fmt;

use genpdf::style::{self, Style, StyledString};
use log::debug;

use crate::model::Color;

/// A run of text sharing one style.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Span {
    text: String,
    bold: bool,
    italic: bool,
    color: Option<Color>,
}

impl Span {
    /// Unstyled text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_bold(&self) -> bool {
        self.bold
    }

    pub fn is_italic(&self) -> bool {
        self.italic
    }

    /// Explicit color; `None` inherits the paragraph color.
    pub fn color(&self) -> Option<Color> {
        self.color
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn bold(self) -> Self {
        self.with_bold(true)
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn colored(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    fn style(&self, color_map: impl Fn(Color) -> Color) -> Style {
        let mut style = Style::new();
        if let Some(Color { r, g, b }) = self.color.map(color_map) {
            style = style.with_color(style::Color::Rgb(r, g, b));
        }
        match (self.bold, self.italic) {
            (true, true) => style.bold().italic(),
            (true, false) => style.bold(),
            (false, true) => style.italic(),
            (false, false) => style,
        }
    }

    /// Converts the span to a `genpdf` [`StyledString`] with its own colors.
    pub fn to_styled_string(&self) -> StyledString {
        self.to_styled_string_mapped(|color| color)
    }

    /// Same as [`Span::to_styled_string`] but passes the color through `color_map` first.
    ///
    /// The flow backend prints on white paper and uses this to darken colors that were picked
    /// for the dark raster theme.
    pub fn to_styled_string_mapped(&self, color_map: impl Fn(Color) -> Color) -> StyledString {
        StyledString::new(self.text.clone(), self.style(color_map))
    }
}

/// Broken emphasis markup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    offset: usize,
    message: String,
}

impl ParseError {
    /// Byte offset of the marker that could not be matched.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.message, self.offset)
    }
}

impl std::error::Error for ParseError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Emphasis {
    Strong,
    Em,
}

impl Emphasis {
    fn marker(self) -> &'static str {
        match self {
            Emphasis::Strong => "**",
            Emphasis::Em => "*",
        }
    }
}

struct Parser {
    spans: Vec<Span>,
    open: Vec<(Emphasis, usize)>,
    text: String,
}

impl Parser {
    fn is_open(&self, emphasis: Emphasis) -> bool {
        self.open.iter().any(|(open, _)| *open == emphasis)
    }

    fn top(&self) -> Option<Emphasis> {
        self.open.last().map(|(emphasis, _)| *emphasis)
    }

    fn flush(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let mut span = Span::new(std::mem::take(&mut self.text));
        span.bold = self.is_open(Emphasis::Strong);
        span.italic = self.is_open(Emphasis::Em);
        self.spans.push(span);
    }

    // Closes `emphasis` when it is innermost, opens it when it is not open at all.
    fn toggle(&mut self, emphasis: Emphasis, offset: usize) -> Result<(), ParseError> {
        self.flush();
        if self.top() == Some(emphasis) {
            self.open.pop();
        } else if self.is_open(emphasis) {
            return Err(ParseError {
                offset,
                message: format!("`{}` closes across another marker", emphasis.marker()),
            });
        } else {
            self.open.push((emphasis, offset));
        }
        Ok(())
    }
}

/// Splits `**bold**` and `*italic*` markup into spans.
///
/// Markers nest (`**very *cool***`); anything else, brackets included, is plain text.
pub fn parse_markup(input: &str) -> Result<Vec<Span>, ParseError> {
    let mut parser = Parser {
        spans: Vec::new(),
        open: Vec::new(),
        text: String::new(),
    };

    let mut offset = 0;
    while let Some(ch) = input[offset..].chars().next() {
        let rest = &input[offset..];
        // In `***` after `**a *b`, the first star ends the italic run.
        let em_first = parser.top() == Some(Emphasis::Em) && parser.is_open(Emphasis::Strong);
        if rest.starts_with("**") && !em_first {
            parser.toggle(Emphasis::Strong, offset)?;
            offset += 2;
        } else if ch == '*' {
            parser.toggle(Emphasis::Em, offset)?;
            offset += 1;
        } else {
            parser.text.push(ch);
            offset += ch.len_utf8();
        }
    }

    if let Some((emphasis, at)) = parser.open.last() {
        return Err(ParseError {
            offset: *at,
            message: format!("`{}` is never closed", emphasis.marker()),
        });
    }
    parser.flush();
    Ok(parser.spans)
}

/// Like [`parse_markup`] but never fails: broken markup loses its stars and becomes one
/// plain span, so a typo never hides a recommendation.
pub fn parse_markup_lenient(input: &str) -> Vec<Span> {
    match parse_markup(input) {
        Ok(spans) => spans,
        Err(err) => {
            debug!("Rendering markup as plain text: {}", err);
            let plain = input.replace('*', "");
            if plain.is_empty() {
                Vec::new()
            } else {
                vec![Span::new(plain)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::palette;

    #[test]
    fn styled_strings_carry_flags_and_colors() {
        let styled = Span::new("Budżet").bold().colored(palette::PINK).to_styled_string();
        assert_eq!(styled.s, "Budżet");
        assert!(styled.style.is_bold());
        assert!(!styled.style.is_italic());
        let pink = palette::PINK;
        assert_eq!(styled.style.color(), Some(style::Color::Rgb(pink.r, pink.g, pink.b)));

        let mapped = Span::new("x")
            .colored(palette::WHITE)
            .to_styled_string_mapped(|_| palette::BLACK);
        assert_eq!(mapped.style.color(), Some(style::Color::Rgb(0, 0, 0)));
    }

    #[test]
    fn plain_text_is_one_span() {
        let spans = parse_markup("Zwiększ budżet o 20% [PLN]").expect("parse");
        assert_eq!(spans, vec![Span::new("Zwiększ budżet o 20% [PLN]")]);
    }

    #[test]
    fn markers_nest() {
        let spans = parse_markup("This is **very *cool***!").expect("parse");
        assert_eq!(
            spans,
            vec![
                Span::new("This is "),
                Span::new("very ").bold(),
                Span::new("cool").bold().italic(),
                Span::new("!"),
            ]
        );
    }

    #[test]
    fn bold_inside_italic() {
        let spans = parse_markup("*a **b** c*").expect("parse");
        assert_eq!(spans.len(), 3);
        assert!(spans.iter().all(Span::is_italic));
        assert!(spans[1].is_bold());
    }

    #[test]
    fn unclosed_markers_are_reported() {
        let err = parse_markup("ok **oops").unwrap_err();
        assert_eq!(err.offset(), 3);
        assert!(err.message().contains("never closed"));

        let err = parse_markup("*a **b* c**").unwrap_err();
        assert!(err.message().contains("closes across"));
    }

    #[test]
    fn lenient_parse_drops_broken_markers() {
        let spans = parse_markup_lenient("**Targetowanie: rozszerz grupę");
        assert_eq!(spans, vec![Span::new("Targetowanie: rozszerz grupę")]);

        let spans = parse_markup_lenient("**Kreacje:** testuj wideo");
        assert_eq!(spans[0], Span::new("Kreacje:").bold());
    }
}

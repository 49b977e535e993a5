//! Custom `genpdf` elements used by the flow backend.
//!
//! `genpdf` ships paragraphs, tables and images but nothing for figures that fit their
//! container, horizontal rules or fixed vertical gaps, so those live here.

use image::GenericImageView;

use genpdf::elements::{Image, Paragraph};
use genpdf::error::Error;
use genpdf::style::{Color, Style};
use genpdf::{render, Alignment, Element, Mm, Position, RenderResult, Scale, Size};

const DEFAULT_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;
const MM_PER_CSS_PX: f64 = MM_PER_INCH / 96.0;

/// Converts millimetres into a `genpdf` length.
pub fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

/// Converts a `genpdf` length into millimetres.
pub fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

/// Converts CSS pixels (96 per inch) into a `genpdf` length.
pub fn mm_from_px(px: f32) -> Mm {
    mm_from_f64(f64::from(px) * MM_PER_CSS_PX)
}

/// An image scaled to fit its container, with an optional caption underneath.
pub struct Figure {
    image: Image,
    caption: Option<Paragraph>,
    alignment: Alignment,
    natural_width: Mm,
    max_width: Option<Mm>,
    spacing: Mm,
}

impl Figure {
    /// Creates a figure from a decoded image; alpha channels are flattened first.
    pub fn from_dynamic_image(image: image::DynamicImage) -> Result<Self, Error> {
        let (px_width, _) = image.dimensions();
        let natural_width = mm_from_f64(MM_PER_INCH * f64::from(px_width) / DEFAULT_IMAGE_DPI);
        let opaque = image::DynamicImage::ImageRgb8(image.to_rgb8());
        Ok(Self {
            image: Image::from_dynamic_image(opaque)?,
            caption: None,
            alignment: Alignment::Center,
            natural_width,
            max_width: None,
            spacing: mm_from_f64(2.0),
        })
    }

    /// Adds a caption and returns the updated figure.
    pub fn with_caption(mut self, caption: Paragraph) -> Self {
        self.caption = Some(caption);
        self
    }

    /// Sets the horizontal alignment of image and caption.
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Never draws the image wider than `width`.
    pub fn with_max_width(mut self, width: Mm) -> Self {
        self.max_width = Some(width);
        self
    }
}

impl Element for Figure {
    fn render(
        &mut self,
        context: &genpdf::Context,
        mut area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let mut target = mm_to_f64(area.size().width);
        if let Some(max_width) = self.max_width {
            target = target.min(mm_to_f64(max_width));
        }
        let natural = mm_to_f64(self.natural_width);
        if natural > f64::EPSILON {
            let scale = target / natural;
            self.image.set_scale(Scale::new(scale, scale));
        }
        self.image.set_alignment(self.alignment);

        let mut result = RenderResult::default();
        let image_result = self.image.render(context, area.clone(), style)?;
        result.size = result.size.stack_vertical(image_result.size);
        result.has_more |= image_result.has_more;
        if image_result.has_more {
            return Ok(result);
        }

        if let Some(caption) = &mut self.caption {
            caption.set_alignment(self.alignment);
            area.add_offset(Position::new(0, image_result.size.height + self.spacing));
            result.size = result.size.stack_vertical(Size::new(0, self.spacing));
            let caption_result = caption.render(context, area, style)?;
            result.size = result.size.stack_vertical(caption_result.size);
            result.has_more |= caption_result.has_more;
        }

        Ok(result)
    }
}

/// A thin full-width horizontal line.
pub struct Rule {
    color: Color,
    height: Mm,
}

impl Rule {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            height: mm_from_f64(1.0),
        }
    }
}

impl Element for Rule {
    fn render(
        &mut self,
        _context: &genpdf::Context,
        area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        if self.height > area.size().height {
            result.has_more = true;
            return Ok(result);
        }
        let middle = self.height / 2.0;
        area.draw_line(
            vec![
                Position::new(0, middle),
                Position::new(area.size().width, middle),
            ],
            Style::new().with_color(self.color),
        );
        result.size = Size::new(area.size().width, self.height);
        Ok(result)
    }
}

/// Fixed vertical whitespace, truncated at the end of a page.
pub struct Spacing {
    height: Mm,
}

impl Spacing {
    pub fn new(height: Mm) -> Self {
        Self { height }
    }
}

impl Element for Spacing {
    fn render(
        &mut self,
        _context: &genpdf::Context,
        area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        let height = if self.height > area.size().height {
            area.size().height
        } else {
            self.height
        };
        result.size = Size::new(0, height);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_pixels_map_to_a4() {
        assert!((mm_to_f64(mm_from_px(794.0)) - 210.08).abs() < 0.01);
        assert!((mm_to_f64(mm_from_px(1123.0)) - 297.12).abs() < 0.01);
    }

    #[test]
    fn figures_measure_their_natural_width() {
        let image = image::DynamicImage::new_rgba8(300, 100);
        let figure = Figure::from_dynamic_image(image).expect("figure");
        assert!((mm_to_f64(figure.natural_width) - 25.4).abs() < 1e-9);
    }
}

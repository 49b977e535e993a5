//! Turning a [`Document`] into bytes on disk.
//!
//! Two backends implement [`Renderer`]:
//!
//! * [`RasterRenderer`] lays the document out at its CSS-pixel width, paints it into an
//!   image and either encodes that image as PNG or slices it into PDF pages.  Both outputs
//!   look exactly like the dark on-screen document.
//! * [`flow::FlowRenderer`] maps the blocks onto `genpdf` elements and produces a vector
//!   PDF with selectable text on white pages.
//!
//! File names are derived from the record in [`naming`].

pub mod flow;
pub mod naming;
pub mod pdf;
pub mod raster;

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::model::{palette, Color, Document};

pub use flow::FlowRenderer;
pub use raster::{Capture, Rasterizer};

/// Output file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Pdf,
    Png,
}

impl ExportFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Png => "png",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "png" => Ok(ExportFormat::Png),
            other => Err(Error::Unsupported(format!("export format `{}`", other))),
        }
    }
}

/// How a document is captured into pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptureOptions {
    /// Device pixels per CSS pixel.
    pub pixel_ratio: f32,
    /// Fill painted under everything.
    pub background: Color,
    /// Skip embedded images that cannot be loaded instead of failing the capture.
    pub allow_tainted_images: bool,
}

impl CaptureOptions {
    /// Oversampling used for PDF pages.
    pub const PDF_PIXEL_RATIO: f32 = 3.0;
    /// Oversampling used for PNG snapshots.
    pub const PNG_PIXEL_RATIO: f32 = 2.0;

    /// Defaults for the given output format.
    pub fn for_format(format: ExportFormat) -> Self {
        let pixel_ratio = match format {
            ExportFormat::Pdf => Self::PDF_PIXEL_RATIO,
            ExportFormat::Png => Self::PNG_PIXEL_RATIO,
        };
        Self {
            pixel_ratio,
            background: palette::BACKGROUND,
            allow_tainted_images: true,
        }
    }

    /// Sets the pixel ratio and returns the updated options.
    pub fn with_pixel_ratio(mut self, pixel_ratio: f32) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }

    /// Sets the background and returns the updated options.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Sets the taint tolerance and returns the updated options.
    pub fn with_allow_tainted_images(mut self, allow: bool) -> Self {
        self.allow_tainted_images = allow;
        self
    }
}

/// An encoded document.
#[derive(Clone, Debug)]
pub struct RenderedFile {
    /// Encoded file contents.
    pub bytes: Vec<u8>,
    /// Format of `bytes`.
    pub format: ExportFormat,
    /// Number of pages; 1 for images.
    pub pages: usize,
}

/// Anything that can encode a document description into a file.
pub trait Renderer {
    /// Encodes `document` as `format`.
    fn render(&self, document: &Document, format: ExportFormat) -> Result<RenderedFile>;
}

/// Raster backend: capture, then encode as PNG or paginated PDF.
#[derive(Debug)]
pub struct RasterRenderer {
    rasterizer: Rasterizer,
    options: Option<CaptureOptions>,
}

impl RasterRenderer {
    /// Creates a renderer that uses the per-format default options.
    pub fn new(rasterizer: Rasterizer) -> Self {
        Self {
            rasterizer,
            options: None,
        }
    }

    /// Uses `options` for every format instead of the defaults.
    pub fn with_options(mut self, options: CaptureOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Returns the rasterizer used for captures.
    pub fn rasterizer(&self) -> &Rasterizer {
        &self.rasterizer
    }

    fn options_for(&self, format: ExportFormat) -> CaptureOptions {
        self.options
            .unwrap_or_else(|| CaptureOptions::for_format(format))
    }
}

impl Renderer for RasterRenderer {
    fn render(&self, document: &Document, format: ExportFormat) -> Result<RenderedFile> {
        let capture = self.rasterizer.capture(document, &self.options_for(format))?;
        match format {
            ExportFormat::Png => Ok(RenderedFile {
                bytes: capture.to_png()?,
                format,
                pages: 1,
            }),
            ExportFormat::Pdf => {
                let pdf = pdf::image_to_pdf(&capture, document.layout(), document.title())?;
                Ok(RenderedFile {
                    bytes: pdf.bytes,
                    format,
                    pages: pdf.pages,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_format() {
        assert_eq!(CaptureOptions::for_format(ExportFormat::Pdf).pixel_ratio, 3.0);
        assert_eq!(CaptureOptions::for_format(ExportFormat::Png).pixel_ratio, 2.0);
        assert_eq!(
            CaptureOptions::for_format(ExportFormat::Png).background,
            palette::BACKGROUND
        );
    }

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!("PDF".parse::<ExportFormat>().expect("pdf"), ExportFormat::Pdf);
        assert_eq!("png".parse::<ExportFormat>().expect("png"), ExportFormat::Png);
        assert!("svg".parse::<ExportFormat>().is_err());
    }
}

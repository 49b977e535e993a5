//! Slicing a capture into fixed-size PDF pages.
//!
//! One CSS pixel maps to one PDF point, so the page has exactly the size the document was
//! designed for.  The capture is embedded at its native resolution, scaled to the page
//! width, and placed once per page with the vertical offset advanced by one page height.

use std::io::BufWriter;

use image::DynamicImage;
use log::debug;
use printpdf::{Image, Mm, PdfDocument};

use crate::error::{Error, Result};
use crate::model::PageLayout;

use super::raster::Capture;

const MM_PER_POINT: f32 = 25.4 / 72.0;
const POINTS_PER_INCH: f32 = 72.0;

/// A finished PDF with its page count.
#[derive(Clone, Debug)]
pub struct PdfFile {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// Vertical offset of the capture's top edge for every page, in points.
///
/// Page `n` shows the slice starting `n * page_height` below the top of the content, so the
/// result has `ceil(content_height / page_height)` entries and never fewer than one.
pub fn tile_offsets(content_height: f32, page_height: f32) -> Vec<f32> {
    if page_height.is_nan() || page_height <= 0.0 || !content_height.is_finite() {
        return vec![0.0];
    }
    let mut offsets = Vec::new();
    let mut offset = 0.0_f32;
    let mut remaining = content_height;
    loop {
        offsets.push(offset);
        remaining -= page_height;
        offset += page_height;
        if remaining <= 0.0 {
            break;
        }
    }
    offsets
}

fn mm(points: f32) -> Mm {
    Mm(f64::from(points * MM_PER_POINT))
}

/// Encodes `capture` as a PDF whose pages have the size of `page`.
pub fn image_to_pdf(capture: &Capture, page: PageLayout, title: &str) -> Result<PdfFile> {
    let image = capture.image();
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::Capture("capture is empty".into()));
    }

    // Scale the capture to the page width; its height in points follows from the aspect.
    let dpi = image.width() as f32 * POINTS_PER_INCH / page.width;
    let image_height = image.height() as f32 * POINTS_PER_INCH / dpi;
    let offsets = tile_offsets(capture.css_height(), page.height);
    let dynamic = DynamicImage::ImageRgb8(image.clone());

    let (document, first_page, first_layer) =
        PdfDocument::new(title, mm(page.width), mm(page.height), "Strona 1");
    for (index, offset) in offsets.iter().enumerate() {
        let layer = if index == 0 {
            document.get_page(first_page).get_layer(first_layer)
        } else {
            let label = format!("Strona {}", index + 1);
            let (page_index, layer_index) =
                document.add_page(mm(page.width), mm(page.height), label.as_str());
            document.get_page(page_index).get_layer(layer_index)
        };
        // PDF space grows upwards: the image bottom sits below the page by whatever content
        // remains after this slice.
        let translate_y = page.height - image_height + offset;
        // `add_to_layer` consumes the image, so every page embeds its own copy.
        Image::from_dynamic_image(&dynamic).add_to_layer(
            layer,
            Some(Mm(0.0)),
            Some(mm(translate_y)),
            None,
            None,
            None,
            Some(f64::from(dpi)),
        );
    }

    let mut writer = BufWriter::new(Vec::new());
    document.save(&mut writer).map_err(|err| Error::Encode {
        format: "pdf",
        message: err.to_string(),
    })?;
    let bytes = writer.into_inner().map_err(|err| Error::Encode {
        format: "pdf",
        message: err.to_string(),
    })?;

    debug!(
        "Encoded {:?} into {} page(s), {} bytes",
        title,
        offsets.len(),
        bytes.len()
    );
    Ok(PdfFile {
        bytes,
        pages: offsets.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::raster::Rasterizer;
    use crate::export::CaptureOptions;
    use crate::export::ExportFormat;
    use crate::model::Document;

    #[test]
    fn page_count_is_rounded_up() {
        assert_eq!(tile_offsets(1123.0, 1123.0).len(), 1);
        assert_eq!(tile_offsets(1400.0, 1123.0).len(), 2);
        assert_eq!(tile_offsets(3369.5, 1123.0).len(), 4);
        assert_eq!(tile_offsets(900.0, 900.0), vec![0.0]);
    }

    #[test]
    fn offsets_advance_by_page_height() {
        assert_eq!(tile_offsets(2500.0, 1000.0), vec![0.0, 1000.0, 2000.0]);
    }

    #[test]
    fn degenerate_pages_yield_one_slice() {
        assert_eq!(tile_offsets(500.0, 0.0), vec![0.0]);
        assert_eq!(tile_offsets(0.0, 1123.0), vec![0.0]);
    }

    #[test]
    fn every_tile_gets_its_own_page() {
        let document = Document::new("Raport", PageLayout::PORTRAIT).with_min_height(2500.0);
        let options = CaptureOptions::for_format(ExportFormat::Pdf).with_pixel_ratio(1.0);
        let capture = Rasterizer::without_fonts()
            .capture(&document, &options)
            .expect("capture");

        let pdf = image_to_pdf(&capture, PageLayout::PORTRAIT, "Raport").expect("pdf");
        assert_eq!(pdf.pages, 3);
        assert!(pdf.bytes.starts_with(b"%PDF"));
    }
}
